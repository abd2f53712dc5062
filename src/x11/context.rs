//! X11 connection context and cached server state

use anyhow::{Context, Result};
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::common::constants::x11;
use crate::common::types::Rect;

/// Connection plus everything we look up once at startup
pub struct X11Context {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub atoms: CachedAtoms,
    pub font: CoreFont,
}

impl X11Context {
    /// Connect to `display` (or `$DISPLAY` when `None`)
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) =
            RustConnection::connect(display).context("Failed to connect to X11 server")?;
        info!(screen = screen_num, "Connected to X11 server");

        let atoms = CachedAtoms::new(&conn)?;
        let font = CoreFont::open(&conn)?;

        Ok(Self {
            conn,
            screen_num,
            atoms,
            font,
        })
    }

    pub fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    pub fn root(&self) -> Window {
        self.screen().root
    }

    /// Full desktop rectangle used for notification placement
    pub fn screen_geometry(&self) -> Rect {
        let screen = self.screen();
        Rect::new(
            0,
            0,
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        )
    }

    /// Horizontal DPI derived from the physical size reported by the server
    pub fn dpi(&self) -> f64 {
        let screen = self.screen();
        if screen.width_in_millimeters == 0 {
            return x11::DEFAULT_DPI;
        }
        f64::from(screen.width_in_pixels) * 25.4 / f64::from(screen.width_in_millimeters)
    }

    pub fn points_to_pixels(&self, points: i32) -> i32 {
        points_to_pixels(points, self.dpi())
    }
}

pub fn points_to_pixels(points: i32, dpi: f64) -> i32 {
    (f64::from(points) * dpi / 72.0).round() as i32
}

/// Pre-cached X11 atoms to avoid repeated roundtrips
#[derive(Debug)]
pub struct CachedAtoms {
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_window_opacity: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_notification: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            net_wm_name: intern(conn, "_NET_WM_NAME")?,
            utf8_string: intern(conn, "UTF8_STRING")?,
            net_wm_state: intern(conn, "_NET_WM_STATE")?,
            net_wm_state_above: intern(conn, "_NET_WM_STATE_ABOVE")?,
            net_wm_window_opacity: intern(conn, "_NET_WM_WINDOW_OPACITY")?,
            net_wm_window_type: intern(conn, "_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_notification: intern(conn, "_NET_WM_WINDOW_TYPE_NOTIFICATION")?,
        })
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .context(format!("Failed to intern {name} atom"))?
        .reply()
        .context(format!("Failed to get reply for {name} atom"))?
        .atom)
}

/// Core X11 font used for notification text, with the metrics needed to
/// size windows around it
#[derive(Debug, Clone, Copy)]
pub struct CoreFont {
    pub id: Font,
    pub char_width: u32,
    pub ascent: u32,
    pub descent: u32,
}

impl CoreFont {
    fn open(conn: &RustConnection) -> Result<Self> {
        let id = conn.generate_id().context("Failed to generate X11 font ID")?;
        conn.open_font(id, x11::CORE_FONT)
            .context("Failed to open X11 'fixed' font")?;
        let info = conn
            .query_font(id)
            .context("Failed to query 'fixed' font metrics")?
            .reply()
            .context("Failed to get 'fixed' font metrics reply")?;

        let font = Self {
            id,
            char_width: info.max_bounds.character_width.max(1) as u32,
            ascent: info.font_ascent.max(0) as u32,
            descent: info.font_descent.max(0) as u32,
        };
        debug!(?font, "Opened core font");
        Ok(font)
    }

    pub fn line_height(&self) -> u32 {
        self.ascent + self.descent
    }

    /// Width of `text` in pixels; the core font is fixed-width
    pub fn text_width(&self, text: &str) -> u32 {
        self.char_width * text.chars().count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_to_pixels_at_common_dpis() {
        assert_eq!(points_to_pixels(72, 96.0), 96);
        assert_eq!(points_to_pixels(10, 96.0), 13);
        assert_eq!(points_to_pixels(300, 96.0), 400);
        assert_eq!(points_to_pixels(10, 72.0), 10);
        assert_eq!(points_to_pixels(0, 144.0), 0);
        assert_eq!(points_to_pixels(-15, 96.0), -20);
    }

    #[test]
    fn test_core_font_text_metrics() {
        let font = CoreFont {
            id: 0,
            char_width: 6,
            ascent: 11,
            descent: 2,
        };
        assert_eq!(font.text_width("hello"), 30);
        assert_eq!(font.text_width(""), 0);
        assert_eq!(font.line_height(), 13);
    }
}

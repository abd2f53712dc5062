//! Override-redirect popup windows drawn with the core font

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;

use super::context::{CoreFont, X11Context};
use super::ops::{set_notification_hints, set_window_opacity};
use crate::common::constants::notification;
use crate::common::types::{Dimensions, Position, Rect};
use crate::notification::{
    NotificationBackend, NotificationButton, NotificationEvent, NotificationStyle,
    NotificationWidget,
};

/// Creates [`NotificationWindow`]s on the default screen
pub struct X11NotificationBackend<'a> {
    ctx: &'a X11Context,
}

impl<'a> X11NotificationBackend<'a> {
    pub fn new(ctx: &'a X11Context) -> Self {
        Self { ctx }
    }
}

impl<'a> NotificationBackend for X11NotificationBackend<'a> {
    type Widget = NotificationWindow<'a>;

    fn create_widget(&mut self) -> Result<NotificationWindow<'a>> {
        NotificationWindow::new(self.ctx)
    }

    fn screen_geometry(&self) -> Rect {
        self.ctx.screen_geometry()
    }

    fn points_to_pixels(&self, points: i32) -> i32 {
        self.ctx.points_to_pixels(points)
    }
}

/// Text lines and button boxes of a notification, relative to the window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TextLayout {
    /// Title first, then the wrapped message
    lines: Vec<String>,
    buttons: Vec<Rect>,
    size: Dimensions,
}

impl TextLayout {
    fn compute(
        font: &CoreFont,
        title: &str,
        message: &str,
        buttons: &[NotificationButton],
        maximum: Dimensions,
    ) -> Self {
        let pad = notification::PADDING_PX;
        let line_height = font.line_height().max(1);
        let max_chars = (maximum.width.saturating_sub(2 * pad) / font.char_width).max(1) as usize;

        let mut lines = wrap_text(title, max_chars);
        lines.extend(wrap_text(message, max_chars));

        // Keep room for the button row inside the maximum height
        let button_row = if buttons.is_empty() { 0 } else { line_height + pad };
        let max_lines = (maximum
            .height
            .saturating_sub(2 * pad + button_row)
            / line_height)
            .max(1) as usize;
        lines.truncate(max_lines);

        let text_width = lines.iter().map(|l| font.text_width(l)).max().unwrap_or(0);
        let text_bottom = pad + lines.len() as u32 * line_height;

        let mut x = pad;
        let button_y = text_bottom + pad;
        let rects: Vec<Rect> = buttons
            .iter()
            .map(|button| {
                let width = font.text_width(&button.name) + pad;
                let rect = Rect::new(x as i32, button_y as i32, width, line_height);
                x += width + notification::BUTTON_SPACING_PX;
                rect
            })
            .collect();
        let buttons_width = rects.last().map_or(0, |r| r.right() as u32 + 1);

        let size = Dimensions::new(
            (text_width + 2 * pad).max(buttons_width + pad),
            text_bottom + button_row + pad,
        )
        .clamp_to(maximum);

        Self {
            lines,
            buttons: rects,
            size,
        }
    }
}

/// Greedy word wrap at `max_chars`; words longer than a line are split
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            loop {
                let used = line.chars().count();
                let needed = if used == 0 { word.len() } else { used + 1 + word.len() };
                if needed <= max_chars {
                    if used > 0 {
                        line.push(' ');
                    }
                    line.extend(word.iter());
                    break;
                }
                if used > 0 {
                    lines.push(std::mem::take(&mut line));
                    continue;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// Core fonts take Latin-1; anything outside it is drawn as '?'
fn to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// One notification popup
pub struct NotificationWindow<'a> {
    ctx: &'a X11Context,
    window: Window,
    gc: Gcontext,
    title: String,
    message: String,
    buttons: Vec<NotificationButton>,
    opacity: f64,
    style: NotificationStyle,
    maximum: Dimensions,
    layout: TextLayout,
}

impl<'a> NotificationWindow<'a> {
    #[tracing::instrument(skip(ctx))]
    pub fn new(ctx: &'a X11Context) -> Result<Self> {
        let style = NotificationStyle::default();
        let window = ctx
            .conn
            .generate_id()
            .context("Failed to generate ID for notification window")?;
        ctx.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                ctx.root(),
                0,
                0,
                1,
                1,
                notification::BORDER_WIDTH_PX as u16,
                WindowClass::INPUT_OUTPUT,
                ctx.screen().root_visual,
                &CreateWindowAux::new()
                    .override_redirect(1)
                    .background_pixel(style.background.pixel())
                    .border_pixel(style.border.pixel())
                    .event_mask(EventMask::EXPOSURE | EventMask::BUTTON_PRESS),
            )
            .context("Failed to create notification window")?;

        let gc = ctx
            .conn
            .generate_id()
            .context("Failed to generate ID for graphics context")?;
        ctx.conn
            .create_gc(
                gc,
                window,
                &CreateGCAux::new()
                    .font(ctx.font.id)
                    .foreground(style.foreground.pixel())
                    .background(style.background.pixel())
                    .graphics_exposures(0),
            )
            .context(format!("Failed to create graphics context for window {window}"))?;

        debug!(window = window, "Created notification window");
        Ok(Self {
            ctx,
            window,
            gc,
            title: String::new(),
            message: String::new(),
            buttons: Vec::new(),
            opacity: 1.0,
            style,
            maximum: Dimensions::new(u32::MAX, u32::MAX),
            layout: TextLayout::default(),
        })
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Handle an event addressed to this window
    ///
    /// Exposes redraw; a click on a button reports it, a click anywhere
    /// else asks to close the notification.
    pub fn handle_x11_event(&self, event: &Event) -> Result<Option<NotificationEvent>> {
        match event {
            Event::Expose(e) if e.window == self.window && e.count == 0 => {
                self.draw()?;
                Ok(None)
            }
            Event::ButtonPress(e) if e.event == self.window => {
                let x = i32::from(e.event_x);
                let y = i32::from(e.event_y);
                let clicked = self
                    .layout
                    .buttons
                    .iter()
                    .position(|rect| rect.contains(x, y))
                    .and_then(|index| self.buttons.get(index));
                Ok(Some(match clicked {
                    Some(button) => NotificationEvent::ButtonClicked(button.clone()),
                    None => NotificationEvent::Close,
                }))
            }
            _ => Ok(None),
        }
    }

    fn draw(&self) -> Result<()> {
        let conn = &self.ctx.conn;
        let font = &self.ctx.font;
        let pad = notification::PADDING_PX as i32;
        let line_height = font.line_height() as i32;

        conn.clear_area(false, self.window, 0, 0, 0, 0)
            .context(format!("Failed to clear window {}", self.window))?;

        for (row, line) in self.layout.lines.iter().enumerate() {
            let baseline = pad + row as i32 * line_height + font.ascent as i32;
            conn.image_text8(self.window, self.gc, pad as i16, baseline as i16, &to_latin1(line))
                .context(format!("Failed to draw text on window {}", self.window))?;
        }

        for (rect, button) in self.layout.buttons.iter().zip(&self.buttons) {
            let half_pad = pad / 2;
            conn.image_text8(
                self.window,
                self.gc,
                (rect.x + half_pad) as i16,
                (rect.y + font.ascent as i32) as i16,
                &to_latin1(&button.name),
            )
            .context(format!("Failed to draw button on window {}", self.window))?;
            conn.poly_rectangle(
                self.window,
                self.gc,
                &[Rectangle {
                    x: rect.x as i16,
                    y: rect.y as i16,
                    width: rect.width.saturating_sub(1) as u16,
                    height: rect.height.saturating_sub(1) as u16,
                }],
            )
            .context(format!("Failed to draw button frame on window {}", self.window))?;
        }
        Ok(())
    }

    fn apply_style(&self) -> Result<()> {
        let conn = &self.ctx.conn;
        conn.change_window_attributes(
            self.window,
            &ChangeWindowAttributesAux::new()
                .background_pixel(self.style.background.pixel())
                .border_pixel(self.style.border.pixel()),
        )
        .context(format!("Failed to set colors of window {}", self.window))?;
        conn.change_gc(
            self.gc,
            &ChangeGCAux::new()
                .foreground(self.style.foreground.pixel())
                .background(self.style.background.pixel()),
        )
        .context(format!("Failed to set colors of window {}", self.window))?;
        Ok(())
    }
}

impl NotificationWidget for NotificationWindow<'_> {
    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_message(&mut self, message: &str) {
        self.message = message.to_string();
    }

    fn set_buttons(&mut self, buttons: Vec<NotificationButton>) {
        self.buttons = buttons;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
    }

    fn set_style(&mut self, style: &NotificationStyle) {
        self.style = *style;
    }

    fn set_maximum_size(&mut self, maximum: Dimensions) {
        self.maximum = maximum;
    }

    fn adjust(&mut self) {
        self.layout = TextLayout::compute(
            &self.ctx.font,
            &self.title,
            &self.message,
            &self.buttons,
            self.maximum,
        );
    }

    fn size(&self) -> Dimensions {
        self.layout.size
    }

    fn move_to(&mut self, position: Position) -> Result<()> {
        self.ctx
            .conn
            .configure_window(
                self.window,
                &ConfigureWindowAux::new()
                    .x(position.x)
                    .y(position.y)
                    .width(self.layout.size.width)
                    .height(self.layout.size.height)
                    .stack_mode(StackMode::ABOVE),
            )
            .context(format!("Failed to move notification window {}", self.window))?;
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        self.apply_style()?;
        set_notification_hints(self.ctx, self.window, &self.title)?;
        set_window_opacity(self.ctx, self.window, self.opacity)?;
        self.ctx
            .conn
            .map_window(self.window)
            .context(format!("Failed to map notification window {}", self.window))?;
        self.draw()
    }

    fn close(&mut self) -> Result<()> {
        let conn = &self.ctx.conn;
        conn.free_gc(self.gc)
            .context(format!("Failed to free graphics context {}", self.gc))?;
        conn.destroy_window(self.window)
            .context(format!("Failed to destroy notification window {}", self.window))?;
        debug!(window = self.window, "Destroyed notification window");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> CoreFont {
        CoreFont {
            id: 0,
            char_width: 6,
            ascent: 10,
            descent: 3,
        }
    }

    #[test]
    fn test_wrap_text_breaks_on_words() {
        assert_eq!(
            wrap_text("copied 12 lines to clipboard", 10),
            vec!["copied 12", "lines to", "clipboard"]
        );
        assert_eq!(wrap_text("first\nsecond", 80), vec!["first", "second"]);
        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn test_wrap_text_splits_long_words() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("ab abcdefg", 4), vec!["ab", "abcd", "efg"]);
    }

    #[test]
    fn test_to_latin1_replaces_wide_chars() {
        assert_eq!(to_latin1("caf\u{e9} \u{2603}"), b"caf\xe9 ?".to_vec());
    }

    #[test]
    fn test_layout_fits_text() {
        let layout = TextLayout::compute(
            &font(),
            "Title",
            "hello",
            &[],
            Dimensions::new(400, 100),
        );
        assert_eq!(layout.lines, vec!["Title", "hello"]);
        // 5 chars * 6 px + 2 * 8 px padding; 2 lines * 13 px + 2 * 8 px
        assert_eq!(layout.size, Dimensions::new(46, 42));
        assert!(layout.buttons.is_empty());
    }

    #[test]
    fn test_layout_respects_maximum() {
        let message = "word ".repeat(200);
        let layout = TextLayout::compute(
            &font(),
            "Title",
            &message,
            &[],
            Dimensions::new(100, 60),
        );
        assert!(layout.size.width <= 100);
        assert!(layout.size.height <= 60);
        // (60 - 16) / 13 lines fit
        assert_eq!(layout.lines.len(), 3);
    }

    #[test]
    fn test_layout_places_buttons_below_text() {
        let buttons = vec![
            NotificationButton {
                name: "Open".to_string(),
                data: String::new(),
            },
            NotificationButton {
                name: "Dismiss".to_string(),
                data: String::new(),
            },
        ];
        let layout = TextLayout::compute(
            &font(),
            "Title",
            "",
            &buttons,
            Dimensions::new(400, 200),
        );
        // one text line: 8 + 13 = 21, then padding
        assert_eq!(layout.buttons[0], Rect::new(8, 29, 4 * 6 + 8, 13));
        assert_eq!(layout.buttons[1], Rect::new(8 + 32 + 12, 29, 7 * 6 + 8, 13));
        assert_eq!(layout.size.height, 21 + 13 + 8 + 8);
        assert_eq!(layout.size.width, 52 + 50 + 8);
    }
}

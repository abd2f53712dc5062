//! X11 requests with side effects outside our own bookkeeping

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::xtest::ConnectionExt as XTestExt;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use super::context::X11Context;
use super::keymap::Keymap;
use crate::common::constants::{keysym, x11};

/// Send Shift+Insert through XTest so the focused client pastes the selection
pub fn fake_paste(ctx: &X11Context, keymap: &Keymap) -> Result<()> {
    let shift = keymap
        .keycode_for(keysym::SHIFT_L)
        .context("No key code for Shift_L on the current keyboard layout")?;
    let insert = keymap
        .keycode_for(keysym::INSERT)
        .context("No key code for Insert on the current keyboard layout")?;
    let root = ctx.root();

    for (event_type, keycode) in [
        (KEY_PRESS_EVENT, shift),
        (KEY_PRESS_EVENT, insert),
        (KEY_RELEASE_EVENT, insert),
        (KEY_RELEASE_EVENT, shift),
    ] {
        ctx.conn
            .xtest_fake_input(event_type, keycode, x11rb::CURRENT_TIME, root, 0, 0, 0)
            .context(format!("Failed to send fake key event for key code {keycode}"))?;
    }

    ctx.conn
        .flush()
        .context("Failed to flush X11 connection after fake paste")?;
    tracing::debug!(shift = shift, insert = insert, "Sent Shift+Insert paste");
    Ok(())
}

/// Set _NET_WM_WINDOW_OPACITY; compositors read it as a fraction of u32::MAX
pub fn set_window_opacity(ctx: &X11Context, window: Window, opacity: f64) -> Result<()> {
    let value = opacity_to_cardinal(opacity);
    if value == x11::OPACITY_OPAQUE {
        ctx.conn
            .delete_property(window, ctx.atoms.net_wm_window_opacity)
            .context(format!("Failed to clear opacity of window {window}"))?;
    } else {
        ctx.conn
            .change_property32(
                PropMode::REPLACE,
                window,
                ctx.atoms.net_wm_window_opacity,
                AtomEnum::CARDINAL,
                &[value],
            )
            .context(format!("Failed to set opacity of window {window}"))?;
    }
    Ok(())
}

/// Mark a window as an always-on-top notification for window managers that
/// honour EWMH hints on override-redirect windows
pub fn set_notification_hints(ctx: &X11Context, window: Window, title: &str) -> Result<()> {
    ctx.conn
        .change_property32(
            PropMode::REPLACE,
            window,
            ctx.atoms.net_wm_window_type,
            AtomEnum::ATOM,
            &[ctx.atoms.net_wm_window_type_notification],
        )
        .context(format!("Failed to set window type of window {window}"))?;
    ctx.conn
        .change_property32(
            PropMode::REPLACE,
            window,
            ctx.atoms.net_wm_state,
            AtomEnum::ATOM,
            &[ctx.atoms.net_wm_state_above],
        )
        .context(format!("Failed to set window state of window {window}"))?;
    ctx.conn
        .change_property8(
            PropMode::REPLACE,
            window,
            ctx.atoms.net_wm_name,
            ctx.atoms.utf8_string,
            title.as_bytes(),
        )
        .context(format!("Failed to set title of window {window}"))?;
    Ok(())
}

fn opacity_to_cardinal(opacity: f64) -> u32 {
    (opacity.clamp(0.0, 1.0) * f64::from(x11::OPACITY_OPAQUE)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opacity_to_cardinal() {
        assert_eq!(opacity_to_cardinal(1.0), x11::OPACITY_OPAQUE);
        assert_eq!(opacity_to_cardinal(0.0), 0);
        assert_eq!(opacity_to_cardinal(2.5), x11::OPACITY_OPAQUE);
        assert_eq!(opacity_to_cardinal(-1.0), 0);
        assert_eq!(opacity_to_cardinal(0.5), 0x8000_0000);
    }
}

//! X11 event translation for the shortcut registry
//!
//! Grabbed keys arrive as core KeyPress/KeyRelease events. Everything else
//! the release heuristic needs comes from XInput2 raw events on the root
//! window, which are delivered regardless of which client has focus.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::Event;
use x11rb::protocol::xinput::{self, ConnectionExt as XInputExt};

use crate::common::constants::x11;
use crate::x11::X11Context;

/// Input event as seen by the shortcut registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyPress { keycode: u8, state: u16 },
    KeyRelease { keycode: u8, state: u16 },
    /// Raw key release or button press from any device
    Other,
}

/// Map an X11 event to an [`InputEvent`]; unrelated events yield `None`
pub fn translate(event: &Event) -> Option<InputEvent> {
    match event {
        Event::KeyPress(e) => Some(InputEvent::KeyPress {
            keycode: e.detail,
            state: u16::from(e.state),
        }),
        Event::KeyRelease(e) => Some(InputEvent::KeyRelease {
            keycode: e.detail,
            state: u16::from(e.state),
        }),
        Event::XinputRawKeyRelease(_) | Event::XinputRawButtonPress(_) => Some(InputEvent::Other),
        _ => None,
    }
}

/// Ask for raw key releases and button presses on the root window
///
/// Returns false when the server lacks XInput 2; shortcuts still activate
/// then, but releases are never detected.
pub fn select_raw_input(ctx: &X11Context) -> Result<bool> {
    let present = ctx
        .conn
        .extension_information(xinput::X11_EXTENSION_NAME)
        .context("Failed to query XInput extension")?
        .is_some();
    if !present {
        warn!("XInput extension missing, shortcut release detection disabled");
        return Ok(false);
    }

    let version = ctx
        .conn
        .xinput_xi_query_version(x11::XINPUT_MAJOR, x11::XINPUT_MINOR)
        .context("Failed to send XInput version query")?
        .reply()
        .context("Failed to get XInput version reply")?;
    if version.major_version < x11::XINPUT_MAJOR {
        warn!(
            major = version.major_version,
            minor = version.minor_version,
            "XInput 2 not supported, shortcut release detection disabled"
        );
        return Ok(false);
    }
    debug!(
        major = version.major_version,
        minor = version.minor_version,
        "XInput version negotiated"
    );

    ctx.conn
        .xinput_xi_select_events(
            ctx.root(),
            &[xinput::EventMask {
                deviceid: xinput::Device::ALL_MASTER.into(),
                mask: vec![
                    (xinput::XIEventMask::RAW_KEY_RELEASE | xinput::XIEventMask::RAW_BUTTON_PRESS)
                        .into(),
                ],
            }],
        )
        .context("Failed to select XInput raw events")?
        .check()
        .context("XInput raw event selection rejected")?;
    ctx.conn.flush().context("Failed to flush X11 connection")?;

    info!("Listening for raw input events");
    Ok(true)
}

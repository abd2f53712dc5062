use std::collections::HashMap;

use anyhow::Result;
use tracing::{trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;

use super::handlers::{input, notification};
use crate::config::ShortcutAction;
use crate::input::translate;
use crate::notification::NotificationDaemon;
use crate::shortcut::{ShortcutId, ShortcutRegistry};
use crate::x11::{X11Context, X11Grabber, X11NotificationBackend};

/// Everything event handlers may touch
pub struct EventContext<'a> {
    pub app_ctx: &'a X11Context,
    pub registry: ShortcutRegistry<X11Grabber<'a>>,
    pub actions: HashMap<ShortcutId, ShortcutAction>,
    pub notifications: NotificationDaemon<X11NotificationBackend<'a>>,
    pub paste_on_release: bool,
}

impl EventContext<'_> {
    /// Release grabs and close popups before the connection goes away
    pub fn shutdown(&mut self) {
        self.registry.teardown();
        self.notifications.clear();
        if let Err(e) = self.app_ctx.conn.flush() {
            warn!(error = %e, "Failed to flush X11 connection on shutdown");
        }
    }
}

/// Route one X11 event to its handler
pub fn dispatch_event(ctx: &mut EventContext, event: &Event) -> Result<()> {
    if let Some(input_event) = translate(event) {
        return input::handle_input(ctx, input_event);
    }

    match event {
        Event::MappingNotify(e) => input::handle_mapping_notify(ctx, e),
        Event::Expose(_) | Event::ButtonPress(_) => notification::handle_window_event(ctx, event),
        Event::Error(err) => {
            warn!(
                error = ?err.error_kind,
                major_opcode = err.major_opcode,
                sequence = err.sequence,
                "Unhandled X11 error"
            );
            Ok(())
        }
        _ => {
            trace!(?event, "Ignoring X11 event");
            Ok(())
        }
    }
}

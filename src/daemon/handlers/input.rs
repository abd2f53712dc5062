use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::{Mapping, MappingNotifyEvent};

use super::super::dispatcher::EventContext;
use crate::config::ShortcutAction;
use crate::input::InputEvent;
use crate::notification::NotificationWidget;
use crate::shortcut::{ShortcutEvent, ShortcutId};
use crate::x11::fake_paste;

/// Handle key presses on grabbed keys and the raw events that follow them
pub fn handle_input(ctx: &mut EventContext, event: InputEvent) -> Result<()> {
    match ctx.registry.handle_input(&event) {
        Some(ShortcutEvent::Activated(id)) => run_action(ctx, id),
        Some(ShortcutEvent::Released(id)) => {
            if !ctx.paste_on_release {
                return Ok(());
            }
            let Some(grabber) = ctx.registry.backend_mut() else {
                return Ok(());
            };
            debug!(shortcut = %id, "Pasting after shortcut release");
            fake_paste(ctx.app_ctx, grabber.keymap())
        }
        None => Ok(()),
    }
}

/// Reload the keyboard mapping and re-grab every shortcut with the new key codes
#[tracing::instrument(skip(ctx, event), fields(request = ?event.request))]
pub fn handle_mapping_notify(ctx: &mut EventContext, event: &MappingNotifyEvent) -> Result<()> {
    if event.request != Mapping::KEYBOARD && event.request != Mapping::MODIFIER {
        return Ok(());
    }
    let Some(grabber) = ctx.registry.backend_mut() else {
        return Ok(());
    };
    grabber
        .reload_keymap()
        .context("Failed to reload keyboard mapping")?;

    for (id, e) in ctx.registry.regrab() {
        let sequence = ctx.registry.shortcut(id).map(|s| s.to_string()).unwrap_or_default();
        warn!(shortcut = %id, sequence = %sequence, error = %e, "Failed to re-register shortcut after keymap change");
    }
    let registered = ctx
        .actions
        .keys()
        .filter(|&&id| ctx.registry.is_registered(id))
        .count();
    info!(
        registered,
        configured = ctx.actions.len(),
        "Keyboard mapping changed, shortcuts re-registered"
    );
    Ok(())
}

#[tracing::instrument(skip(ctx))]
fn run_action(ctx: &mut EventContext, id: ShortcutId) -> Result<()> {
    let Some(action) = ctx.actions.get(&id).cloned() else {
        debug!("Shortcut has no action");
        return Ok(());
    };

    match action {
        ShortcutAction::Notify {
            title,
            message,
            timeout_ms,
            buttons,
        } => {
            let sequence = ctx
                .registry
                .shortcut(id)
                .map(|s| s.to_string())
                .unwrap_or_default();
            let now = Instant::now();
            let key = ctx
                .notifications
                .create_notification(&format!("shortcut:{sequence}"), now)?;
            if let Some(widget) = ctx.notifications.widget_mut(key) {
                widget.set_title(&title);
                widget.set_message(&message);
                widget.set_buttons(buttons);
            }
            ctx.notifications
                .set_interval(key, timeout_ms.map(Duration::from_millis), now);
            Ok(())
        }
        ShortcutAction::Command { program, args } => spawn_command(&program, &args),
    }
}

/// Start `program` without waiting for it to exit
pub(super) fn spawn_command(program: &str, args: &[String]) -> Result<()> {
    let child = tokio::process::Command::new(program)
        .args(args)
        .spawn()
        .context(format!("Failed to start '{program}'"))?;
    info!(program = %program, pid = ?child.id(), "Started command");
    Ok(())
}

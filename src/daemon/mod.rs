//! Main daemon loop: X11 events in, shortcut actions and notifications out

mod dispatcher;
mod handlers;

use std::collections::HashMap;
use std::os::fd::{AsFd, BorrowedFd};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::unix::AsyncFd;
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;

use crate::config::{Config, ShortcutAction, ShortcutConfig};
use crate::input::select_raw_input;
use crate::notification::{NotificationDaemon, NotificationWidget};
use crate::shortcut::{ShortcutId, ShortcutRegistry};
use crate::x11::{X11Context, X11Grabber, X11NotificationBackend};

pub use dispatcher::{EventContext, dispatch_event};

/// Register every configured shortcut; failures are logged and skipped
///
/// Disabled shortcuts keep their grab but never fire.
pub fn register_shortcuts(
    registry: &mut ShortcutRegistry<X11Grabber<'_>>,
    shortcuts: &[ShortcutConfig],
) -> HashMap<ShortcutId, ShortcutAction> {
    let mut actions = HashMap::new();
    for shortcut in shortcuts {
        let id = registry.create();
        registry.set_enabled(id, shortcut.enabled);
        match registry.set(id, &shortcut.sequence) {
            Ok(()) => {
                if !shortcut.enabled {
                    debug!(sequence = %shortcut.sequence, "Shortcut registered but disabled");
                }
                actions.insert(id, shortcut.action.clone());
            }
            Err(e) => {
                warn!(sequence = %shortcut.sequence, error = %e, "Failed to register shortcut");
                registry.remove(id);
            }
        }
    }
    actions
}

pub async fn run_daemon(config: Config) -> Result<()> {
    let app_ctx = X11Context::connect(None)?;
    let grabber = X11Grabber::new(&app_ctx)?;
    let mut registry = ShortcutRegistry::new(Some(grabber));
    let actions = register_shortcuts(&mut registry, &config.shortcuts);
    info!(
        registered = actions.len(),
        configured = config.shortcuts.len(),
        "Global shortcuts ready"
    );

    if config.paste_on_release {
        match select_raw_input(&app_ctx) {
            Ok(true) => {}
            Ok(false) => warn!("Paste on release needs XInput 2 and will not trigger"),
            Err(e) => warn!(error = %e, "Failed to subscribe to raw input"),
        }
    }

    let mut ctx = EventContext {
        app_ctx: &app_ctx,
        registry,
        actions,
        notifications: NotificationDaemon::new(
            X11NotificationBackend::new(&app_ctx),
            config.notifications.clone(),
        ),
        paste_on_release: config.paste_on_release,
    };

    let result = run_event_loop(&mut ctx, false).await;
    ctx.shutdown();
    info!("Daemon stopped");
    result
}

/// Show a single notification and return once it has been closed or expired
pub async fn run_single_notification(
    config: Config,
    title: &str,
    message: &str,
    timeout: Option<Duration>,
) -> Result<()> {
    let app_ctx = X11Context::connect(None)?;
    let mut ctx = EventContext {
        app_ctx: &app_ctx,
        registry: ShortcutRegistry::new(Some(X11Grabber::new(&app_ctx)?)),
        actions: HashMap::new(),
        notifications: NotificationDaemon::new(
            X11NotificationBackend::new(&app_ctx),
            config.notifications,
        ),
        paste_on_release: false,
    };

    let now = Instant::now();
    let key = ctx.notifications.create_notification("", now)?;
    if let Some(widget) = ctx.notifications.widget_mut(key) {
        widget.set_title(title);
        widget.set_message(message);
    }
    ctx.notifications.set_interval(key, timeout, now);

    let result = run_event_loop(&mut ctx, true).await;
    ctx.shutdown();
    result
}

/// Pump X11 events until Ctrl-C, or until the last notification closes when
/// `until_empty` is set
pub async fn run_event_loop(ctx: &mut EventContext<'_>, until_empty: bool) -> Result<()> {
    let app_ctx = ctx.app_ctx;
    let fd = watch_connection(app_ctx.conn.stream())?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        while let Some(event) = ctx
            .app_ctx
            .conn
            .poll_for_event()
            .context("X11 connection lost")?
        {
            if let Err(e) = dispatch_event(ctx, &event) {
                error!(error = %format!("{e:#}"), "Failed to handle X11 event");
            }
        }

        ctx.notifications.on_tick(Instant::now());
        ctx.app_ctx
            .conn
            .flush()
            .context("Failed to flush X11 connection")?;

        if until_empty && ctx.notifications.is_empty() {
            return Ok(());
        }

        let deadline = ctx.notifications.next_deadline();
        tokio::select! {
            guard = fd.readable() => {
                guard.context("Failed to wait for X11 events")?.clear_ready();
            }
            _ = sleep_until(deadline) => {}
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Received Ctrl-C, shutting down");
                return Ok(());
            }
        }
    }
}

/// Register the socket behind `stream` with the reactor for readiness polling
fn watch_connection(stream: &impl AsFd) -> Result<AsyncFd<BorrowedFd<'_>>> {
    AsyncFd::new(stream.as_fd()).context("Failed to register X11 connection with the event loop")
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[tokio::test(flavor = "current_thread")]
    async fn test_watched_connection_wakes_on_incoming_data() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        local.set_nonblocking(true).unwrap();
        let fd = watch_connection(&local).unwrap();

        remote.write_all(&[1]).unwrap();
        let guard = tokio::time::timeout(Duration::from_secs(5), fd.readable())
            .await
            .expect("socket never became readable")
            .unwrap();
        assert_eq!(guard.get_inner().as_raw_fd(), local.as_raw_fd());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_sleep_without_deadline_never_finishes() {
        let waited = tokio::time::timeout(Duration::from_millis(20), sleep_until(None)).await;
        assert!(waited.is_err());
        sleep_until(Some(Instant::now())).await;
    }
}

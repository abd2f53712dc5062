//! Notification bookkeeping and debounced layout

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::layout::{LayoutParams, place};
use super::widget::{NotificationBackend, NotificationButton, NotificationEvent, NotificationWidget};
use super::{Debounce, NotificationSettings};
use crate::common::constants::notification;
use crate::common::types::Dimensions;

/// Stable handle of one notification, unique for the daemon's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationKey(u64);

struct NotificationEntry<W> {
    key: NotificationKey,
    /// Empty for anonymous notifications, which are never reused
    id: String,
    widget: W,
    expires_at: Option<Instant>,
}

pub struct NotificationDaemon<B: NotificationBackend> {
    backend: B,
    settings: NotificationSettings,
    entries: Vec<NotificationEntry<B::Widget>>,
    next_key: u64,
    update_timer: Debounce,
    layout_passes: u64,
}

impl<B: NotificationBackend> NotificationDaemon<B> {
    pub fn new(backend: B, settings: NotificationSettings) -> Self {
        Self {
            backend,
            settings: settings.sanitized(),
            entries: Vec::new(),
            next_key: 0,
            update_timer: Debounce::new(notification::UPDATE_DEBOUNCE),
            layout_passes: 0,
        }
    }

    /// Return the notification with `id`, or create a new one
    ///
    /// An empty `id` always creates a new notification. Either way a layout
    /// pass is scheduled.
    pub fn create_notification(&mut self, id: &str, now: Instant) -> Result<NotificationKey> {
        let key = match self.find(id) {
            Some(key) => {
                debug!(id = %id, "Reusing notification");
                key
            }
            None => {
                let widget = self
                    .backend
                    .create_widget()
                    .context(format!("Failed to create notification '{id}'"))?;
                let key = NotificationKey(self.next_key);
                self.next_key += 1;
                self.entries.push(NotificationEntry {
                    key,
                    id: id.to_string(),
                    widget,
                    expires_at: None,
                });
                debug!(id = %id, count = self.entries.len(), "Created notification");
                key
            }
        };

        self.update_notifications(now);
        Ok(key)
    }

    /// Look up a notification by id; anonymous notifications are never found
    pub fn find(&self, id: &str) -> Option<NotificationKey> {
        if id.is_empty() {
            return None;
        }
        self.entries.iter().find(|e| e.id == id).map(|e| e.key)
    }

    pub fn widget_mut(&mut self, key: NotificationKey) -> Option<&mut B::Widget> {
        self.entry_mut(key).map(|e| &mut e.widget)
    }

    pub fn widgets(&self) -> impl Iterator<Item = (NotificationKey, &B::Widget)> {
        self.entries.iter().map(|e| (e.key, &e.widget))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Close the notification automatically after `interval`; `None` keeps it
    /// until closed
    pub fn set_interval(&mut self, key: NotificationKey, interval: Option<Duration>, now: Instant) {
        if let Some(entry) = self.entry_mut(key) {
            entry.expires_at = interval.map(|i| now + i);
        }
    }

    /// Close the notification with `id`; unknown ids are ignored
    pub fn remove_notification(&mut self, id: &str, now: Instant) {
        if let Some(key) = self.find(id) {
            self.close(key, now);
        }
    }

    /// React to user interaction with a notification
    ///
    /// Button clicks are handed back to the caller.
    pub fn handle_event(
        &mut self,
        key: NotificationKey,
        event: NotificationEvent,
        now: Instant,
    ) -> Option<NotificationButton> {
        match event {
            NotificationEvent::Close => {
                self.close(key, now);
                None
            }
            NotificationEvent::ButtonClicked(button) => {
                debug!(button = %button.name, "Notification button clicked");
                Some(button)
            }
        }
    }

    fn close(&mut self, key: NotificationKey, now: Instant) {
        let Some(index) = self.entries.iter().position(|e| e.key == key) else {
            return;
        };
        let mut entry = self.entries.remove(index);
        if let Err(e) = entry.widget.close() {
            warn!(id = %entry.id, error = %e, "Failed to close notification window");
        }
        debug!(id = %entry.id, remaining = self.entries.len(), "Closed notification");
        self.update_notifications(now);
    }

    /// Close every notification, e.g. on shutdown
    pub fn clear(&mut self) {
        for mut entry in self.entries.drain(..) {
            if let Err(e) = entry.widget.close() {
                warn!(id = %entry.id, error = %e, "Failed to close notification window");
            }
        }
        self.update_timer.cancel();
    }

    /// Schedule a layout pass; calls while one is pending are coalesced
    pub fn update_notifications(&mut self, now: Instant) {
        self.update_timer.trigger(now);
    }

    /// Earliest moment `on_tick` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .iter()
            .filter_map(|e| e.expires_at)
            .chain(self.update_timer.deadline())
            .min()
    }

    /// Expire timed-out notifications and run a due layout pass
    pub fn on_tick(&mut self, now: Instant) {
        let expired: Vec<NotificationKey> = self
            .entries
            .iter()
            .filter(|e| e.expires_at.is_some_and(|t| t <= now))
            .map(|e| e.key)
            .collect();
        for key in expired {
            self.close(key, now);
        }

        if self.update_timer.fire(now) {
            self.do_update_notifications();
        }
    }

    fn do_update_notifications(&mut self) {
        self.layout_passes += 1;
        let settings = &self.settings;
        let maximum = Dimensions::new(
            self.backend.points_to_pixels(settings.maximum_width).max(1) as u32,
            self.backend.points_to_pixels(settings.maximum_height).max(1) as u32,
        );

        let sizes: Vec<Dimensions> = self
            .entries
            .iter_mut()
            .map(|entry| {
                let widget = &mut entry.widget;
                widget.set_opacity(settings.opacity);
                widget.set_style(&settings.style);
                widget.set_maximum_size(maximum);
                widget.adjust();
                widget.size()
            })
            .collect();

        let params = LayoutParams {
            anchor: settings.position.anchor(),
            screen: self.backend.screen_geometry(),
            offset_x: self.backend.points_to_pixels(settings.horizontal_offset),
            offset_y: self.backend.points_to_pixels(settings.vertical_offset),
            margin: self.backend.points_to_pixels(notification::MARGIN_POINTS),
            center_on_screen: settings.center_on_screen,
        };

        for (entry, position) in self.entries.iter_mut().zip(place(&params, &sizes)) {
            if let Err(e) = entry.widget.move_to(position).and_then(|_| entry.widget.show()) {
                warn!(id = %entry.id, error = %e, "Failed to show notification");
            }
        }

        debug!(
            count = self.entries.len(),
            pass = self.layout_passes,
            "Updated notification layout"
        );
    }

    fn entry_mut(&mut self, key: NotificationKey) -> Option<&mut NotificationEntry<B::Widget>> {
        self.entries.iter_mut().find(|e| e.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Position, Rect};
    use crate::notification::{NotificationPosition, NotificationStyle};

    const FAKE_SIZE: Dimensions = Dimensions {
        width: 400,
        height: 60,
    };

    #[derive(Debug, Default)]
    struct FakeWidget {
        title: String,
        natural: Dimensions,
        size: Dimensions,
        maximum: Dimensions,
        opacity: f64,
        position: Option<Position>,
        shown: u32,
    }

    impl NotificationWidget for FakeWidget {
        fn set_title(&mut self, title: &str) {
            self.title = title.to_string();
        }
        fn set_message(&mut self, _message: &str) {}
        fn set_buttons(&mut self, _buttons: Vec<NotificationButton>) {}
        fn set_opacity(&mut self, opacity: f64) {
            self.opacity = opacity;
        }
        fn set_style(&mut self, _style: &NotificationStyle) {}
        fn set_maximum_size(&mut self, maximum: Dimensions) {
            self.maximum = maximum;
        }
        fn adjust(&mut self) {
            self.size = self.natural.clamp_to(self.maximum);
        }
        fn size(&self) -> Dimensions {
            self.size
        }
        fn move_to(&mut self, position: Position) -> Result<()> {
            self.position = Some(position);
            Ok(())
        }
        fn show(&mut self) -> Result<()> {
            self.shown += 1;
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// 72 DPI so points equal pixels
    struct FakeBackend;

    impl NotificationBackend for FakeBackend {
        type Widget = FakeWidget;

        fn create_widget(&mut self) -> Result<FakeWidget> {
            Ok(FakeWidget {
                natural: FAKE_SIZE,
                ..Default::default()
            })
        }

        fn screen_geometry(&self) -> Rect {
            Rect::new(0, 0, 1000, 800)
        }

        fn points_to_pixels(&self, points: i32) -> i32 {
            points
        }
    }

    fn daemon() -> NotificationDaemon<FakeBackend> {
        NotificationDaemon::new(FakeBackend, NotificationSettings::default())
    }

    fn count(daemon: &NotificationDaemon<FakeBackend>) -> usize {
        daemon.widgets().count()
    }

    fn shown(daemon: &NotificationDaemon<FakeBackend>) -> Vec<u32> {
        daemon.widgets().map(|(_, w)| w.shown).collect()
    }

    fn tick_after_debounce(daemon: &mut NotificationDaemon<FakeBackend>, start: Instant) {
        daemon.on_tick(start + notification::UPDATE_DEBOUNCE);
    }

    #[test]
    fn test_same_id_is_reused() {
        let now = Instant::now();
        let mut daemon = daemon();
        let first = daemon.create_notification("clipboard", now).unwrap();
        let second = daemon.create_notification("clipboard", now).unwrap();
        let third = daemon.create_notification("clipboard", now).unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(count(&daemon), 1);
        assert_eq!(daemon.find("clipboard"), Some(first));

        daemon.widget_mut(first).unwrap().set_title("Copied");
        assert_eq!(daemon.widget_mut(third).unwrap().title, "Copied");
    }

    #[test]
    fn test_empty_id_always_creates() {
        let now = Instant::now();
        let mut daemon = daemon();
        let a = daemon.create_notification("", now).unwrap();
        let b = daemon.create_notification("", now).unwrap();
        assert_ne!(a, b);
        assert_eq!(count(&daemon), 2);
        assert_eq!(daemon.find(""), None);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let now = Instant::now();
        let mut daemon = daemon();
        daemon.create_notification("a", now).unwrap();
        tick_after_debounce(&mut daemon, now);
        assert_eq!(shown(&daemon), vec![1]);

        daemon.remove_notification("missing", now);
        assert_eq!(count(&daemon), 1);
        assert_eq!(daemon.next_deadline(), None);
        daemon.on_tick(now + Duration::from_secs(1));
        assert_eq!(shown(&daemon), vec![1]);
    }

    #[test]
    fn test_remove_closes_widget_and_reflows() {
        let now = Instant::now();
        let mut daemon = daemon();
        daemon.create_notification("a", now).unwrap();
        daemon.create_notification("b", now).unwrap();
        tick_after_debounce(&mut daemon, now);

        let later = now + Duration::from_secs(1);
        daemon.remove_notification("a", later);
        assert_eq!(daemon.find("a"), None);
        assert!(daemon.find("b").is_some());
        assert_eq!(count(&daemon), 1);
        assert_eq!(daemon.next_deadline(), Some(later + notification::UPDATE_DEBOUNCE));

        daemon.on_tick(later + notification::UPDATE_DEBOUNCE);
        assert_eq!(shown(&daemon), vec![2]);
    }

    #[test]
    fn test_rapid_updates_trigger_one_layout_pass() {
        let now = Instant::now();
        let mut daemon = daemon();
        daemon.create_notification("a", now).unwrap();
        for ms in [10, 20, 50, 99] {
            let t = now + Duration::from_millis(ms);
            daemon.create_notification("", t).unwrap();
            daemon.update_notifications(t);
            daemon.on_tick(t);
        }
        assert_eq!(shown(&daemon), vec![0; 5]);

        tick_after_debounce(&mut daemon, now);
        assert_eq!(shown(&daemon), vec![1; 5]);
        daemon.on_tick(now + Duration::from_millis(500));
        assert_eq!(shown(&daemon), vec![1; 5]);
    }

    #[test]
    fn test_layout_applies_settings_and_positions() {
        let now = Instant::now();
        let settings = NotificationSettings {
            position: NotificationPosition::TopLeft,
            horizontal_offset: 5,
            vertical_offset: 7,
            maximum_width: 300,
            maximum_height: 100,
            opacity: 0.8,
            ..Default::default()
        };
        let mut daemon = NotificationDaemon::new(FakeBackend, settings);
        let a = daemon.create_notification("a", now).unwrap();
        let b = daemon.create_notification("b", now).unwrap();
        tick_after_debounce(&mut daemon, now);

        let a = daemon.widget_mut(a).unwrap();
        assert_eq!(a.size, Dimensions::new(300, 60));
        assert_eq!(a.opacity, 0.8);
        assert_eq!(a.position, Some(Position::new(5, 7)));
        let b = daemon.widget_mut(b).unwrap();
        assert_eq!(b.position, Some(Position::new(5, 7 + 60 + 10)));
    }

    #[test]
    fn test_interval_expires_notification() {
        let now = Instant::now();
        let mut daemon = daemon();
        let key = daemon.create_notification("a", now).unwrap();
        daemon.set_interval(key, Some(Duration::from_secs(2)), now);
        tick_after_debounce(&mut daemon, now);
        assert_eq!(daemon.next_deadline(), Some(now + Duration::from_secs(2)));

        daemon.on_tick(now + Duration::from_secs(2));
        assert!(daemon.is_empty());
    }

    #[test]
    fn test_events_close_or_forward_buttons() {
        let now = Instant::now();
        let mut daemon = daemon();
        let key = daemon.create_notification("a", now).unwrap();
        let button = NotificationButton {
            name: "Open".to_string(),
            data: "copyq show".to_string(),
        };

        let clicked = daemon.handle_event(key, NotificationEvent::ButtonClicked(button.clone()), now);
        assert_eq!(clicked, Some(button));
        assert_eq!(count(&daemon), 1);

        assert_eq!(daemon.handle_event(key, NotificationEvent::Close, now), None);
        assert!(daemon.is_empty());
        // Closing twice is harmless
        assert_eq!(daemon.handle_event(key, NotificationEvent::Close, now), None);
    }

    #[test]
    fn test_clear_closes_everything() {
        let now = Instant::now();
        let mut daemon = daemon();
        daemon.create_notification("a", now).unwrap();
        daemon.create_notification("b", now).unwrap();
        daemon.clear();
        assert!(daemon.is_empty());
        assert_eq!(daemon.next_deadline(), None);
    }
}

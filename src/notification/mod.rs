//! Floating notification popups
//!
//! The [`NotificationDaemon`] owns the on-screen notifications and reflows
//! them on a debounced timer. Drawing is delegated to a
//! [`NotificationBackend`], so layout and bookkeeping work without a display.

mod daemon;
mod debounce;
mod layout;
mod widget;

use serde::{Deserialize, Serialize};

use crate::common::constants::notification;
use crate::common::types::Color;

pub use daemon::NotificationDaemon;
pub use debounce::Debounce;
pub use layout::Anchor;
pub use widget::{NotificationBackend, NotificationButton, NotificationEvent, NotificationWidget};

/// Screen corner or edge notifications stack from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationPosition {
    TopLeft,
    Top,
    TopRight,
    BottomLeft,
    Bottom,
    #[default]
    BottomRight,
}

impl NotificationPosition {
    pub fn anchor(self) -> Anchor {
        match self {
            Self::TopLeft => Anchor::TOP | Anchor::LEFT,
            Self::Top => Anchor::TOP,
            Self::TopRight => Anchor::TOP | Anchor::RIGHT,
            Self::BottomLeft => Anchor::BOTTOM | Anchor::LEFT,
            Self::Bottom => Anchor::BOTTOM,
            Self::BottomRight => Anchor::BOTTOM | Anchor::RIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationStyle {
    pub background: Color,
    pub foreground: Color,
    pub border: Color,
}

impl Default for NotificationStyle {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x30, 0x30, 0x30),
            foreground: Color::rgb(0xEE, 0xEE, 0xEE),
            border: Color::rgb(0x60, 0x60, 0x60),
        }
    }
}

/// Placement and appearance shared by all notifications
///
/// Offsets and sizes are in typographic points and converted with the
/// screen DPI at layout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub position: NotificationPosition,
    pub horizontal_offset: i32,
    pub vertical_offset: i32,
    pub maximum_width: i32,
    pub maximum_height: i32,
    pub opacity: f64,
    /// Ignore `position` and put every notification in the middle of the screen
    pub center_on_screen: bool,
    pub style: NotificationStyle,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            position: NotificationPosition::default(),
            horizontal_offset: 0,
            vertical_offset: 0,
            maximum_width: notification::DEFAULT_MAXIMUM_WIDTH_POINTS,
            maximum_height: notification::DEFAULT_MAXIMUM_HEIGHT_POINTS,
            opacity: 1.0,
            center_on_screen: false,
            style: NotificationStyle::default(),
        }
    }
}

impl NotificationSettings {
    /// Clamp values that would produce invisible or broken windows
    pub fn sanitized(mut self) -> Self {
        self.opacity = if self.opacity.is_finite() {
            self.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.maximum_width = self.maximum_width.max(1);
        self.maximum_height = self.maximum_height.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_map_to_anchors() {
        assert_eq!(
            NotificationPosition::BottomRight.anchor(),
            Anchor::BOTTOM | Anchor::RIGHT
        );
        assert_eq!(NotificationPosition::Top.anchor(), Anchor::TOP);
        assert!(!NotificationPosition::Bottom.anchor().intersects(Anchor::LEFT | Anchor::RIGHT));
    }

    #[test]
    fn test_settings_sanitized() {
        let settings = NotificationSettings {
            opacity: 3.0,
            maximum_width: 0,
            maximum_height: -5,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.opacity, 1.0);
        assert_eq!(settings.maximum_width, 1);
        assert_eq!(settings.maximum_height, 1);

        let nan = NotificationSettings {
            opacity: f64::NAN,
            ..Default::default()
        };
        assert_eq!(nan.sanitized().opacity, 1.0);
    }

    #[test]
    fn test_position_serde_names() {
        let json = serde_json::to_string(&NotificationPosition::TopLeft).unwrap();
        assert_eq!(json, "\"top-left\"");
        let parsed: NotificationPosition = serde_json::from_str("\"bottom\"").unwrap();
        assert_eq!(parsed, NotificationPosition::Bottom);
    }
}

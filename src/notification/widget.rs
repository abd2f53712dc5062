//! Contract between the notification daemon and the windows it manages

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::NotificationStyle;
use crate::common::types::{Dimensions, Position, Rect};

/// Clickable button shown at the bottom of a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationButton {
    pub name: String,
    /// Opaque payload handed back when the button is clicked
    #[serde(default)]
    pub data: String,
}

/// User interaction reported by a notification window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Close,
    ButtonClicked(NotificationButton),
}

/// One notification window
///
/// Setters only record state; it reaches the screen on `adjust`/`show`.
pub trait NotificationWidget {
    fn set_title(&mut self, title: &str);
    fn set_message(&mut self, message: &str);
    fn set_buttons(&mut self, buttons: Vec<NotificationButton>);
    fn set_opacity(&mut self, opacity: f64);
    fn set_style(&mut self, style: &NotificationStyle);
    fn set_maximum_size(&mut self, maximum: Dimensions);
    /// Resize to fit the content, within the maximum size
    fn adjust(&mut self);
    fn size(&self) -> Dimensions;
    fn move_to(&mut self, position: Position) -> Result<()>;
    fn show(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Creates widgets and answers screen queries for the daemon
pub trait NotificationBackend {
    type Widget: NotificationWidget;

    fn create_widget(&mut self) -> Result<Self::Widget>;
    fn screen_geometry(&self) -> Rect;
    fn points_to_pixels(&self, points: i32) -> i32;
}

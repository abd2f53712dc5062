//! Screen geometry primitives

use serde::{Deserialize, Serialize};

/// Top-left corner of a window in root window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Window size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamp each side to `max`, keeping at least one pixel
    pub fn clamp_to(self, max: Dimensions) -> Self {
        Self {
            width: self.width.min(max.width).max(1),
            height: self.height.min(max.height).max(1),
        }
    }
}

/// Axis-aligned rectangle
///
/// `right()` and `bottom()` are inclusive edges, so a 1920 px wide screen
/// at x = 0 has `right() == 1919`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32 - 1
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32 - 1
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges_are_inclusive() {
        let screen = Rect::new(0, 0, 1920, 1080);
        assert_eq!(screen.right(), 1919);
        assert_eq!(screen.bottom(), 1079);
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(10, 20, 5, 5);
        assert!(rect.contains(10, 20));
        assert!(rect.contains(14, 24));
        assert!(!rect.contains(15, 24));
        assert!(!rect.contains(9, 20));
    }

    #[test]
    fn test_dimensions_clamp_keeps_one_pixel() {
        let clamped = Dimensions::new(500, 0).clamp_to(Dimensions::new(300, 100));
        assert_eq!(clamped, Dimensions::new(300, 1));
    }
}

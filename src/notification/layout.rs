//! Stacking of notifications along a screen edge

use bitflags::bitflags;

use crate::common::types::{Dimensions, Position, Rect};

bitflags! {
    /// Edge flags; neither LEFT nor RIGHT centers horizontally
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Anchor: u8 {
        const TOP = 1 << 0;
        const BOTTOM = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

/// Everything `place` needs, already converted to pixels
#[derive(Debug, Clone, Copy)]
pub struct LayoutParams {
    pub anchor: Anchor,
    pub screen: Rect,
    pub offset_x: i32,
    pub offset_y: i32,
    pub margin: i32,
    pub center_on_screen: bool,
}

/// Compute the top-left corner of each notification, in list order
///
/// With a TOP anchor the first notification sits at the top edge and later
/// ones stack downwards; otherwise the first sits at the bottom edge and
/// later ones stack upwards.
pub fn place(params: &LayoutParams, sizes: &[Dimensions]) -> Vec<Position> {
    let screen = params.screen;
    let anchor = params.anchor;

    let mut y = if anchor.contains(Anchor::TOP) {
        screen.y + params.offset_y
    } else {
        screen.bottom() - params.offset_y
    };

    sizes
        .iter()
        .map(|size| {
            let width = size.width as i32;
            let height = size.height as i32;

            if params.center_on_screen {
                return Position::new(
                    screen.x + (screen.width as i32 - width) / 2,
                    screen.y + (screen.height as i32 - height) / 2,
                );
            }

            let x = if anchor.contains(Anchor::LEFT) {
                screen.x + params.offset_x
            } else if anchor.contains(Anchor::RIGHT) {
                screen.right() - width - params.offset_x
            } else {
                screen.right() / 2 - width / 2
            };

            if anchor.contains(Anchor::BOTTOM) {
                y -= height;
            }
            let position = Position::new(x, y);

            if anchor.contains(Anchor::TOP) {
                y += height + params.margin;
            } else {
                y -= params.margin;
            }
            position
        })
        .collect()
}

//! Domain types for type safety and clarity

pub mod color;
pub mod geometry;

pub use color::Color;
pub use geometry::{Dimensions, Position, Rect};

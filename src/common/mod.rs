//! Shared constants and domain types used by the shortcut and notification layers

pub mod constants;
pub mod types;

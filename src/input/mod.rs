//! Keyboard and pointer input relevant to global shortcuts

mod listener;

pub use listener::{InputEvent, select_raw_input, translate};

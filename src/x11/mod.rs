//! X11 plumbing: connection, key grabs, synthetic input and popup windows

mod context;
mod grab;
mod keymap;
mod notification_window;
mod ops;

pub use context::X11Context;
pub use grab::X11Grabber;
pub use keymap::{native_modifiers, relevant_modifiers};
pub use notification_window::X11NotificationBackend;
pub use ops::fake_paste;

//! Global shortcuts: key sequence parsing, grab registry and release detection

mod key_sequence;
mod registry;
mod release;

pub use key_sequence::{Key, KeySequence, Modifiers};
pub use registry::{KeyGrabber, NativeShortcut, ShortcutEvent, ShortcutId, ShortcutRegistry};

//! Keyboard mapping: keysyms to key codes, modifiers to core masks

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, Keycode, ModMask};
use x11rb::rust_connection::RustConnection;

use crate::shortcut::Modifiers;

/// Core modifier bits that take part in shortcut matching; Lock and Mod2
/// (Caps Lock, Num Lock) are masked out
pub fn relevant_modifiers() -> u16 {
    u16::from(ModMask::SHIFT | ModMask::CONTROL | ModMask::M1 | ModMask::M4)
}

/// Lock-state variants every grab is repeated for, so Caps Lock and Num Lock
/// do not disable the shortcut
pub fn lock_mask_variants() -> [u16; 4] {
    let num_lock = u16::from(ModMask::M2);
    let caps_lock = u16::from(ModMask::LOCK);
    [0, num_lock, caps_lock, num_lock | caps_lock]
}

/// Map toolkit modifiers to the X11 core modifier mask
pub fn native_modifiers(modifiers: Modifiers) -> u16 {
    let mut native = ModMask::from(0u16);
    if modifiers.contains(Modifiers::SHIFT) {
        native = native | ModMask::SHIFT;
    }
    if modifiers.contains(Modifiers::CONTROL) {
        native = native | ModMask::CONTROL;
    }
    if modifiers.contains(Modifiers::ALT) {
        native = native | ModMask::M1;
    }
    if modifiers.contains(Modifiers::META) {
        native = native | ModMask::M4;
    }
    u16::from(native)
}

/// Snapshot of the server keyboard mapping
#[derive(Debug, Clone)]
pub struct Keymap {
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<u32>,
}

impl Keymap {
    pub fn load(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;

        let reply = conn
            .get_keyboard_mapping(min_keycode, count)
            .context("Failed to request keyboard mapping")?
            .reply()
            .context("Failed to get keyboard mapping reply")?;

        debug!(
            min_keycode = min_keycode,
            count = count,
            per_keycode = reply.keysyms_per_keycode,
            "Loaded keyboard mapping"
        );

        Ok(Self::from_parts(
            min_keycode,
            usize::from(reply.keysyms_per_keycode),
            reply.keysyms,
        ))
    }

    pub fn from_parts(min_keycode: Keycode, keysyms_per_keycode: usize, keysyms: Vec<u32>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
        }
    }

    /// Find the key code producing `keysym`
    ///
    /// Columns are searched before rows, so a keysym reachable without
    /// modifiers wins over one that needs Shift or a group switch.
    pub fn keycode_for(&self, keysym: u32) -> Option<Keycode> {
        if keysym == 0 || self.keysyms_per_keycode == 0 {
            return None;
        }
        let rows = self.keysyms.len() / self.keysyms_per_keycode;
        (0..self.keysyms_per_keycode).find_map(|column| {
            (0..rows)
                .find(|row| self.keysyms[row * self.keysyms_per_keycode + column] == keysym)
                .and_then(|row| u8::try_from(usize::from(self.min_keycode) + row).ok())
        })
    }
}

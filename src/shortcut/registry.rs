//! Global shortcut registry
//!
//! Owns the table of grabbed `(key code, modifier mask)` pairs and the
//! shortcut handles that own them. One registry lives for the whole daemon;
//! [`ShortcutRegistry::teardown`] releases every grab on shutdown.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::key_sequence::{Key, KeySequence, KeySequenceError};
use super::release::ReleaseTracker;
use crate::input::InputEvent;
use crate::x11::{native_modifiers, relevant_modifiers};

/// OS-level grab operations the registry depends on
pub trait KeyGrabber {
    /// Key code that produces `key`, if the current keyboard mapping has one
    fn keycode_for(&self, key: &Key) -> Option<u8>;
    /// Grab all lock-mask variants; false if any of them failed
    fn grab(&self, native: NativeShortcut) -> bool;
    fn ungrab(&self, native: NativeShortcut) -> bool;
}

/// Windowing-system representation of a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeShortcut {
    pub keycode: u8,
    pub modifiers: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortcutId(usize);

impl std::fmt::Display for ShortcutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Emitted by [`ShortcutRegistry::handle_input`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutEvent {
    Activated(ShortcutId),
    /// Keys of the last activated shortcut appear to be released (best effort)
    Released(ShortcutId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShortcutError {
    #[error("no display connection")]
    NoDisplay,
    #[error("unknown shortcut handle {0}")]
    UnknownHandle(ShortcutId),
    #[error(transparent)]
    InvalidSequence(#[from] KeySequenceError),
    #[error("key '{0}' is not on the current keyboard layout")]
    NoKeycode(Key),
    #[error("{sequence} is already registered by shortcut {owner}")]
    AlreadyRegistered {
        sequence: KeySequence,
        owner: ShortcutId,
    },
    #[error("{0} is grabbed by another application")]
    GrabFailed(KeySequence),
    #[error("could not release the previous grab of shortcut {0}")]
    ReleaseFailed(ShortcutId),
}

#[derive(Debug)]
struct GlobalShortcut {
    sequence: Option<KeySequence>,
    native: NativeShortcut,
    enabled: bool,
    registered: bool,
}

impl GlobalShortcut {
    fn new() -> Self {
        Self {
            sequence: None,
            native: NativeShortcut::default(),
            enabled: true,
            registered: false,
        }
    }
}

pub struct ShortcutRegistry<B: KeyGrabber> {
    backend: Option<B>,
    shortcuts: HashMap<ShortcutId, GlobalShortcut>,
    registrations: HashMap<NativeShortcut, ShortcutId>,
    next_id: usize,
    release: ReleaseTracker,
    last_activated: Option<ShortcutId>,
}

impl<B: KeyGrabber> ShortcutRegistry<B> {
    /// `backend` is `None` when no display is available; every operation
    /// then fails quietly
    pub fn new(backend: Option<B>) -> Self {
        if backend.is_none() {
            warn!("No display connection, global shortcuts are disabled");
        }
        Self {
            backend,
            shortcuts: HashMap::new(),
            registrations: HashMap::new(),
            next_id: 0,
            release: ReleaseTracker::new(),
            last_activated: None,
        }
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    /// Allocate a new, unregistered and enabled shortcut handle
    pub fn create(&mut self) -> ShortcutId {
        let id = ShortcutId(self.next_id);
        self.next_id += 1;
        self.shortcuts.insert(id, GlobalShortcut::new());
        id
    }

    /// Parse `text` and register it for `id`, releasing the previous grab first
    pub fn set(&mut self, id: ShortcutId, text: &str) -> Result<(), ShortcutError> {
        self.release_previous(id)?;
        let sequence = KeySequence::parse(text)?;
        self.register(id, sequence)
    }

    pub fn set_sequence(&mut self, id: ShortcutId, sequence: KeySequence) -> Result<(), ShortcutError> {
        self.release_previous(id)?;
        self.register(id, sequence)
    }

    /// Re-grab every shortcut with its current sequence, e.g. after the
    /// keyboard mapping changed
    ///
    /// All grabs are released before any is taken again, so shortcuts whose
    /// key codes were swapped do not collide with each other's old entries.
    /// Returns the shortcuts that could not be registered again.
    pub fn regrab(&mut self) -> Vec<(ShortcutId, ShortcutError)> {
        let mut ids: Vec<ShortcutId> = self
            .shortcuts
            .iter()
            .filter(|(_, s)| s.sequence.is_some())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();

        let mut failures = Vec::new();
        ids.retain(|&id| match self.release_previous(id) {
            Ok(()) => true,
            Err(e) => {
                failures.push((id, e));
                false
            }
        });
        for id in ids {
            let Some(sequence) = self.shortcut(id) else {
                continue;
            };
            if let Err(e) = self.register(id, sequence) {
                failures.push((id, e));
            }
        }
        failures
    }

    /// Release the grab a registered handle holds; fails if it is still held
    fn release_previous(&mut self, id: ShortcutId) -> Result<(), ShortcutError> {
        if !self.shortcuts.contains_key(&id) {
            return Err(ShortcutError::UnknownHandle(id));
        }
        if self.is_registered(id) && !self.unset(id) {
            return Err(ShortcutError::ReleaseFailed(id));
        }
        Ok(())
    }

    fn register(&mut self, id: ShortcutId, sequence: KeySequence) -> Result<(), ShortcutError> {
        let shortcut = self
            .shortcuts
            .get_mut(&id)
            .ok_or(ShortcutError::UnknownHandle(id))?;
        shortcut.sequence = Some(sequence);
        shortcut.registered = false;

        let Some(backend) = self.backend.as_ref() else {
            debug!(shortcut = %id, "Ignoring shortcut registration without display");
            return Err(ShortcutError::NoDisplay);
        };

        let keycode = backend
            .keycode_for(&sequence.key)
            .ok_or(ShortcutError::NoKeycode(sequence.key))?;
        let native = NativeShortcut {
            keycode,
            modifiers: native_modifiers(sequence.modifiers),
        };
        shortcut.native = native;

        if let Some(&owner) = self.registrations.get(&native) {
            return Err(ShortcutError::AlreadyRegistered { sequence, owner });
        }

        if !backend.grab(native) {
            return Err(ShortcutError::GrabFailed(sequence));
        }

        shortcut.registered = true;
        self.registrations.insert(native, id);
        info!(
            shortcut = %id,
            sequence = %sequence,
            keycode = native.keycode,
            modifiers = native.modifiers,
            "Registered global shortcut"
        );
        Ok(())
    }

    /// Release the grab owned by `id`
    ///
    /// Returns false without doing anything when the handle is not registered
    /// or does not own its native pair.
    pub fn unset(&mut self, id: ShortcutId) -> bool {
        let Some(shortcut) = self.shortcuts.get_mut(&id) else {
            return false;
        };
        if !shortcut.registered || self.registrations.get(&shortcut.native) != Some(&id) {
            return false;
        }
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        if !backend.ungrab(shortcut.native) {
            warn!(shortcut = %id, "Failed to release global shortcut");
            return false;
        }

        self.registrations.remove(&shortcut.native);
        shortcut.registered = false;
        if self.last_activated == Some(id) {
            self.last_activated = None;
        }
        debug!(shortcut = %id, "Released global shortcut");
        true
    }

    /// Unset and forget the handle
    pub fn remove(&mut self, id: ShortcutId) {
        self.unset(id);
        self.shortcuts.remove(&id);
    }

    pub fn set_enabled(&mut self, id: ShortcutId, enabled: bool) {
        if let Some(shortcut) = self.shortcuts.get_mut(&id) {
            shortcut.enabled = enabled;
        }
    }

    pub fn is_enabled(&self, id: ShortcutId) -> bool {
        self.shortcuts.get(&id).is_some_and(|s| s.enabled)
    }

    pub fn is_registered(&self, id: ShortcutId) -> bool {
        self.shortcuts.get(&id).is_some_and(|s| s.registered)
    }

    /// Last sequence requested for `id`, even if its grab failed
    pub fn shortcut(&self, id: ShortcutId) -> Option<KeySequence> {
        self.shortcuts.get(&id).and_then(|s| s.sequence)
    }

    pub fn native(&self, id: ShortcutId) -> Option<NativeShortcut> {
        self.shortcuts
            .get(&id)
            .filter(|s| s.registered)
            .map(|s| s.native)
    }

    /// Owner of a native pair
    pub fn lookup(&self, native: NativeShortcut) -> Option<ShortcutId> {
        self.registrations.get(&native).copied()
    }

    /// Feed one input event from the windowing layer
    pub fn handle_input(&mut self, event: &InputEvent) -> Option<ShortcutEvent> {
        let activated = match *event {
            InputEvent::KeyPress { keycode, state } => self.activate(NativeShortcut {
                keycode,
                modifiers: state & relevant_modifiers(),
            }),
            _ => None,
        };

        if self.release.observe(event, activated.is_some())
            && let Some(id) = self.last_activated
        {
            debug!(shortcut = %id, "Shortcut keys released");
            return Some(ShortcutEvent::Released(id));
        }

        activated.map(ShortcutEvent::Activated)
    }

    fn activate(&mut self, native: NativeShortcut) -> Option<ShortcutId> {
        debug!(
            keycode = native.keycode,
            modifiers = native.modifiers,
            "Key press on grabbed key"
        );
        let id = self.lookup(native)?;
        if !self.is_enabled(id) {
            debug!(shortcut = %id, "Shortcut disabled, ignoring");
            return None;
        }
        self.last_activated = Some(id);
        Some(id)
    }

    /// Release every grab; the registry stays usable afterwards
    pub fn teardown(&mut self) {
        let mut ids: Vec<ShortcutId> = self.registrations.values().copied().collect();
        ids.sort();
        for id in ids {
            self.unset(id);
        }
        if !self.registrations.is_empty() {
            warn!(
                remaining = self.registrations.len(),
                "Some global shortcuts could not be released"
            );
        }
    }
}

impl<B: KeyGrabber> Drop for ShortcutRegistry<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

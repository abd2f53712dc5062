//! Root window key grabs
//!
//! Every shortcut is grabbed four times, once per Caps Lock / Num Lock
//! state. Errors are collected per request: `BadAccess` (another client owns
//! the combination), `BadValue` (key code outside the server range) and
//! `BadWindow` on GrabKey/UngrabKey are expected conflicts, anything else is
//! logged as unexpected. Both make the whole operation fail, and a failed
//! grab ungrabs every variant again.

use anyhow::Result;
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::ErrorKind;
use x11rb::protocol::xproto::{ConnectionExt, GrabMode, ModMask, Window};
use x11rb::x11_utils::X11Error;

use super::context::X11Context;
use super::keymap::{Keymap, lock_mask_variants};
use crate::common::constants::x11;
use crate::shortcut::{Key, KeyGrabber, NativeShortcut};

/// Grabs keys on the root window of an X11 connection
pub struct X11Grabber<'a> {
    ctx: &'a X11Context,
    keymap: Keymap,
}

impl<'a> X11Grabber<'a> {
    pub fn new(ctx: &'a X11Context) -> Result<Self> {
        Ok(Self {
            ctx,
            keymap: Keymap::load(&ctx.conn)?,
        })
    }

    /// Re-read the keyboard mapping after a MappingNotify
    pub fn reload_keymap(&mut self) -> Result<()> {
        self.keymap = Keymap::load(&self.ctx.conn)?;
        Ok(())
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }
}

impl KeyGrabber for X11Grabber<'_> {
    fn keycode_for(&self, key: &Key) -> Option<u8> {
        self.keymap.keycode_for(key.keysym())
    }

    fn grab(&self, native: NativeShortcut) -> bool {
        let root = self.ctx.root();
        let grabbed = grab_variants(
            native,
            |modifiers| {
                self.ctx
                    .conn
                    .grab_key(
                        true,
                        root,
                        ModMask::from(modifiers),
                        native.keycode,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    )?
                    .check()
            },
            |modifiers| self.ungrab_request(root, native.keycode, modifiers),
        );

        if grabbed {
            debug!(
                keycode = native.keycode,
                modifiers = native.modifiers,
                "Grabbed key on root window"
            );
        }
        grabbed
    }

    fn ungrab(&self, native: NativeShortcut) -> bool {
        let root = self.ctx.root();
        let released = ungrab_variants(native, |modifiers| {
            self.ungrab_request(root, native.keycode, modifiers)
        });

        if let Err(e) = self.ctx.conn.flush() {
            debug!(error = %e, "Flush after ungrab failed");
        }
        released
    }
}

impl X11Grabber<'_> {
    fn ungrab_request(&self, root: Window, keycode: u8, modifiers: u16) -> Result<(), ReplyError> {
        self.ctx
            .conn
            .ungrab_key(keycode, root, ModMask::from(modifiers))?
            .check()
    }
}

/// Issue `grab` for every lock-mask variant of `native`, stopping at the first
/// error; on failure every variant is released again through `ungrab`
fn grab_variants<G, U>(native: NativeShortcut, mut grab: G, ungrab: U) -> bool
where
    G: FnMut(u16) -> Result<(), ReplyError>,
    U: FnMut(u16) -> Result<(), ReplyError>,
{
    let mut scope = ErrorScope::default();
    for lock_mask in lock_mask_variants() {
        scope.record(grab(native.modifiers | lock_mask), native, lock_mask);
        if scope.failed {
            break;
        }
    }

    if scope.failed {
        ungrab_variants(native, ungrab);
        return false;
    }
    true
}

/// Issue `ungrab` for every lock-mask variant; false if any of them failed
fn ungrab_variants<U>(native: NativeShortcut, mut ungrab: U) -> bool
where
    U: FnMut(u16) -> Result<(), ReplyError>,
{
    let mut scope = ErrorScope::default();
    for lock_mask in lock_mask_variants() {
        scope.record(ungrab(native.modifiers | lock_mask), native, lock_mask);
    }
    !scope.failed
}

/// Collects the outcome of a batch of grab or ungrab requests
#[derive(Debug, Default)]
struct ErrorScope {
    failed: bool,
}

impl ErrorScope {
    fn record(&mut self, result: Result<(), ReplyError>, native: NativeShortcut, lock_mask: u16) {
        match result {
            Ok(()) => {}
            Err(ReplyError::X11Error(err)) if is_grab_conflict(&err) => {
                debug!(
                    keycode = native.keycode,
                    modifiers = native.modifiers,
                    lock_mask = lock_mask,
                    error = ?err.error_kind,
                    "Key grab request rejected"
                );
                self.failed = true;
            }
            Err(err) => {
                warn!(
                    keycode = native.keycode,
                    modifiers = native.modifiers,
                    lock_mask = lock_mask,
                    error = %err,
                    "Unexpected error during key grab request"
                );
                self.failed = true;
            }
        }
    }
}

/// BadAccess, BadValue or BadWindow raised by GrabKey/UngrabKey
fn is_grab_conflict(err: &X11Error) -> bool {
    matches!(
        err.error_kind,
        ErrorKind::Access | ErrorKind::Value | ErrorKind::Window
    ) && matches!(
        err.major_opcode,
        x11::GRAB_KEY_REQUEST | x11::UNGRAB_KEY_REQUEST
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROL: u16 = 4;

    fn shortcut() -> NativeShortcut {
        NativeShortcut {
            keycode: 38,
            modifiers: CONTROL,
        }
    }

    fn x11_error(error_kind: ErrorKind, major_opcode: u8) -> ReplyError {
        ReplyError::X11Error(X11Error {
            error_kind,
            error_code: 0,
            sequence: 0,
            bad_value: 0,
            minor_opcode: 0,
            major_opcode,
            extension_name: None,
            request_name: None,
        })
    }

    #[test]
    fn test_grab_takes_all_lock_variants() {
        let mut grabbed = Vec::new();
        let mut released = Vec::new();
        let ok = grab_variants(
            shortcut(),
            |modifiers| {
                grabbed.push(modifiers);
                Ok(())
            },
            |modifiers| {
                released.push(modifiers);
                Ok(())
            },
        );

        assert!(ok);
        assert_eq!(grabbed, vec![4, 20, 6, 22]);
        assert!(released.is_empty());
    }

    #[test]
    fn test_conflict_on_third_variant_releases_every_variant() {
        let mut grabbed = Vec::new();
        let mut released = Vec::new();
        let ok = grab_variants(
            shortcut(),
            |modifiers| {
                grabbed.push(modifiers);
                if grabbed.len() == 3 {
                    Err(x11_error(ErrorKind::Access, x11::GRAB_KEY_REQUEST))
                } else {
                    Ok(())
                }
            },
            |modifiers| {
                released.push(modifiers);
                Ok(())
            },
        );

        assert!(!ok);
        assert_eq!(grabbed, vec![4, 20, 6]);
        assert_eq!(released, vec![4, 20, 6, 22]);
    }

    #[test]
    fn test_unexpected_error_also_fails_the_grab() {
        let mut released = 0;
        let ok = grab_variants(
            shortcut(),
            |_| Err(x11_error(ErrorKind::Match, x11::GRAB_KEY_REQUEST)),
            |_| {
                released += 1;
                Ok(())
            },
        );

        assert!(!ok);
        assert_eq!(released, 4);
    }

    #[test]
    fn test_ungrab_reports_any_failed_variant() {
        let mut attempts = Vec::new();
        let ok = ungrab_variants(shortcut(), |modifiers| {
            attempts.push(modifiers);
            if modifiers == 22 {
                Err(x11_error(ErrorKind::Value, x11::UNGRAB_KEY_REQUEST))
            } else {
                Ok(())
            }
        });

        assert!(!ok);
        assert_eq!(attempts, vec![4, 20, 6, 22]);
        assert!(ungrab_variants(shortcut(), |_| Ok(())));
    }

    #[test]
    fn test_grab_conflicts_are_limited_to_key_grab_requests() {
        let conflict = |kind, opcode| match x11_error(kind, opcode) {
            ReplyError::X11Error(err) => is_grab_conflict(&err),
            _ => false,
        };
        assert!(conflict(ErrorKind::Access, x11::GRAB_KEY_REQUEST));
        assert!(conflict(ErrorKind::Window, x11::UNGRAB_KEY_REQUEST));
        assert!(!conflict(ErrorKind::Access, 1));
        assert!(!conflict(ErrorKind::Match, x11::GRAB_KEY_REQUEST));
    }
}

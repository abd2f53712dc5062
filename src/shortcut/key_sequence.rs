//! Key sequence parsing and keysym translation
//!
//! A [`KeySequence`] is a single chord such as `Ctrl+Alt+V`. Text with
//! several comma separated chords (`"Ctrl+Alt+A, Ctrl+Alt+B"`) is accepted,
//! but only the first chord is kept: a global grab can only react to one
//! key combination.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

use crate::common::constants::keysym;

bitflags! {
    /// Toolkit-independent modifier set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
    }
}

impl Modifiers {
    /// Parse one modifier token of a key sequence, accepting common aliases
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "shift" => Some(Self::SHIFT),
            "ctrl" | "control" => Some(Self::CONTROL),
            "alt" => Some(Self::ALT),
            "meta" | "super" | "win" => Some(Self::META),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySequenceError {
    #[error("key sequence is empty")]
    Empty,
    #[error("key sequence '{0}' has no key")]
    MissingKey(String),
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// Non-character keys that can be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
    Tab,
    Backspace,
    Return,
    Enter,
    Insert,
    Delete,
    Pause,
    Print,
    Home,
    End,
    Left,
    Up,
    Right,
    Down,
    PageUp,
    PageDown,
    CapsLock,
    NumLock,
    ScrollLock,
    Menu,
    VolumeDown,
    VolumeMute,
    VolumeUp,
    MediaPlay,
    MediaStop,
    MediaPrevious,
    MediaNext,
}

/// Every named key with the lower-case aliases accepted besides its display name
const NAMED_KEYS: &[(NamedKey, &[&str])] = &[
    (NamedKey::Escape, &["escape"]),
    (NamedKey::Tab, &[]),
    (NamedKey::Backspace, &[]),
    (NamedKey::Return, &[]),
    (NamedKey::Enter, &[]),
    (NamedKey::Insert, &["insert"]),
    (NamedKey::Delete, &["delete"]),
    (NamedKey::Pause, &["break"]),
    (NamedKey::Print, &["printscreen", "sysreq"]),
    (NamedKey::Home, &[]),
    (NamedKey::End, &[]),
    (NamedKey::Left, &[]),
    (NamedKey::Up, &[]),
    (NamedKey::Right, &[]),
    (NamedKey::Down, &[]),
    (NamedKey::PageUp, &["pageup"]),
    (NamedKey::PageDown, &["pagedown"]),
    (NamedKey::CapsLock, &[]),
    (NamedKey::NumLock, &[]),
    (NamedKey::ScrollLock, &[]),
    (NamedKey::Menu, &[]),
    (NamedKey::VolumeDown, &["volumedown"]),
    (NamedKey::VolumeMute, &["volumemute", "mute"]),
    (NamedKey::VolumeUp, &["volumeup"]),
    (NamedKey::MediaPlay, &["mediaplay", "play"]),
    (NamedKey::MediaStop, &["mediastop"]),
    (NamedKey::MediaPrevious, &["mediaprevious"]),
    (NamedKey::MediaNext, &["medianext"]),
];

impl NamedKey {
    pub fn name(self) -> &'static str {
        match self {
            NamedKey::Escape => "Esc",
            NamedKey::Tab => "Tab",
            NamedKey::Backspace => "Backspace",
            NamedKey::Return => "Return",
            NamedKey::Enter => "Enter",
            NamedKey::Insert => "Ins",
            NamedKey::Delete => "Del",
            NamedKey::Pause => "Pause",
            NamedKey::Print => "Print",
            NamedKey::Home => "Home",
            NamedKey::End => "End",
            NamedKey::Left => "Left",
            NamedKey::Up => "Up",
            NamedKey::Right => "Right",
            NamedKey::Down => "Down",
            NamedKey::PageUp => "PgUp",
            NamedKey::PageDown => "PgDown",
            NamedKey::CapsLock => "CapsLock",
            NamedKey::NumLock => "NumLock",
            NamedKey::ScrollLock => "ScrollLock",
            NamedKey::Menu => "Menu",
            NamedKey::VolumeDown => "Volume Down",
            NamedKey::VolumeMute => "Volume Mute",
            NamedKey::VolumeUp => "Volume Up",
            NamedKey::MediaPlay => "Media Play",
            NamedKey::MediaStop => "Media Stop",
            NamedKey::MediaPrevious => "Media Previous",
            NamedKey::MediaNext => "Media Next",
        }
    }

    /// X11 keysym, from X11/keysymdef.h and XF86keysym.h
    pub fn keysym(self) -> u32 {
        match self {
            NamedKey::Escape => 0xFF1B,
            NamedKey::Tab => 0xFF09,
            NamedKey::Backspace => 0xFF08,
            NamedKey::Return => 0xFF0D,
            NamedKey::Enter => 0xFF8D,
            NamedKey::Insert => keysym::INSERT,
            NamedKey::Delete => 0xFFFF,
            NamedKey::Pause => 0xFF13,
            NamedKey::Print => 0xFF61,
            NamedKey::Home => 0xFF50,
            NamedKey::End => 0xFF57,
            NamedKey::Left => 0xFF51,
            NamedKey::Up => 0xFF52,
            NamedKey::Right => 0xFF53,
            NamedKey::Down => 0xFF54,
            NamedKey::PageUp => 0xFF55,
            NamedKey::PageDown => 0xFF56,
            NamedKey::CapsLock => 0xFFE5,
            NamedKey::NumLock => 0xFF7F,
            NamedKey::ScrollLock => 0xFF14,
            NamedKey::Menu => 0xFF67,
            NamedKey::VolumeDown => 0x1008_FF11,
            NamedKey::VolumeMute => 0x1008_FF12,
            NamedKey::VolumeUp => 0x1008_FF13,
            NamedKey::MediaPlay => 0x1008_FF14,
            NamedKey::MediaStop => 0x1008_FF15,
            NamedKey::MediaPrevious => 0x1008_FF16,
            NamedKey::MediaNext => 0x1008_FF17,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        let compact: String = lowered.chars().filter(|c| !c.is_whitespace()).collect();
        NAMED_KEYS
            .iter()
            .find(|(key, aliases)| {
                key.name().to_ascii_lowercase() == lowered
                    || aliases.iter().any(|alias| *alias == compact)
            })
            .map(|(key, _)| *key)
    }
}

/// The non-modifier part of a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key, always stored lower-case
    Char(char),
    /// F1 to F35
    Function(u8),
    Named(NamedKey),
}

impl Key {
    /// Translate to an X11 keysym
    pub fn keysym(&self) -> u32 {
        match *self {
            Key::Char(c) => {
                let code = c as u32;
                if (0x20..=0x7E).contains(&code) || (0xA0..=keysym::LATIN1_MAX).contains(&code) {
                    code
                } else {
                    keysym::UNICODE_OFFSET | code
                }
            }
            Key::Function(n) => keysym::F1 + u32::from(n) - 1,
            Key::Named(named) => named.keysym(),
        }
    }

    fn parse(token: &str) -> Result<Self, KeySequenceError> {
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Char(to_lower(c)));
        }

        if token.eq_ignore_ascii_case("space") {
            return Ok(Key::Char(' '));
        }

        if let Some(number) = token.strip_prefix(['F', 'f'])
            && let Ok(n) = number.parse::<u8>()
            && (1..=keysym::MAX_FUNCTION_KEY).contains(&n)
        {
            return Ok(Key::Function(n));
        }

        NamedKey::from_name(token)
            .map(Key::Named)
            .ok_or_else(|| KeySequenceError::UnknownKey(token.to_string()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(' ') => f.write_str("Space"),
            Key::Char(c) => {
                for upper in c.to_uppercase() {
                    write!(f, "{upper}")?;
                }
                Ok(())
            }
            Key::Function(n) => write!(f, "F{n}"),
            Key::Named(named) => f.write_str(named.name()),
        }
    }
}

/// Single-character keys compare lower-case; some keyboard layouts break when
/// shortcuts are registered with the upper-case keysym
fn to_lower(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// One key plus the modifiers that must be held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySequence {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeySequence {
    /// Parse the first chord of `text`
    pub fn parse(text: &str) -> Result<Self, KeySequenceError> {
        let chord = first_chord(text).trim();
        if chord.is_empty() {
            return Err(KeySequenceError::Empty);
        }

        let mut tokens = split_chord(chord);
        let key_token = tokens.pop().unwrap_or_default();
        if key_token.is_empty() {
            return Err(KeySequenceError::MissingKey(chord.to_string()));
        }

        let mut modifiers = Modifiers::empty();
        for token in tokens {
            modifiers |= Modifiers::from_token(token)
                .ok_or_else(|| KeySequenceError::UnknownModifier(token.to_string()))?;
        }

        Ok(Self {
            key: Key::parse(key_token)?,
            modifiers,
        })
    }
}

impl FromStr for KeySequence {
    type Err = KeySequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ORDER: [(Modifiers, &str); 4] = [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::META, "Meta"),
        ];
        for (flag, name) in ORDER {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// Cut `text` at the first comma that separates chords. A comma right after
/// `+` (or at the very start) is the `,` key itself.
fn first_chord(text: &str) -> &str {
    let mut prev: Option<char> = None;
    for (i, c) in text.char_indices() {
        if c == ',' && prev.is_some_and(|p| p != '+') {
            return &text[..i];
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
    }
    text
}

/// Split on `+`, treating a `+` that directly follows a separator (blanks
/// in between allowed) as the key
fn split_chord(chord: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (i, c) in chord.char_indices() {
        if c == '+' && !chord[start..i].trim().is_empty() {
            tokens.push(chord[start..i].trim());
            start = i + 1;
        }
    }
    tokens.push(chord[start..].trim());
    tokens
}

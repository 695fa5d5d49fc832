//! Keyboard modifiers and key bindings
//!
//! Bindings map a `(modifiers, keysym)` pair to a command line that is
//! dispatched like an IPC command when the combination is pressed. Key names
//! are stored lowercased; an uppercase single-letter key implies SHIFT, so
//! `super+Q` and `super+shift+q` are the same binding.

use bitflags::bitflags;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

bitflags! {
    /// Keyboard modifier mask, laid out like the xkb modifier indices
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const SHIFT = 1 << 0;
        const CAPS  = 1 << 1;
        const CTRL  = 1 << 2;
        const ALT   = 1 << 3;
        const MOD2  = 1 << 4;
        const MOD3  = 1 << 5;
        const LOGO  = 1 << 6;
        const MOD5  = 1 << 7;
    }
}

/// Number of bits a modifier mask may occupy
pub const MODIFIER_BITS: u32 = 12;

impl Modifiers {
    /// Modifiers that take part in binding lookups. Lock keys never do.
    pub fn significant(self) -> Self {
        self - (Self::CAPS | Self::MOD2)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = MODIFIER_NAMES
            .iter()
            .filter(|(_, m)| self.contains(*m))
            .map(|(name, _)| *name)
            .collect();
        write!(f, "{}", names.join("+"))
    }
}

const MODIFIER_NAMES: &[(&str, Modifiers)] = &[
    ("shift", Modifiers::SHIFT),
    ("caps", Modifiers::CAPS),
    ("ctrl", Modifiers::CTRL),
    ("alt", Modifiers::ALT),
    ("mod2", Modifiers::MOD2),
    ("mod3", Modifiers::MOD3),
    ("super", Modifiers::LOGO),
    ("mod5", Modifiers::MOD5),
];

/// Pointer buttons, using the Linux input event codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u32),
}

impl From<u32> for MouseButton {
    fn from(code: u32) -> Self {
        match code {
            0x110 => MouseButton::Left,
            0x111 => MouseButton::Right,
            0x112 => MouseButton::Middle,
            other => MouseButton::Other(other),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyComboError {
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("key combination '{0}' has no key")]
    MissingKey(String),
}

fn parse_modifier(name: &str) -> Result<Modifiers, KeyComboError> {
    let lower = name.to_ascii_lowercase();
    let modifier = match lower.as_str() {
        "shift" => Modifiers::SHIFT,
        "caps" | "lock" => Modifiers::CAPS,
        "ctrl" | "control" => Modifiers::CTRL,
        "alt" | "mod1" => Modifiers::ALT,
        "mod2" => Modifiers::MOD2,
        "mod3" => Modifiers::MOD3,
        "super" | "logo" | "mod4" => Modifiers::LOGO,
        "mod5" => Modifiers::MOD5,
        _ => return Err(KeyComboError::UnknownModifier(name.to_string())),
    };
    Ok(modifier)
}

/// Parses a `+`-separated modifier list such as `super+shift`.
pub fn parse_modifiers(text: &str) -> Result<Modifiers, KeyComboError> {
    text.split('+')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .try_fold(Modifiers::empty(), |acc, part| Ok(acc | parse_modifier(part)?))
}

/// A modifier mask plus a normalized key symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub key: String,
}

impl KeyCombo {
    /// Builds a combo, lowercasing the key. An uppercase single letter adds SHIFT.
    pub fn new(modifiers: Modifiers, key: &str) -> Self {
        let mut modifiers = modifiers.significant();
        let mut chars = key.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_uppercase() {
                modifiers |= Modifiers::SHIFT;
            }
        }

        debug_assert!(modifiers.bits() < 1 << MODIFIER_BITS);
        Self {
            modifiers,
            key: key.to_lowercase(),
        }
    }

    /// Parses `mod+mod+key`; the last component is the key.
    pub fn parse(text: &str) -> Result<Self, KeyComboError> {
        let mut parts: Vec<&str> = text.split('+').map(str::trim).collect();
        let key = parts
            .pop()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| KeyComboError::MissingKey(text.to_string()))?;

        let modifiers = parts
            .into_iter()
            .try_fold(Modifiers::empty(), |acc, part| Ok(acc | parse_modifier(part)?))?;

        Ok(Self::new(modifiers, key))
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

/// Command line bound to a key combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundCommand {
    pub name: String,
    pub args: Vec<String>,
}

impl BoundCommand {
    /// Splits an argument vector into name and arguments. `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (name, args) = argv.split_first()?;
        Some(Self {
            name: name.clone(),
            args: args.to_vec(),
        })
    }

    /// The full argument vector, command name first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.name.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Key binding table
#[derive(Debug, Default, Clone)]
pub struct KeybindingsConfig {
    bindings: HashMap<KeyCombo, BoundCommand>,
}

impl KeybindingsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `combo`, replacing any earlier binding of the same combination.
    pub fn bind(&mut self, combo: KeyCombo, command: BoundCommand) -> Option<BoundCommand> {
        debug!("🔑 Bound {} to '{}'", combo, command.argv().join(" "));
        self.bindings.insert(combo, command)
    }

    /// Looks up the binding for a key press.
    pub fn lookup(&self, modifiers: Modifiers, keysym: &str) -> Option<&BoundCommand> {
        self.bindings.get(&KeyCombo::new(modifiers, keysym))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

//! Keystroke and modifier model.
//!
//! Used in two directions: classifying keystrokes arriving from the host
//! page (submit detection, popup navigation) and describing the synthetic
//! keystrokes the injector dispatches back onto it.

use std::fmt;

/// Modifier keys as a bitfield for efficient storage and comparison
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CTRL: Modifiers = Modifiers(0b0001);
    pub const SHIFT: Modifiers = Modifiers(0b0010);
    pub const ALT: Modifiers = Modifiers(0b0100);
    pub const META: Modifiers = Modifiers(0b1000);

    /// Create modifiers from individual flags
    pub const fn new(ctrl: bool, shift: bool, alt: bool, meta: bool) -> Self {
        let mut bits = 0u8;
        if ctrl {
            bits |= 0b0001;
        }
        if shift {
            bits |= 0b0010;
        }
        if alt {
            bits |= 0b0100;
        }
        if meta {
            bits |= 0b1000;
        }
        Modifiers(bits)
    }

    #[inline]
    pub const fn ctrl(self) -> bool {
        self.0 & 0b0001 != 0
    }

    #[inline]
    pub const fn shift(self) -> bool {
        self.0 & 0b0010 != 0
    }

    #[inline]
    pub const fn alt(self) -> bool {
        self.0 & 0b0100 != 0
    }

    #[inline]
    pub const fn meta(self) -> bool {
        self.0 & 0b1000 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Combine two modifier sets
    #[inline]
    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }
}

/// Keys the integration layer cares about. Everything else arrives as
/// `Char` and is only relevant as "some edit happened".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Tab,
    Escape,
    Backspace,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Char(char),
}

/// A key plus its held modifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Keystroke {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl Keystroke {
    /// A keystroke with no modifiers held
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub const fn with(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }
}

impl fmt::Display for Keystroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl() {
            write!(f, "ctrl+")?;
        }
        if self.modifiers.alt() {
            write!(f, "alt+")?;
        }
        if self.modifiers.shift() {
            write!(f, "shift+")?;
        }
        if self.modifiers.meta() {
            write!(f, "meta+")?;
        }
        match self.key {
            Key::Enter => write!(f, "enter"),
            Key::Tab => write!(f, "tab"),
            Key::Escape => write!(f, "escape"),
            Key::Backspace => write!(f, "backspace"),
            Key::ArrowUp => write!(f, "up"),
            Key::ArrowDown => write!(f, "down"),
            Key::ArrowLeft => write!(f, "left"),
            Key::ArrowRight => write!(f, "right"),
            Key::Char(c) => write!(f, "{}", c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_flags() {
        let mods = Modifiers::new(true, false, false, true);
        assert!(mods.ctrl());
        assert!(!mods.shift());
        assert!(!mods.alt());
        assert!(mods.meta());
        assert!(!mods.is_empty());
        assert!(Modifiers::NONE.is_empty());
    }

    #[test]
    fn test_union() {
        let mods = Modifiers::CTRL.union(Modifiers::SHIFT);
        assert!(mods.ctrl());
        assert!(mods.shift());
    }

    #[test]
    fn test_display() {
        let ks = Keystroke::with(Key::Enter, Modifiers::CTRL);
        assert_eq!(ks.to_string(), "ctrl+enter");
        assert_eq!(Keystroke::plain(Key::Char('a')).to_string(), "a");
    }
}

//! MIDI standard detection from device-reset SysEx messages.

use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

pub const GM_RESET: &[u8] = &[0xF0, 0x7E, 0x7F, 0x09, 0x01, 0xF7];
pub const GM2_ON: &[u8] = &[0xF0, 0x7E, 0x7F, 0x09, 0x03, 0xF7];
pub const GS_RESET: &[u8] = &[0xF0, 0x41, 0x10, 0x16, 0x12, 0x40, 0x00, 0x7F, 0x00, 0x41, 0xF7];
pub const XG_SYSTEM_ON: &[u8] = &[0xF0, 0x43, 0x10, 0x4C, 0x00, 0x00, 0x7E, 0x00, 0xF7];

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standard {
    Gm,
    Gm2,
    Gs,
    Xg,
}

impl Standard {
    pub const ALL: [Standard; 4] = [Standard::Gm, Standard::Gm2, Standard::Gs, Standard::Xg];

    /// Match an exact reset/system-on message.
    pub fn from_sysex(payload: &[u8]) -> Option<Self> {
        match payload {
            GM_RESET => Some(Standard::Gm),
            GM2_ON => Some(Standard::Gm2),
            GS_RESET => Some(Standard::Gs),
            XG_SYSTEM_ON => Some(Standard::Xg),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Standard::Gm => 1 << 0,
            Standard::Gm2 => 1 << 1,
            Standard::Gs => 1 << 2,
            Standard::Xg => 1 << 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Standard::Gm => "GM",
            Standard::Gm2 => "GM2",
            Standard::Gs => "GS",
            Standard::Xg => "XG",
        }
    }
}

/// Standards detected so far. Only ever grows until [`clear`](Self::clear)
/// is called for a new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardSet {
    bits: u8,
}

impl Default for StandardSet {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardSet {
    /// Plain General MIDI until something else shows up.
    pub fn new() -> Self {
        Self {
            bits: Standard::Gm.bit(),
        }
    }

    pub fn insert(&mut self, standard: Standard) -> bool {
        let added = !self.contains(standard);
        self.bits |= standard.bit();
        added
    }

    pub fn contains(&self, standard: Standard) -> bool {
        self.bits & standard.bit() != 0
    }

    /// Feed one SysEx payload. Returns the standard if it was newly added.
    pub fn detect(&mut self, payload: &[u8]) -> Option<Standard> {
        let standard = Standard::from_sysex(payload)?;
        self.insert(standard).then_some(standard)
    }

    pub fn iter(&self) -> impl Iterator<Item = Standard> + '_ {
        Standard::ALL.into_iter().filter(|s| self.contains(*s))
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl fmt::Display for StandardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, standard) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            f.write_str(standard.name())?;
        }
        Ok(())
    }
}

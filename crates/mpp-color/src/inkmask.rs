//! Colorant masks.
//!
//! An [`InkMask`] records which colorants a device has, one bit per ink,
//! plus whether the device is additive (a display) or subtractive (a
//! printer). Channel indices follow bit order, so "CMYK" always maps
//! C=0, M=1, Y=2, K=3 regardless of how the string was written.
//!
//! # Example
//!
//! ```rust
//! use mpp_color::{Ink, InkMask};
//!
//! let mask = InkMask::from_chars("KCMY").unwrap();
//! assert_eq!(mask.to_chars(), "CMYK");
//! assert_eq!(mask.index_of(Ink::Black), Some(3));
//! assert_eq!(mask.ink_at(0), Some(Ink::Cyan));
//!
//! let display = InkMask::from_chars("RGB").unwrap();
//! assert!(display.is_additive());
//! ```

use crate::{ColorError, ColorResult};
use std::fmt;
use std::str::FromStr;

/// A single colorant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ink {
    /// Cyan
    Cyan,
    /// Magenta
    Magenta,
    /// Yellow
    Yellow,
    /// Black
    Black,
    /// Orange
    Orange,
    /// Red
    Red,
    /// Green
    Green,
    /// Blue
    Blue,
    /// White (or the single channel of a grey display)
    White,
    /// Light cyan
    LightCyan,
    /// Light magenta
    LightMagenta,
    /// Light yellow
    LightYellow,
    /// Light black (grey ink)
    LightBlack,
}

impl Ink {
    /// All inks in bit order.
    pub const ALL: [Ink; 13] = [
        Ink::Cyan,
        Ink::Magenta,
        Ink::Yellow,
        Ink::Black,
        Ink::Orange,
        Ink::Red,
        Ink::Green,
        Ink::Blue,
        Ink::White,
        Ink::LightCyan,
        Ink::LightMagenta,
        Ink::LightYellow,
        Ink::LightBlack,
    ];

    /// Bit of this ink within a mask.
    #[inline]
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Single character code.
    pub fn letter(self) -> char {
        match self {
            Ink::Cyan => 'C',
            Ink::Magenta => 'M',
            Ink::Yellow => 'Y',
            Ink::Black => 'K',
            Ink::Orange => 'O',
            Ink::Red => 'R',
            Ink::Green => 'G',
            Ink::Blue => 'B',
            Ink::White => 'W',
            Ink::LightCyan => 'c',
            Ink::LightMagenta => 'm',
            Ink::LightYellow => 'y',
            Ink::LightBlack => 'k',
        }
    }

    /// Ink for a character code.
    pub fn from_letter(c: char) -> Option<Ink> {
        Ink::ALL.into_iter().find(|ink| ink.letter() == c)
    }
}

/// Set of colorants plus additive/subtractive flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InkMask(u32);

impl InkMask {
    const ADDITIVE: u32 = 0x8000_0000;
    const INKS: u32 = (1 << Ink::ALL.len()) - 1;

    /// Subtractive CMYK printer.
    pub const CMYK: InkMask = InkMask(0b1111);
    /// Subtractive CMY printer.
    pub const CMY: InkMask = InkMask(0b0111);
    /// Additive RGB display.
    pub const RGB: InkMask = InkMask(Self::ADDITIVE | (1 << 5) | (1 << 6) | (1 << 7));

    /// Builds a mask from raw bits.
    ///
    /// Returns `None` if unknown bits are set or no ink is present.
    pub fn from_bits(bits: u32) -> Option<InkMask> {
        let inks = bits & !Self::ADDITIVE;
        if inks == 0 || inks & !Self::INKS != 0 {
            return None;
        }
        Some(InkMask(bits))
    }

    /// Raw bits, including the additive flag.
    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Parses a colorant string such as `"CMYK"` or `"RGB"`.
    ///
    /// Strings made only of `R`, `G`, `B` and `W` describe additive
    /// devices; anything else is a subtractive ink set.
    pub fn from_chars(s: &str) -> ColorResult<InkMask> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ColorError::InvalidInkString("empty".into()));
        }
        let mut bits = 0u32;
        for c in s.chars() {
            let ink = Ink::from_letter(c).ok_or(ColorError::UnknownInk(c))?;
            if bits & ink.bit() != 0 {
                return Err(ColorError::InvalidInkString(format!("'{c}' repeated in {s}")));
            }
            bits |= ink.bit();
        }
        let additive_only = Ink::Red.bit() | Ink::Green.bit() | Ink::Blue.bit() | Ink::White.bit();
        if bits & !additive_only == 0 {
            bits |= Self::ADDITIVE;
        }
        Ok(InkMask(bits))
    }

    /// Colorant string in channel order.
    pub fn to_chars(self) -> String {
        self.inks().map(Ink::letter).collect()
    }

    /// Number of channels.
    #[inline]
    pub fn count(self) -> usize {
        (self.0 & Self::INKS).count_ones() as usize
    }

    /// True for additive (display) devices.
    #[inline]
    pub fn is_additive(self) -> bool {
        self.0 & Self::ADDITIVE != 0
    }

    /// True if the mask contains `ink`.
    #[inline]
    pub fn has(self, ink: Ink) -> bool {
        self.0 & ink.bit() != 0
    }

    /// Channel index of `ink`, if present.
    pub fn index_of(self, ink: Ink) -> Option<usize> {
        if !self.has(ink) {
            return None;
        }
        Some((self.0 & (ink.bit() - 1) & Self::INKS).count_ones() as usize)
    }

    /// Ink at channel index `i`.
    pub fn ink_at(self, i: usize) -> Option<Ink> {
        self.inks().nth(i)
    }

    /// Inks in channel order.
    pub fn inks(self) -> impl Iterator<Item = Ink> {
        Ink::ALL.into_iter().filter(move |ink| self.has(*ink))
    }
}

impl fmt::Display for InkMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_chars())
    }
}

impl FromStr for InkMask {
    type Err = ColorError;

    fn from_str(s: &str) -> ColorResult<Self> {
        InkMask::from_chars(s)
    }
}

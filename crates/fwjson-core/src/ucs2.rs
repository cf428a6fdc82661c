//! UTF-8 ⇄ UCS2 conversion for firmware string conventions.
//!
//! UCS2 here is UTF-16 restricted to the Basic Multilingual Plane: every
//! character is exactly one 16-bit unit and surrogate units never appear.
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ucs2Error {
    #[error("character {ch:?} at byte offset {offset} is outside the UCS2 range")]
    NotRepresentable { offset: usize, ch: char },
    #[error("surrogate code unit {unit:#06x} at index {index}")]
    Surrogate { index: usize, unit: u16 },
    #[error("embedded NUL at byte offset {offset} would truncate the UCS2 string")]
    EmbeddedNul { offset: usize },
}

/// Owned UCS2 buffer. Always stored with a trailing NUL.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ucs2String {
    units: Vec<u16>,
}

impl Ucs2String {
    /// Code units without the terminator.
    pub fn as_slice(&self) -> &[u16] {
        &self.units[..self.units.len() - 1]
    }

    pub fn as_slice_with_nul(&self) -> &[u16] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec_with_nul(self) -> Vec<u16> {
        self.units
    }

    pub fn to_utf8(&self) -> Result<String, Ucs2Error> {
        ucs2_to_utf8(self.as_slice())
    }
}

impl fmt::Debug for Ucs2String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_utf8() {
            Ok(s) => write!(f, "u{:?}", s),
            Err(_) => f.debug_list().entries(self.as_slice()).finish(),
        }
    }
}

impl TryFrom<&str> for Ucs2String {
    type Error = Ucs2Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        utf8_to_ucs2(s)
    }
}

/// Converts UTF-8 to a NUL-terminated UCS2 buffer. Text containing U+0000
/// is refused, since the terminator would cut it short.
pub fn utf8_to_ucs2(s: &str) -> Result<Ucs2String, Ucs2Error> {
    let mut units = Vec::with_capacity(s.len() + 1);
    for (offset, ch) in s.char_indices() {
        let cp = ch as u32;
        if cp == 0 {
            tracing::debug!(offset, "utf8 -> ucs2: embedded NUL");
            return Err(Ucs2Error::EmbeddedNul { offset });
        }
        if cp > 0xFFFF {
            tracing::debug!(offset, "utf8 -> ucs2: character outside BMP");
            return Err(Ucs2Error::NotRepresentable { offset, ch });
        }
        units.push(cp as u16);
    }
    units.push(0);
    Ok(Ucs2String { units })
}

/// Converts UCS2 to UTF-8. Stops at the first NUL unit if there is one.
pub fn ucs2_to_utf8(units: &[u16]) -> Result<String, Ucs2Error> {
    let mut out = String::with_capacity(units.len());
    for (index, &unit) in units.iter().enumerate() {
        if unit == 0 {
            break;
        }
        match char::from_u32(unit as u32) {
            Some(ch) => out.push(ch),
            None => {
                tracing::debug!(index, unit, "ucs2 -> utf8: surrogate unit");
                return Err(Ucs2Error::Surrogate { index, unit });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmp_text_converts_both_ways() {
        let u = utf8_to_ucs2("Grüße ☃").unwrap();
        assert_eq!(u.len(), 7);
        assert_eq!(*u.as_slice_with_nul().last().unwrap(), 0);
        assert_eq!(u.to_utf8().unwrap(), "Grüße ☃");
    }

    #[test]
    fn astral_plane_is_rejected() {
        let err = utf8_to_ucs2("ok😀").unwrap_err();
        assert_eq!(err, Ucs2Error::NotRepresentable { offset: 2, ch: '😀' });
    }

    #[test]
    fn surrogates_are_rejected() {
        let err = ucs2_to_utf8(&[0x41, 0xD83D, 0xDE00]).unwrap_err();
        assert_eq!(err, Ucs2Error::Surrogate { index: 1, unit: 0xD83D });
    }

    #[test]
    fn embedded_nul_is_rejected() {
        assert_eq!(utf8_to_ucs2("a\0b").unwrap_err(), Ucs2Error::EmbeddedNul { offset: 1 });
        assert_eq!(utf8_to_ucs2("\0").unwrap_err(), Ucs2Error::EmbeddedNul { offset: 0 });
    }

    #[test]
    fn stops_at_nul() {
        assert_eq!(ucs2_to_utf8(&[0x68, 0x69, 0, 0x7A]).unwrap(), "hi");
        assert!(utf8_to_ucs2("").unwrap().is_empty());
    }
}

//! Textual CPU-set specifications for exit-event registration.

use std::fmt;
use std::str::FromStr;

/// Masks are short CPU lists like `"0"` or `"1-4"`, never free text.
const MAX_LEN: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CpuMaskError {
    #[error("cpumask must not be empty")]
    Empty,
    #[error("cpumask of {0} bytes exceeds the 64-byte limit")]
    TooLong(usize),
    #[error("cpumask `{mask}` contains invalid character `{ch}`")]
    InvalidCharacter { mask: String, ch: char },
}

/// A CPU-set specification such as `"0"`, `"1-4"`, or `"0,2-3"`.
///
/// Scopes which CPUs' task-exit events a registration receives. Owned
/// by the exit stream for the lifetime of its registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuMask(String);

impl CpuMask {
    /// Validates and wraps a mask string.
    ///
    /// # Errors
    ///
    /// Returns [`CpuMaskError`] if the string is empty, too long, or
    /// contains anything but digits, commas, and dashes.
    pub fn new(mask: &str) -> Result<Self, CpuMaskError> {
        if mask.is_empty() {
            return Err(CpuMaskError::Empty);
        }
        if mask.len() > MAX_LEN {
            return Err(CpuMaskError::TooLong(mask.len()));
        }
        if let Some(ch) = mask
            .chars()
            .find(|c| !c.is_ascii_digit() && *c != ',' && *c != '-')
        {
            return Err(CpuMaskError::InvalidCharacter {
                mask: mask.to_owned(),
                ch,
            });
        }
        Ok(Self(mask.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CpuMask {
    type Err = CpuMaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_typical_masks() {
        for mask in ["0", "1-4", "0,2-3", "31"] {
            assert_eq!(CpuMask::new(mask).unwrap().as_str(), mask);
        }
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(CpuMask::new("").unwrap_err(), CpuMaskError::Empty);
    }

    #[test]
    fn test_rejects_invalid_characters() {
        let err = CpuMask::new("0; rm -rf").unwrap_err();
        assert!(matches!(err, CpuMaskError::InvalidCharacter { ch: ';', .. }));
    }

    #[test]
    fn test_rejects_overlong_mask() {
        let mask = "0,".repeat(40);
        assert_eq!(
            CpuMask::new(&mask).unwrap_err(),
            CpuMaskError::TooLong(mask.len())
        );
    }

    #[test]
    fn test_from_str_round_trip() {
        let mask: CpuMask = "1-4".parse().unwrap();
        assert_eq!(mask.to_string(), "1-4");
    }
}

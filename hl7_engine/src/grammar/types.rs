//! Scalar attributes of entities and constituents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

// ============================================================================
// LENGTH
// ============================================================================

/// Maximum encoded length of a value
///
/// `Finite` orders below `Unbounded`, so `max` and comparisons behave the way
/// the length checks need them to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Length {
    Finite(u64),
    Unbounded,
}

impl Length {
    pub fn finite(&self) -> Option<u64> {
        match self {
            Self::Finite(n) => Some(*n),
            Self::Unbounded => None,
        }
    }

    /// Length of `repeatability` back-to-back repetitions of this value
    pub fn repeated(self, repeatability: Repeatability) -> Length {
        match (self, repeatability) {
            (Self::Finite(n), Repeatability::Limited(k)) => {
                Self::Finite(n.saturating_mul(u64::from(k)))
            }
            _ => Self::Unbounded,
        }
    }

    /// True when a value of `len` characters fits
    pub fn admits(&self, len: usize) -> bool {
        match self {
            Self::Finite(n) => (len as u64) <= *n,
            Self::Unbounded => true,
        }
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, other: Length) -> Length {
        match (self, other) {
            (Self::Finite(a), Self::Finite(b)) => Self::Finite(a.saturating_add(b)),
            _ => Self::Unbounded,
        }
    }
}

impl std::iter::Sum for Length {
    fn sum<I: Iterator<Item = Length>>(iter: I) -> Length {
        iter.fold(Length::Finite(0), |acc, len| acc + len)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{}", n),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

// ============================================================================
// REPEATABILITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Repeatability {
    Limited(u32),
    Unbounded,
}

impl Repeatability {
    pub const ONCE: Repeatability = Repeatability::Limited(1);

    /// Maximum number of repetitions, `None` when unbounded
    pub fn max(&self) -> Option<usize> {
        match self {
            Self::Limited(k) => Some(*k as usize),
            Self::Unbounded => None,
        }
    }

    pub fn allows(&self, count: usize) -> bool {
        self.max().map_or(true, |max| count <= max)
    }
}

impl Default for Repeatability {
    fn default() -> Self {
        Self::ONCE
    }
}

impl fmt::Display for Repeatability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(k) => write!(f, "{}", k),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

// ============================================================================
// OPTIONALITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Optionality {
    Required,
    Optional,
    Conditional,
    BackwardCompatible,
    Withdrawn,
}

impl Optionality {
    pub const CODES: &'static str = "R, O, C, B, or W";

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "R" => Some(Self::Required),
            "O" => Some(Self::Optional),
            "C" => Some(Self::Conditional),
            "B" => Some(Self::BackwardCompatible),
            "W" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Required => "R",
            Self::Optional => "O",
            Self::Conditional => "C",
            Self::BackwardCompatible => "B",
            Self::Withdrawn => "W",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }

    pub fn is_withdrawn(&self) -> bool {
        matches!(self, Self::Withdrawn)
    }
}

impl fmt::Display for Optionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_arithmetic() {
        assert_eq!(Length::Finite(3) + Length::Finite(4), Length::Finite(7));
        assert_eq!(Length::Finite(3) + Length::Unbounded, Length::Unbounded);
        assert_eq!(
            vec![Length::Finite(1), Length::Finite(2)].into_iter().sum::<Length>(),
            Length::Finite(3)
        );
        assert_eq!(Vec::<Length>::new().into_iter().sum::<Length>(), Length::Finite(0));
    }

    #[test]
    fn test_length_ordering() {
        assert!(Length::Finite(u64::MAX) < Length::Unbounded);
        assert!(Length::Finite(2) < Length::Finite(3));
        assert!(Length::Finite(5).admits(5));
        assert!(!Length::Finite(5).admits(6));
        assert!(Length::Unbounded.admits(usize::MAX));
    }

    #[test]
    fn test_repeated_length() {
        assert_eq!(
            Length::Finite(20).repeated(Repeatability::Limited(3)),
            Length::Finite(60)
        );
        assert_eq!(
            Length::Finite(20).repeated(Repeatability::Unbounded),
            Length::Unbounded
        );
    }

    #[test]
    fn test_repeatability() {
        assert_eq!(Repeatability::default(), Repeatability::ONCE);
        assert!(Repeatability::Limited(2).allows(2));
        assert!(!Repeatability::Limited(2).allows(3));
        assert!(Repeatability::Unbounded.allows(1000));
    }

    #[test]
    fn test_optionality_codes() {
        for code in ["R", "O", "C", "B", "W"] {
            assert_eq!(Optionality::from_code(code).map(|o| o.code()), Some(code));
        }
        assert_eq!(Optionality::from_code("X"), None);
        assert!(Optionality::Required.is_required());
        assert!(Optionality::Withdrawn.is_withdrawn());
    }
}

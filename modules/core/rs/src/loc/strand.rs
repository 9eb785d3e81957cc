use std::fmt::Display;

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use eyre::Report;

use crate::error::ModelError;

/// Strand of a read or a probe.
///
/// The declaration order defines the ordering used when sorting reads: forward < reverse < unknown.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Strand {
    /// The forward strand, also known as the positive strand or Watson strand.
    Forward,
    /// The reverse strand, also known as the negative strand or Crick strand.
    Reverse,
    /// The strand wasn't recorded or doesn't apply (e.g. unstranded libraries).
    Unknown,
}

impl Strand {
    /// Flip the strand from forward to reverse or vice versa. Unknown strand remains the same.
    pub fn flip(&mut self) -> &mut Self {
        *self = self.flipped();
        self
    }

    /// New strand that is the opposite of the current one. Unknown strand remains the same.
    pub fn flipped(&self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
            Self::Unknown => Self::Unknown,
        }
    }

    /// Whether the strand is either forward or reverse.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get the symbolic representation of the strand.
    pub fn symbol(&self) -> char {
        match self {
            Self::Forward => '+',
            Self::Reverse => '-',
            Self::Unknown => '.',
        }
    }

    /// Integer tag of the strand: 1 for forward, -1 for reverse and 0 for unknown.
    pub fn tag(&self) -> i8 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
            Self::Unknown => 0,
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<char> for Strand {
    type Error = Report;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            '+' => Ok(Self::Forward),
            '-' => Ok(Self::Reverse),
            '.' => Ok(Self::Unknown),
            _ => Err(ModelError::invalid_argument(format!(
                "Unrecognized strand symbol: {value:?}"
            ))
            .into()),
        }
    }
}

impl TryFrom<&str> for Strand {
    type Error = Report;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Self::Forward),
            "-" => Ok(Self::Reverse),
            "." => Ok(Self::Unknown),
            _ => Err(ModelError::invalid_argument(format!(
                "Unrecognized strand symbol: {value:?}"
            ))
            .into()),
        }
    }
}

impl TryFrom<i8> for Strand {
    type Error = Report;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Forward),
            -1 => Ok(Self::Reverse),
            0 => Ok(Self::Unknown),
            _ => Err(ModelError::invalid_argument(format!(
                "Strand tag must be 1, -1 or 0, got {value}"
            ))
            .into()),
        }
    }
}

impl Default for Strand {
    fn default() -> Self {
        Self::Unknown
    }
}

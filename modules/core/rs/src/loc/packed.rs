use std::cmp::Ordering;
use std::fmt::Display;
use std::rc::Rc;
use std::sync::Arc;

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use eyre::Result;
use impl_tools::autoimpl;

use super::strand::Strand;
use crate::error::ModelError;

// Layout (least significant bit first):
// [0, 31)  - start
// [31, 62) - end
// 62       - direction bit (set for the forward strand)
// 63       - known bit (set for both forward and reverse strands)
const COORDINATE_BITS: u32 = 31;
const COORDINATE_MASK: u64 = (1 << COORDINATE_BITS) - 1;
const END_SHIFT: u32 = COORDINATE_BITS;
const DIRECTION_BIT: u64 = 1 << 62;
const KNOWN_BIT: u64 = 1 << 63;

/// Genomic interval with inclusive coordinates and a strand packed into a single 64-bit word.
///
/// Reads are stored by the hundreds of millions, hence no per-read allocation: everything that can
/// be derived from the coordinates (length, midpoint, overlaps) is computed from the packed value.
/// Both `start` and `end` are limited to 31 bits and `start <= end` always holds.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct PackedInterval(u64);

impl PackedInterval {
    /// Largest coordinate that fits into the packed representation.
    pub const MAX_COORDINATE: i64 = COORDINATE_MASK as i64;

    /// Pack an interval. Coordinates are swapped if `end < start`.
    pub fn pack(start: i64, end: i64, strand: Strand) -> Result<Self> {
        if start < 0 || end < 0 {
            return Err(ModelError::invalid_argument(format!(
                "Negative positions are not allowed: start={start}, end={end}"
            ))
            .into());
        }
        if start > Self::MAX_COORDINATE || end > Self::MAX_COORDINATE {
            return Err(ModelError::invalid_argument(format!(
                "Positions must not exceed {}: start={start}, end={end}",
                Self::MAX_COORDINATE
            ))
            .into());
        }

        let (start, end) = if end < start { (end, start) } else { (start, end) };
        let mut value = (start as u64) | ((end as u64) << END_SHIFT);
        value |= match strand {
            Strand::Forward => KNOWN_BIT | DIRECTION_BIT,
            Strand::Reverse => KNOWN_BIT,
            Strand::Unknown => 0,
        };
        Ok(Self(value))
    }

    /// Restore an interval from its raw 64-bit representation.
    pub fn from_raw(raw: u64) -> Result<Self> {
        let packed = Self(raw);
        if raw & DIRECTION_BIT != 0 && raw & KNOWN_BIT == 0 {
            return Err(ModelError::invalid_argument(format!(
                "Raw value {raw:#x} has the direction bit set without the known bit"
            ))
            .into());
        }
        if packed.start() > packed.end() {
            return Err(ModelError::invalid_argument(format!(
                "Raw value {raw:#x} decodes to start {} > end {}",
                packed.start(),
                packed.end()
            ))
            .into());
        }
        Ok(packed)
    }

    /// Raw 64-bit representation.
    #[inline(always)]
    pub fn raw(&self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub fn start(&self) -> u32 {
        (self.0 & COORDINATE_MASK) as u32
    }

    #[inline(always)]
    pub fn end(&self) -> u32 {
        ((self.0 >> END_SHIFT) & COORDINATE_MASK) as u32
    }

    #[inline(always)]
    pub fn strand(&self) -> Strand {
        if self.0 & KNOWN_BIT == 0 {
            Strand::Unknown
        } else if self.0 & DIRECTION_BIT != 0 {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }

    /// Number of bases covered by the interval. Both ends are inclusive.
    #[inline(always)]
    pub fn length(&self) -> u32 {
        self.end() - self.start() + 1
    }

    #[inline(always)]
    pub fn midpoint(&self) -> u32 {
        self.start() + (self.end() - self.start()) / 2
    }

    #[inline(always)]
    pub fn contains(&self, pos: u32) -> bool {
        self.start() <= pos && pos <= self.end()
    }

    /// Whether two intervals share at least one base.
    /// Both intervals must come from the same chromosome, this can't be checked here.
    #[inline(always)]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start() <= other.end() && self.end() >= other.start()
    }

    /// Order by start, then end, then strand.
    pub fn compare(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        self.start()
            .cmp(&other.start())
            .then_with(|| self.end().cmp(&other.end()))
            .then_with(|| self.strand().cmp(&other.strand()))
    }

    /// Interval with the same coordinates on a different strand.
    pub fn with_strand(&self, strand: Strand) -> Self {
        let coordinates = self.0 & !(KNOWN_BIT | DIRECTION_BIT);
        let bits = match strand {
            Strand::Forward => KNOWN_BIT | DIRECTION_BIT,
            Strand::Reverse => KNOWN_BIT,
            Strand::Unknown => 0,
        };
        Self(coordinates | bits)
    }

    /// Location in a GenBank-like notation: `10..20`, `complement(10..20)` or `unknown(10..20)`.
    pub fn location_string(&self) -> String {
        match self.strand() {
            Strand::Forward => format!("{}..{}", self.start(), self.end()),
            Strand::Reverse => format!("complement({}..{})", self.start(), self.end()),
            Strand::Unknown => format!("unknown({}..{})", self.start(), self.end()),
        }
    }
}

/// Distance spanned by two mates: from the leftmost start to the rightmost end.
pub fn fragment_length(first: &PackedInterval, second: &PackedInterval) -> u32 {
    first.end().max(second.end()) - first.start().min(second.start())
}

/// Human-readable length: `950bp`, `1.5kbp`, `2.3Mbp`.
pub fn format_length(length: u32) -> String {
    if length < 1_000 {
        format!("{length}bp")
    } else if length < 1_000_000 {
        format!("{:.1}kbp", length as f64 / 1_000.0)
    } else {
        format!("{:.1}Mbp", length as f64 / 1_000_000.0)
    }
}

impl PartialOrd for PackedInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackedInterval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl Display for PackedInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.location_string(),
            format_length(self.length())
        )
    }
}

impl TryFrom<(i64, i64, Strand)> for PackedInterval {
    type Error = eyre::Report;

    fn try_from((start, end, strand): (i64, i64, Strand)) -> Result<Self, Self::Error> {
        Self::pack(start, end, strand)
    }
}

impl From<PackedInterval> for (u32, u32, Strand) {
    fn from(value: PackedInterval) -> Self {
        (value.start(), value.end(), value.strand())
    }
}

/// Trait for types that are located by a packed interval (probes, features, ...).
#[autoimpl(for <T: trait + ?Sized> &T, Box<T>, Rc<T>, Arc<T>)]
pub trait PackedOp {
    /// Packed location of the object.
    fn packed(&self) -> PackedInterval;

    fn start(&self) -> u32 {
        self.packed().start()
    }

    fn end(&self) -> u32 {
        self.packed().end()
    }

    fn strand(&self) -> Strand {
        self.packed().strand()
    }

    fn length(&self) -> u32 {
        self.packed().length()
    }

    fn midpoint(&self) -> u32 {
        self.packed().midpoint()
    }
}

impl PackedOp for PackedInterval {
    #[inline(always)]
    fn packed(&self) -> PackedInterval {
        *self
    }
}

/// Random-access target of the in-place quicksort.
trait SortTarget {
    fn key(&self, ind: usize) -> PackedInterval;
    fn swap(&mut self, first: usize, second: usize);
}

impl SortTarget for [PackedInterval] {
    #[inline(always)]
    fn key(&self, ind: usize) -> PackedInterval {
        self[ind]
    }

    #[inline(always)]
    fn swap(&mut self, first: usize, second: usize) {
        <[PackedInterval]>::swap(self, first, second)
    }
}

struct Paired<'a, T> {
    values: &'a mut [PackedInterval],
    companions: &'a mut [T],
}

impl<T> SortTarget for Paired<'_, T> {
    #[inline(always)]
    fn key(&self, ind: usize) -> PackedInterval {
        self.values[ind]
    }

    #[inline(always)]
    fn swap(&mut self, first: usize, second: usize) {
        self.values.swap(first, second);
        self.companions.swap(first, second);
    }
}

/// Sort intervals in place using the interval ordering.
pub fn sort(values: &mut [PackedInterval]) {
    if values.len() < 2 {
        return;
    }
    quicksort(values, 0, values.len() - 1);
}

/// Sort intervals in place, applying every swap to `companions` as well (e.g. read counts).
pub fn sort_paired<T>(values: &mut [PackedInterval], companions: &mut [T]) -> Result<()> {
    if values.len() != companions.len() {
        return Err(ModelError::invalid_argument(format!(
            "Paired sort requires arrays of equal length, got {} and {}",
            values.len(),
            companions.len()
        ))
        .into());
    }
    if values.len() < 2 {
        return Ok(());
    }
    let hi = values.len() - 1;
    quicksort(&mut Paired { values, companions }, 0, hi);
    Ok(())
}

// Hoare-style partitioning around the middle element. Recurse into the smaller half and loop over
// the larger one to keep the stack depth logarithmic.
fn quicksort<T: SortTarget + ?Sized>(target: &mut T, mut lo: usize, mut hi: usize) {
    while lo < hi {
        let pivot = target.key(lo + (hi - lo) / 2);
        let (mut i, mut j) = (lo as isize, hi as isize);

        while i <= j {
            while target.key(i as usize).compare(&pivot) == Ordering::Less {
                i += 1;
            }
            while target.key(j as usize).compare(&pivot) == Ordering::Greater {
                j -= 1;
            }
            if i <= j {
                target.swap(i as usize, j as usize);
                i += 1;
                j -= 1;
            }
        }

        // [lo, j] and [i, hi] are left to sort
        let left = j - lo as isize;
        let right = hi as isize - i;
        if left < right {
            if (lo as isize) < j {
                quicksort(target, lo, j as usize);
            }
            lo = i as usize;
        } else {
            if i < hi as isize {
                quicksort(target, i as usize, hi);
            }
            if j < 0 {
                return;
            }
            hi = j as usize;
        }
    }
}

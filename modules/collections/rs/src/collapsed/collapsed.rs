use std::iter::Zip;
use std::vec::IntoIter;

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_getters::Dissolve;
use eyre::Result;

use probekit_core_rs::loc::PackedInterval;
use probekit_core_rs::ModelError;

pub struct CollapsedReadsBuilder {
    positions: Option<Vec<PackedInterval>>,
    counts: Option<Vec<u32>>,
}

impl Default for CollapsedReadsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CollapsedReadsBuilder {
    pub fn new() -> Self {
        Self {
            positions: None,
            counts: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.positions = Some(Vec::with_capacity(capacity));
        self.counts = Some(Vec::with_capacity(capacity));
        self
    }

    /// Reuse existing allocations. Buffers are cleared.
    pub fn with_buffers(
        mut self,
        mut positions: Vec<PackedInterval>,
        mut counts: Vec<u32>,
    ) -> Self {
        positions.clear();
        counts.clear();

        self.positions = Some(positions);
        self.counts = Some(counts);
        self
    }

    /// Use already collapsed runs. Positions must be strictly increasing and counts positive.
    pub fn with_rle_values(
        mut self,
        positions: Vec<PackedInterval>,
        counts: Vec<u32>,
    ) -> Result<Self> {
        if positions.len() != counts.len() {
            return Err(ModelError::invalid_argument(format!(
                "Positions and counts must have the same length, got {} and {}",
                positions.len(),
                counts.len()
            ))
            .into());
        }
        if let Some(ind) = positions.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ModelError::invalid_argument(format!(
                "Collapsed positions must be strictly increasing: {} is followed by {}",
                positions[ind],
                positions[ind + 1]
            ))
            .into());
        }
        if counts.contains(&0) {
            return Err(ModelError::invalid_argument("Collapsed counts must be positive").into());
        }

        self.positions = Some(positions);
        self.counts = Some(counts);
        Ok(self)
    }

    /// Collapse a sorted sequence of reads into runs of identical reads.
    pub fn with_sorted_values(mut self, sorted: &[PackedInterval]) -> Result<Self> {
        ensure_sorted(sorted)?;

        let mut positions = self.positions.take().unwrap_or_default();
        positions.clear();
        let mut counts = self.counts.take().unwrap_or_default();
        counts.clear();

        let mut iter = sorted.iter();
        if let Some(first) = iter.next() {
            let mut current = *first;
            let mut count: u32 = 1;
            for read in iter {
                if *read == current {
                    count = increment(count, 1)?;
                } else {
                    positions.push(current);
                    counts.push(count);

                    current = *read;
                    count = 1;
                }
            }
            positions.push(current);
            counts.push(count);
        }

        self.positions = Some(positions);
        self.counts = Some(counts);
        Ok(self)
    }

    /// Same as [`Self::with_sorted_values`] but collapses the vector in place, reusing its memory.
    pub fn with_sorted_values_inplace(mut self, mut values: Vec<PackedInterval>) -> Result<Self> {
        ensure_sorted(&values)?;

        let mut counts = self.counts.take().unwrap_or_default();
        counts.clear();
        collapse_inplace(&mut values, None, &mut counts)?;

        self.positions = Some(values);
        self.counts = Some(counts);
        Ok(self)
    }

    pub fn build(self) -> CollapsedReads {
        CollapsedReads {
            positions: self.positions.unwrap_or_default(),
            counts: self.counts.unwrap_or_default(),
        }
    }
}

/// Run-length encoded multiset of reads: each distinct read is stored once, next to the number of
/// times it was observed.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Dissolve)]
pub struct CollapsedReads {
    positions: Vec<PackedInterval>,
    counts: Vec<u32>,
}

impl CollapsedReads {
    pub fn builder() -> CollapsedReadsBuilder {
        CollapsedReadsBuilder::new()
    }

    /// Collapse reads sorted by the interval ordering.
    pub fn from_sorted(sorted: &[PackedInterval]) -> Result<Self> {
        Ok(Self::builder().with_sorted_values(sorted)?.build())
    }

    /// Sort arbitrary reads and collapse them.
    pub fn from_unsorted(mut reads: Vec<PackedInterval>) -> Result<Self> {
        probekit_core_rs::loc::sort(&mut reads);
        Ok(Self::builder().with_sorted_values_inplace(reads)?.build())
    }

    pub fn rebuild(mut self) -> CollapsedReadsBuilder {
        self.clear();
        CollapsedReadsBuilder {
            positions: Some(self.positions),
            counts: Some(self.counts),
        }
    }

    /// Number of distinct reads.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.counts.clear();
    }

    pub fn positions(&self) -> &[PackedInterval] {
        &self.positions
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn runs(&self) -> impl Iterator<Item = (&PackedInterval, &u32)> {
        self.positions.iter().zip(self.counts.iter())
    }

    /// Total number of reads, i.e. the sum of all counts.
    pub fn total_count(&self) -> u64 {
        self.counts.iter().map(|x| *x as u64).sum()
    }

    /// Materialize the multiset back into a flat sorted sequence of reads.
    pub fn expand(&self) -> Vec<PackedInterval> {
        let mut expanded = Vec::with_capacity(self.total_count() as usize);
        for (position, count) in self.runs() {
            expanded.extend(std::iter::repeat_n(*position, *count as usize));
        }
        expanded
    }
}

impl IntoIterator for CollapsedReads {
    type Item = (PackedInterval, u32);
    type IntoIter = Zip<IntoIter<PackedInterval>, IntoIter<u32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.into_iter().zip(self.counts)
    }
}

impl From<CollapsedReads> for (Vec<PackedInterval>, Vec<u32>) {
    fn from(value: CollapsedReads) -> Self {
        (value.positions, value.counts)
    }
}

fn ensure_sorted(values: &[PackedInterval]) -> Result<()> {
    match values.windows(2).position(|w| w[0] > w[1]) {
        None => Ok(()),
        Some(ind) => Err(ModelError::invalid_argument(format!(
            "Reads must be sorted before collapsing: {} is followed by {}",
            values[ind],
            values[ind + 1]
        ))
        .into()),
    }
}

fn increment(count: u32, by: u32) -> Result<u32> {
    count.checked_add(by).ok_or_else(|| {
        ModelError::invalid_argument(format!("Read count {count} + {by} can't fit in u32")).into()
    })
}

/// Collapse sorted `values` in place. Each value contributes `weights[i]` reads, or a single read
/// if no weights are given. Collapsed counts are written to `counts`.
pub(super) fn collapse_inplace(
    values: &mut Vec<PackedInterval>,
    weights: Option<&[u32]>,
    counts: &mut Vec<u32>,
) -> Result<()> {
    debug_assert!(weights.is_none_or(|w| w.len() == values.len()));
    if values.is_empty() {
        return Ok(());
    }
    let weight = |ind: usize| weights.map_or(1, |w| w[ind]);

    let mut current = 0;
    let mut count = weight(0);
    for cursor in 1..values.len() {
        if values[cursor] != values[current] {
            counts.push(count);
            debug_assert_eq!(counts.len(), current + 1);

            current += 1;
            values.swap(current, cursor);
            count = weight(cursor);
        } else {
            count = increment(count, weight(cursor))?;
        }
    }
    counts.push(count);

    values.truncate(current + 1);
    debug_assert_eq!(values.len(), counts.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use probekit_core_rs::loc::Strand;

    use super::*;

    fn read(start: i64) -> PackedInterval {
        PackedInterval::pack(start, start + 10, Strand::Forward).unwrap()
    }

    fn assert_runs_eq(collapsed: &CollapsedReads, items: &[(i64, u32)]) {
        let expected: Vec<_> = items.iter().map(|(pos, cnt)| (read(*pos), *cnt)).collect();
        assert_eq!(
            collapsed.runs().map(|(x, y)| (*x, *y)).collect::<Vec<_>>(),
            expected
        );
    }

    #[test]
    fn test_collapsed_from_sorted() -> Result<()> {
        for (values, expected) in [
            (vec![], vec![]),
            (vec![1], vec![(1, 1)]),
            (vec![1, 1], vec![(1, 2)]),
            (vec![1, 1, 1], vec![(1, 3)]),
            (vec![1, 2], vec![(1, 1), (2, 1)]),
            (vec![1, 1, 2], vec![(1, 2), (2, 1)]),
            (vec![1, 1, 2, 2, 3], vec![(1, 2), (2, 2), (3, 1)]),
            (
                vec![1, 2, 3, 4, 5],
                vec![(1, 1), (2, 1), (3, 1), (4, 1), (5, 1)],
            ),
            (
                vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6],
                vec![(1, 2), (2, 2), (3, 2), (4, 2), (5, 2), (6, 1)],
            ),
        ] {
            let reads: Vec<_> = values.into_iter().map(read).collect();

            let byref = CollapsedReads::from_sorted(&reads)?;
            assert_runs_eq(&byref, &expected);
            assert_eq!(byref.total_count(), reads.len() as u64);

            let inplace = CollapsedReads::builder()
                .with_sorted_values_inplace(reads)?
                .build();
            assert_eq!(inplace, byref);
        }
        Ok(())
    }

    #[test]
    fn test_collapsed_rejects_unsorted_input() {
        let err = CollapsedReads::from_sorted(&[read(5), read(1)]).unwrap_err();
        assert!(ModelError::matches(&err, ModelError::is_invalid_argument));
    }

    #[test]
    fn test_collapsed_distinguishes_strands() -> Result<()> {
        let forward = PackedInterval::pack(1, 10, Strand::Forward)?;
        let reverse = PackedInterval::pack(1, 10, Strand::Reverse)?;
        let collapsed = CollapsedReads::from_unsorted(vec![reverse, forward, reverse])?;
        assert_eq!(collapsed.positions(), [forward, reverse]);
        assert_eq!(collapsed.counts(), [1, 2]);
        Ok(())
    }

    #[test]
    fn test_collapse_is_idempotent() -> Result<()> {
        let reads: Vec<_> = [3, 3, 3, 7, 9, 9, 12].into_iter().map(read).collect();
        let collapsed = CollapsedReads::from_sorted(&reads)?;
        let expanded = collapsed.expand();
        assert_eq!(expanded, reads);
        assert_eq!(CollapsedReads::from_sorted(&expanded)?, collapsed);
        Ok(())
    }

    #[test]
    fn test_with_rle_values_validation() -> Result<()> {
        let collapsed = CollapsedReads::builder()
            .with_rle_values(vec![read(1), read(2)], vec![3, 4])?
            .build();
        assert_eq!(collapsed.total_count(), 7);

        for (positions, counts) in [
            (vec![read(1), read(2)], vec![3]),
            (vec![read(2), read(1)], vec![1, 1]),
            (vec![read(1), read(1)], vec![1, 1]),
            (vec![read(1)], vec![0]),
        ] {
            let err = CollapsedReads::builder()
                .with_rle_values(positions, counts)
                .err()
                .expect("construction must fail");
            assert!(ModelError::matches(&err, ModelError::is_invalid_argument));
        }
        Ok(())
    }

    #[test]
    fn test_rebuild_reuses_buffers() -> Result<()> {
        let collapsed = CollapsedReads::from_sorted(&[read(1), read(1)])?;
        let rebuilt = collapsed.rebuild().with_sorted_values(&[read(4)])?.build();
        assert_runs_eq(&rebuilt, &[(4, 1)]);

        let (positions, counts) = rebuilt.dissolve();
        assert_eq!(positions, [read(4)]);
        assert_eq!(counts, [1]);
        Ok(())
    }

    #[cfg(feature = "bitcode")]
    #[test]
    fn test_bitcode_roundtrip() -> Result<()> {
        for collapsed in [
            CollapsedReads::default(),
            CollapsedReads::from_unsorted(vec![read(7), read(1), read(7), read(3), read(7)])?,
        ] {
            let decoded: CollapsedReads = bitcode::decode(&bitcode::encode(&collapsed))?;
            assert_eq!(decoded, collapsed);
        }
        Ok(())
    }
}

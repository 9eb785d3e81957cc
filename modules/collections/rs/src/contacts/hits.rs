use std::cmp::Ordering;

use ahash::{HashMap, HashMapExt};
use itertools::Itertools;
use rayon::prelude::*;

use probekit_core_rs::loc::PackedInterval;

// Parallel arrays: i-th contact goes from source[i] to partner[i]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PartnerHits {
    source: Vec<PackedInterval>,
    partner: Vec<PackedInterval>,
}

impl PartnerHits {
    fn push(&mut self, source: PackedInterval, partner: PackedInterval) {
        self.source.push(source);
        self.partner.push(partner);
    }

    fn len(&self) -> usize {
        self.source.len()
    }

    // Sort a permutation of indices and apply it to both arrays at once
    fn sort(&mut self) {
        let (source, partner) = (&self.source, &self.partner);
        let mut indices: Vec<usize> = (0..source.len()).collect();
        indices.sort_by(|&a, &b| compare_hits(source, partner, a, b));

        self.source = indices.iter().map(|&ind| source[ind]).collect();
        self.partner = indices.iter().map(|&ind| partner[ind]).collect();
    }

    fn trim(&mut self) {
        self.source.shrink_to_fit();
        self.partner.shrink_to_fit();
    }
}

fn compare_hits(
    source: &[PackedInterval],
    partner: &[PackedInterval],
    a: usize,
    b: usize,
) -> Ordering {
    source[a]
        .compare(&source[b])
        .then_with(|| partner[a].compare(&partner[b]))
}

/// Long-range contacts (Hi-C style) from one source chromosome, grouped by partner chromosome.
///
/// Partners are keyed by chromosome name rather than by chromosome handles to stay valid across
/// reloads. Contacts are appended as they come, call [`Self::sort_collection`] once populated.
/// Identical contacts are never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterChromosomeHitStore {
    source_chromosome: String,
    hits: HashMap<String, PartnerHits>,
}

impl InterChromosomeHitStore {
    pub fn new(source_chromosome: impl Into<String>) -> Self {
        Self {
            source_chromosome: source_chromosome.into(),
            hits: HashMap::new(),
        }
    }

    pub fn source_chromosome_name(&self) -> &str {
        &self.source_chromosome
    }

    pub fn add_hit(
        &mut self,
        partner_chromosome: &str,
        source: PackedInterval,
        partner: PackedInterval,
    ) {
        match self.hits.get_mut(partner_chromosome) {
            Some(hits) => hits.push(source, partner),
            None => {
                let mut hits = PartnerHits::default();
                hits.push(source, partner);
                self.hits.insert(partner_chromosome.to_string(), hits);
            }
        }
    }

    /// Names of partner chromosomes with at least one contact, sorted lexically.
    pub fn chromosome_names_with_hits(&self) -> Vec<&str> {
        self.hits.keys().map(|x| x.as_str()).sorted().collect()
    }

    pub fn source_positions_for(&self, partner_chromosome: &str) -> &[PackedInterval] {
        self.hits
            .get(partner_chromosome)
            .map(|x| x.source.as_slice())
            .unwrap_or(&[])
    }

    pub fn partner_positions_for(&self, partner_chromosome: &str) -> &[PackedInterval] {
        self.hits
            .get(partner_chromosome)
            .map(|x| x.partner.as_slice())
            .unwrap_or(&[])
    }

    /// Contacts with the given partner chromosome as (source, partner) pairs.
    pub fn hits_for(
        &self,
        partner_chromosome: &str,
    ) -> impl Iterator<Item = (&PackedInterval, &PackedInterval)> {
        self.source_positions_for(partner_chromosome)
            .iter()
            .zip(self.partner_positions_for(partner_chromosome))
    }

    /// Source positions across all partner chromosomes, sorted by the interval ordering.
    pub fn all_source_positions(&self) -> Vec<PackedInterval> {
        let mut positions: Vec<_> = self
            .hits
            .values()
            .flat_map(|x| x.source.iter().copied())
            .collect();
        probekit_core_rs::loc::sort(&mut positions);
        positions
    }

    /// Total number of stored contacts.
    pub fn hit_count(&self) -> usize {
        self.hits.values().map(|x| x.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Append every contact of `other` to this collection. The result is not sorted.
    pub fn add_collection(&mut self, other: &InterChromosomeHitStore) {
        for partner in other.chromosome_names_with_hits() {
            for (source, hit) in other.hits_for(partner) {
                self.add_hit(partner, *source, *hit);
            }
        }
    }

    /// Sort contacts of every partner chromosome by source position, then by partner position.
    /// The sort is stable: identical contacts are all kept in their insertion order.
    pub fn sort_collection(&mut self) {
        log::debug!(
            "Sorting {} contacts of {} across {} partner chromosomes",
            self.hit_count(),
            self.source_chromosome,
            self.hits.len()
        );
        self.hits.par_iter_mut().for_each(|(_, hits)| hits.sort());
    }

    /// Release unused capacity once the collection is fully populated.
    pub fn trim(&mut self) {
        for hits in self.hits.values_mut() {
            hits.trim();
        }
    }
}

#[cfg(test)]
mod tests {
    use probekit_core_rs::loc::Strand;

    use super::*;

    fn pos(start: i64) -> PackedInterval {
        PackedInterval::pack(start, start + 50, Strand::Forward).unwrap()
    }

    #[test]
    fn test_add_hit() {
        let mut store = InterChromosomeHitStore::new("chr1");
        store.add_hit("chr2", pos(100), pos(500));
        store.add_hit("chr3", pos(10), pos(20));
        store.add_hit("chr2", pos(50), pos(600));

        assert_eq!(store.source_chromosome_name(), "chr1");
        assert_eq!(store.chromosome_names_with_hits(), ["chr2", "chr3"]);
        assert_eq!(store.source_positions_for("chr2"), [pos(100), pos(50)]);
        assert_eq!(store.partner_positions_for("chr2"), [pos(500), pos(600)]);
        assert_eq!(store.hit_count(), 3);

        assert!(store.source_positions_for("chrX").is_empty());
        assert!(store.partner_positions_for("chrX").is_empty());
    }

    #[test]
    fn test_sort_collection() {
        let mut store = InterChromosomeHitStore::new("chr1");
        for (source, partner) in [(300, 1), (100, 9), (200, 5), (100, 2), (300, 0)] {
            store.add_hit("chr2", pos(source), pos(partner));
        }
        store.add_hit("chr3", pos(7), pos(7));
        store.sort_collection();

        let hits: Vec<_> = store
            .hits_for("chr2")
            .map(|(s, p)| (s.start(), p.start()))
            .collect();
        assert_eq!(hits, [(100, 2), (100, 9), (200, 5), (300, 0), (300, 1)]);
        assert_eq!(store.source_positions_for("chr3"), [pos(7)]);
    }

    #[test]
    fn test_sort_collection_keeps_duplicates() {
        let mut store = InterChromosomeHitStore::new("chr1");
        store.add_hit("chr2", pos(100), pos(500));
        store.add_hit("chr2", pos(100), pos(500));
        store.sort_collection();

        assert_eq!(store.source_positions_for("chr2"), [pos(100), pos(100)]);
        assert_eq!(store.partner_positions_for("chr2"), [pos(500), pos(500)]);
    }

    #[test]
    fn test_add_collection() {
        let mut first = InterChromosomeHitStore::new("chr1");
        first.add_hit("chr2", pos(300), pos(1));

        let mut second = InterChromosomeHitStore::new("chr1");
        second.add_hit("chr2", pos(100), pos(2));
        second.add_hit("chrX", pos(5), pos(6));

        first.add_collection(&second);
        assert_eq!(first.hit_count(), 3);
        // Appended, not merged in order
        assert_eq!(first.source_positions_for("chr2"), [pos(300), pos(100)]);
        assert_eq!(first.chromosome_names_with_hits(), ["chr2", "chrX"]);

        first.sort_collection();
        assert_eq!(first.source_positions_for("chr2"), [pos(100), pos(300)]);
        assert_eq!(first.partner_positions_for("chr2"), [pos(2), pos(1)]);
    }

    #[test]
    fn test_all_source_positions_and_trim() {
        let mut store = InterChromosomeHitStore::new("chr1");
        store.add_hit("chr3", pos(30), pos(1));
        store.add_hit("chr2", pos(10), pos(1));
        store.add_hit("chr2", pos(20), pos(1));

        let before = store.clone();
        store.trim();
        assert_eq!(store, before);
        assert_eq!(store.all_source_positions(), [pos(10), pos(20), pos(30)]);
    }
}

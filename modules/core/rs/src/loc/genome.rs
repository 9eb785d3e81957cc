use std::sync::Arc;

use ahash::AHashMap;

use super::chromosome::Chromosome;

/// Registry of chromosomes, resolving names to shared chromosome handles.
///
/// Long-range contacts are keyed by chromosome names, the registry maps them back to the same
/// handles that probes hold.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    chromosomes: AHashMap<String, Arc<Chromosome>>,
}

impl Genome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the chromosome with the given name, registering it if it's not known yet.
    pub fn get_or_insert(&mut self, name: &str) -> Arc<Chromosome> {
        if let Some(chr) = self.chromosomes.get(name) {
            return chr.clone();
        }
        let chr = Arc::new(Chromosome::new(name));
        self.chromosomes.insert(name.to_string(), chr.clone());
        chr
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Chromosome>> {
        self.chromosomes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.chromosomes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// All chromosomes in the genome order.
    pub fn chromosomes(&self) -> Vec<Arc<Chromosome>> {
        let mut chromosomes: Vec<_> = self.chromosomes.values().cloned().collect();
        chromosomes.sort();
        chromosomes
    }

    pub fn total_length(&self) -> u64 {
        self.chromosomes.values().map(|x| x.length() as u64).sum()
    }
}

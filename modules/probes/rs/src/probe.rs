use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use eyre::Result;

use probekit_core_rs::loc::{format_length, Chromosome, PackedInterval, PackedOp, Strand};
use probekit_core_rs::ModelError;

// Construction order of probes, the last resort when ordering otherwise identical probes
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Named genomic region, the unit of quantitation.
///
/// Probes are shared (`Arc<Probe>`) between every list that contains them. Each probe carries a
/// storage index assigned exactly once by the owning [`crate::ProbeSet`]; quantitation arrays are
/// addressed by this index.
///
/// Probes are totally ordered: by chromosome, by location, by name (unnamed probes first) and
/// finally by construction order. Two distinct probes never compare equal.
#[derive(Debug)]
pub struct Probe {
    chromosome: Arc<Chromosome>,
    location: PackedInterval,
    name: Option<String>,
    index: OnceLock<usize>,
    serial: u64,
}

impl Probe {
    pub fn new(chromosome: Arc<Chromosome>, location: PackedInterval) -> Self {
        Self {
            chromosome,
            location,
            name: None,
            index: OnceLock::new(),
            serial: NEXT_SERIAL.fetch_add(1, AtomicOrdering::Relaxed),
        }
    }

    pub fn with_name(
        chromosome: Arc<Chromosome>,
        location: PackedInterval,
        name: impl Into<String>,
    ) -> Self {
        let mut probe = Self::new(chromosome, location);
        probe.name = Some(name.into());
        probe
    }

    pub fn builder(chromosome: Arc<Chromosome>, start: i64, end: i64) -> ProbeBuilder {
        ProbeBuilder {
            chromosome,
            start,
            end,
            strand: Strand::Unknown,
            name: None,
            index: None,
        }
    }

    pub fn chromosome(&self) -> &Arc<Chromosome> {
        &self.chromosome
    }

    pub fn location(&self) -> PackedInterval {
        self.location
    }

    /// Storage index, `None` until the probe is registered in a probe set.
    pub fn index(&self) -> Option<usize> {
        self.index.get().copied()
    }

    /// Assign the storage index. The index can be set only once and must be non-negative.
    pub fn set_index(&self, index: i64) -> Result<()> {
        if index < 0 {
            return Err(ModelError::invalid_argument(format!(
                "Probe index must be non-negative, got {index}"
            ))
            .into());
        }
        self.index.set(index as usize).map_err(|_| {
            ModelError::invalid_state(format!(
                "Index of probe {} is already set to {:?}, can't reset it to {index}",
                self.name(),
                self.index()
            ))
            .into()
        })
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    pub fn has_defined_name(&self) -> bool {
        self.name.is_some()
    }

    /// Explicit name of the probe, or its location for unnamed probes.
    pub fn name(&self) -> Cow<'_, str> {
        match &self.name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(self.location_name()),
        }
    }

    /// Whether the probe lies within the known extent of its chromosome.
    /// Always true while the chromosome length is unknown.
    pub fn is_within_chromosome(&self) -> bool {
        let length = self.chromosome.length();
        length == 0 || self.location.end() <= length
    }

    fn location_name(&self) -> String {
        format!(
            "Chr{}:{}-{}",
            self.chromosome,
            self.location.start(),
            self.location.end()
        )
    }
}

impl PackedOp for Probe {
    fn packed(&self) -> PackedInterval {
        self.location
    }
}

impl PartialEq for Probe {
    fn eq(&self, other: &Self) -> bool {
        self.serial == other.serial
    }
}

impl Eq for Probe {}

impl Hash for Probe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial.hash(state);
    }
}

impl PartialOrd for Probe {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Probe {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.serial == other.serial {
            return Ordering::Equal;
        }

        let chromosome = if Arc::ptr_eq(&self.chromosome, &other.chromosome) {
            Ordering::Equal
        } else {
            self.chromosome.cmp(&other.chromosome)
        };

        chromosome
            .then_with(|| self.location.compare(&other.location))
            // Unnamed probes go first, keeps the order transitive
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.serial.cmp(&other.serial))
    }
}

impl Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strand = match self.location.strand() {
            Strand::Forward => "FOR",
            Strand::Reverse => "REV",
            Strand::Unknown => "UNK",
        };
        let length = format_length(self.location.length());
        match &self.name {
            Some(name) => write!(f, "{} {} {} ({})", name, self.location_name(), strand, length),
            None => write!(f, "{} {} ({})", self.location_name(), strand, length),
        }
    }
}

pub struct ProbeBuilder {
    chromosome: Arc<Chromosome>,
    start: i64,
    end: i64,
    strand: Strand,
    name: Option<String>,
    index: Option<usize>,
}

impl ProbeBuilder {
    pub fn strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Pre-assign the storage index, e.g. when restoring a saved probe set.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn build(self) -> Result<Probe> {
        let location = PackedInterval::pack(self.start, self.end, self.strand)?;
        let mut probe = Probe::new(self.chromosome, location);
        probe.name = self.name;
        if let Some(index) = self.index {
            probe.index = OnceLock::from(index);
        }
        Ok(probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chr(name: &str) -> Arc<Chromosome> {
        Arc::new(Chromosome::new(name))
    }

    #[test]
    fn test_probe_index_is_write_once() -> Result<()> {
        let probe = Probe::builder(chr("1"), 10, 20).build()?;
        assert_eq!(probe.index(), None);

        let err = probe.set_index(-1).unwrap_err();
        assert!(ModelError::matches(&err, ModelError::is_invalid_argument));
        assert_eq!(probe.index(), None);

        probe.set_index(5)?;
        assert_eq!(probe.index(), Some(5));

        for index in [5, 6, -3] {
            assert!(probe.set_index(index).is_err());
        }
        let err = probe.set_index(7).unwrap_err();
        assert!(ModelError::matches(&err, ModelError::is_invalid_state));
        assert_eq!(probe.index(), Some(5));
        Ok(())
    }

    #[test]
    fn test_probe_builder() -> Result<()> {
        let probe = Probe::builder(chr("2"), 30, 10)
            .strand(Strand::Reverse)
            .name("gene")
            .index(3)
            .build()?;
        assert_eq!((probe.start(), probe.end()), (10, 30));
        assert_eq!(probe.strand(), Strand::Reverse);
        assert_eq!(probe.name(), "gene");
        assert_eq!(probe.index(), Some(3));
        assert!(probe.set_index(4).is_err());

        assert!(Probe::builder(chr("2"), -1, 10).build().is_err());
        Ok(())
    }

    #[test]
    fn test_probe_name() -> Result<()> {
        let unnamed = Probe::builder(chr("3"), 100, 200).build()?;
        assert!(!unnamed.has_defined_name());
        assert_eq!(unnamed.name(), "Chr3:100-200");
        assert_eq!(unnamed.to_string(), "Chr3:100-200 UNK (101bp)");

        let named = Probe::builder(chr("3"), 100, 200)
            .strand(Strand::Forward)
            .name("enhancer")
            .build()?;
        assert_eq!(named.to_string(), "enhancer Chr3:100-200 FOR (101bp)");
        Ok(())
    }

    #[test]
    fn test_probe_ordering() -> Result<()> {
        let (chr1, chr2) = (chr("1"), chr("2"));
        let probes = [
            Probe::builder(chr1.clone(), 10, 20).build()?,
            Probe::builder(chr1.clone(), 10, 20).build()?,
            Probe::builder(chr1.clone(), 10, 20).name("b").build()?,
            Probe::builder(chr1.clone(), 10, 20).name("a").build()?,
            Probe::builder(chr1.clone(), 5, 50).build()?,
            Probe::builder(chr2.clone(), 1, 2).build()?,
        ];

        // Strict order even among identical probes
        for (i, a) in probes.iter().enumerate() {
            for (j, b) in probes.iter().enumerate() {
                assert_eq!(a.cmp(b) == Ordering::Equal, i == j);
                assert_eq!(a.cmp(b), b.cmp(a).reverse());
            }
        }

        assert!(probes[4] < probes[0]);
        assert!(probes[0] < probes[1]);
        assert!(probes[3] < probes[2]);
        assert!(probes[0] < probes[5]);
        Ok(())
    }

    #[test]
    fn test_unnamed_probes_sort_before_named() -> Result<()> {
        let chromosome = chr("1");
        let named_b = Probe::builder(chromosome.clone(), 10, 20).name("b").build()?;
        let unnamed = Probe::builder(chromosome.clone(), 10, 20).build()?;
        let named_a = Probe::builder(chromosome, 10, 20).name("a").build()?;

        // Construction order alone would give named_b < unnamed < named_a < named_b
        assert!(unnamed < named_a);
        assert!(named_a < named_b);
        assert!(unnamed < named_b);

        let mut sorted = [&named_b, &unnamed, &named_a];
        sorted.sort();
        assert_eq!(sorted, [&unnamed, &named_a, &named_b]);
        Ok(())
    }

    #[test]
    fn test_probe_within_chromosome() -> Result<()> {
        let chromosome = chr("X");
        let probe = Probe::builder(chromosome.clone(), 10, 200).build()?;
        assert!(probe.is_within_chromosome());
        chromosome.set_length(100);
        assert!(!probe.is_within_chromosome());
        chromosome.set_length(200);
        assert!(probe.is_within_chromosome());
        Ok(())
    }
}

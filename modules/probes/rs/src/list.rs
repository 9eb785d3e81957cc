use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::HashMap;
use derive_getters::Getters;
use derive_more::{Constructor, Display};
use eyre::Result;
use itertools::Itertools;

use probekit_core_rs::loc::Chromosome;
use probekit_core_rs::ModelError;

use crate::probe::Probe;

/// Handle of a probe list inside its probe set. Handles are never reused within a probe set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Constructor)]
#[display("#{_0}")]
pub struct ListId(usize);

impl ListId {
    /// The root list of every probe set.
    pub const ROOT: ListId = ListId(0);

    pub fn get(&self) -> usize {
        self.0
    }
}

// Separates value names when all names of a list are stored as a single string
const VALUE_NAMES_SEPARATOR: &str = "%%";

#[derive(Debug, Default)]
pub(crate) struct ProbeStorage {
    // Insertion order until the next sort
    probes: Vec<Arc<Probe>>,
    // Sparse: only probes that were added with values are stored here
    values: HashMap<u64, Box<[f32]>>,
    sorted: bool,
}

impl ProbeStorage {
    fn ensure_sorted(&mut self, list: &str) {
        if self.sorted {
            return;
        }
        self.probes.sort();

        // Duplicates can only be the very same probe added twice
        let before = self.probes.len();
        self.probes
            .dedup_by(|next, kept| Arc::ptr_eq(next, kept) || **next == **kept);
        let removed = before - self.probes.len();
        if removed > 0 {
            log::warn!("Removed {removed} duplicated probes from the probe list {list}");
        }

        self.probes.shrink_to_fit();
        self.sorted = true;
    }
}

/// Named, ordered and duplicate-free collection of probes with optional per-probe values.
///
/// Probes are appended without sorting; the list is sorted and deduplicated lazily, on the first
/// read after a modification. All probe accessors return copies, the internal order is never
/// exposed to modifications. Storage is guarded per list, so a list can be filled from one thread
/// while being read from another.
#[derive(Debug, Getters)]
pub struct ProbeList {
    #[getter(skip)]
    id: ListId,
    name: String,
    description: String,
    comments: String,
    value_names: Vec<String>,
    parent: Option<ListId>,
    children: Vec<ListId>,
    #[getter(skip)]
    storage: Mutex<ProbeStorage>,
}

impl ProbeList {
    pub(crate) fn new(
        id: ListId,
        parent: Option<ListId>,
        name: impl Into<String>,
        description: impl AsRef<str>,
        value_names: Vec<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: sanitize_description(description.as_ref()),
            comments: String::new(),
            value_names: value_names
                .into_iter()
                .map(|x| sanitize_value_name(&x))
                .collect(),
            parent,
            children: Vec::new(),
            storage: Mutex::new(ProbeStorage::default()),
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn add_child(&mut self, child: ListId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: ListId) {
        self.children.retain(|x| *x != child);
    }

    /// Tabs and line breaks are replaced with spaces.
    pub fn set_description(&mut self, description: &str) {
        self.description = sanitize_description(description);
    }

    /// Tabs are replaced with spaces and backticks with apostrophes.
    pub fn set_comments(&mut self, comments: &str) {
        self.comments = comments.replace('\t', " ").replace('`', "'");
    }

    /// All value names joined into a single string with the `%%` separator.
    pub fn concatenated_value_names(&self) -> String {
        self.value_names.join(VALUE_NAMES_SEPARATOR)
    }

    /// Append a probe. Values, if given, must match the number of value names of the list.
    pub(crate) fn add_probe(&self, probe: Arc<Probe>, values: Option<Vec<f32>>) -> Result<()> {
        let mut storage = self.lock();
        self.add_probe_locked(&mut storage, probe, values)
    }

    pub(crate) fn add_probe_locked(
        &self,
        storage: &mut ProbeStorageGuard<'_>,
        probe: Arc<Probe>,
        values: Option<Vec<f32>>,
    ) -> Result<()> {
        self.check_values(&probe, values.as_deref())?;
        if let Some(values) = values {
            storage.values.insert(probe.serial(), values.into_boxed_slice());
        }
        storage.probes.push(probe);
        storage.sorted = false;
        Ok(())
    }

    pub(crate) fn check_values(&self, probe: &Probe, values: Option<&[f32]>) -> Result<()> {
        match values {
            Some(values) if values.len() != self.value_names.len() => {
                Err(ModelError::invalid_state(format!(
                    "Added probe {} to list {} with {} values, but {} names were declared",
                    probe.name(),
                    self.name,
                    values.len(),
                    self.value_names.len()
                ))
                .into())
            }
            _ => Ok(()),
        }
    }

    /// All probes of the list, sorted and without duplicates.
    pub fn all_probes(&self) -> Vec<Arc<Probe>> {
        let mut storage = self.lock();
        storage.ensure_sorted(&self.name);
        storage.probes.clone()
    }

    /// Sorted probes located on the given chromosome.
    pub fn probes_for_chromosome(&self, chromosome: &Chromosome) -> Vec<Arc<Probe>> {
        let mut storage = self.lock();
        storage.ensure_sorted(&self.name);
        storage
            .probes
            .iter()
            .filter(|x| **x.chromosome() == *chromosome)
            .cloned()
            .collect()
    }

    /// Number of distinct probes in the list.
    pub fn len(&self) -> usize {
        let mut storage = self.lock();
        storage.ensure_sorted(&self.name);
        storage.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().probes.is_empty()
    }

    pub fn contains(&self, probe: &Probe) -> bool {
        self.lock().probes.iter().any(|x| x.as_ref() == probe)
    }

    /// Values stored for the probe, `None` if the probe was added without values.
    pub fn value_for_probe(&self, probe: &Probe) -> Option<Vec<f32>> {
        self.lock()
            .values
            .get(&probe.serial())
            .map(|x| x.to_vec())
    }

    /// Comma-separated values of the probe, `null` for an empty value vector and an empty string
    /// if the probe has no values in this list.
    ///
    /// Values are written in the shortest form that reads back to the same `f32` and always keep
    /// a fractional part (`1.0`, `12345678.0`, `1e-7`).
    pub fn concatenated_values_for_probe(&self, probe: &Probe) -> String {
        match self.lock().values.get(&probe.serial()) {
            None => String::new(),
            Some(values) if values.is_empty() => "null".to_string(),
            Some(values) => values.iter().map(|x| format!("{x:?}")).join(","),
        }
    }

    /// Case-insensitive comparison of list names.
    pub fn cmp_by_name(&self, other: &ProbeList) -> Ordering {
        self.name.to_lowercase().cmp(&other.name.to_lowercase())
    }

    pub(crate) fn lock(&self) -> ProbeStorageGuard<'_> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) type ProbeStorageGuard<'a> = MutexGuard<'a, ProbeStorage>;

impl std::fmt::Display for ProbeList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.len())
    }
}

fn sanitize_description(description: &str) -> String {
    description.replace(['\t', '\n', '\r'], " ")
}

fn sanitize_value_name(name: &str) -> String {
    let mut name = name.to_string();
    while name.contains(VALUE_NAMES_SEPARATOR) {
        name = name.replace(VALUE_NAMES_SEPARATOR, "%");
    }
    name
}

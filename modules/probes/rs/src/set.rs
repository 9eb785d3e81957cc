use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ahash::AHashSet;
use crossbeam_channel::Receiver;
use eyre::Result;
use impl_tools::autoimpl;

use probekit_core_rs::ModelError;

use crate::events::{EventBus, ProbeSetEvent};
use crate::list::{ListId, ProbeList};
use crate::probe::Probe;

const ROOT_NAME: &str = "All Probes";

/// Data collection that renders or quantitates the active probe list.
#[autoimpl(for<T: trait + ?Sized> &T, Box<T>, Arc<T>)]
pub trait DataCollection: Send + Sync {
    fn active_probe_list_changed(&self, list: ListId);
}

/// Root of the probe list tree ("All Probes").
///
/// The probe set owns every list of the tree in an arena addressed by [`ListId`]; lists only
/// store the ids of their parent and children. The root list holds every probe of the dataset,
/// and adding a probe to the root assigns its storage index. Tree changes are published to
/// subscribers through a single event bus owned by the probe set.
pub struct ProbeSet {
    root: ProbeList,
    // Slot 0 belongs to the root, slots of deleted lists stay empty
    lists: Vec<Option<ProbeList>>,
    expected_size: usize,
    next_index: AtomicUsize,
    active: Option<ListId>,
    collection: Option<Box<dyn DataCollection>>,
    current_quantitation: Option<String>,
    events: EventBus,
}

impl ProbeSet {
    /// Empty probe set for streaming import of the given number of probes.
    pub fn new(description: &str, expected_size: usize) -> Self {
        Self {
            root: ProbeList::new(ListId::ROOT, None, ROOT_NAME, description, Vec::new()),
            lists: vec![None],
            expected_size,
            next_index: AtomicUsize::new(0),
            active: None,
            collection: None,
            current_quantitation: None,
            events: EventBus::new(),
        }
    }

    pub fn builder() -> ProbeSetBuilder {
        ProbeSetBuilder::default()
    }

    /// Probe set holding the given probes, indexed in the array order.
    pub fn from_probes(
        description: &str,
        probes: impl IntoIterator<Item = Arc<Probe>>,
    ) -> Result<Self> {
        Self::builder()
            .description(description)
            .probes(probes)
            .build()
    }

    /// Add a probe to the root list and assign it the next storage index.
    pub fn add_probe(&self, probe: Arc<Probe>, values: Option<Vec<f32>>) -> Result<()> {
        let mut storage = self.root.lock();
        self.root.check_values(&probe, values.as_deref())?;

        // The root lock serializes index assignment
        let index = self.next_index.load(Ordering::Acquire);
        assign_index(&probe, index)?;
        self.next_index.store(index + 1, Ordering::Release);

        self.root.add_probe_locked(&mut storage, probe, values)
    }

    /// Add an already indexed probe to a list of the tree.
    pub fn add_probe_to(
        &self,
        list: ListId,
        probe: Arc<Probe>,
        values: Option<Vec<f32>>,
    ) -> Result<()> {
        if list == ListId::ROOT {
            return self.add_probe(probe, values);
        }
        self.list(list)?.add_probe(probe, values)
    }

    /// Create a new empty list under `parent`.
    pub fn create_list(
        &mut self,
        parent: ListId,
        name: impl Into<String>,
        description: &str,
        value_names: &[&str],
    ) -> Result<ListId> {
        self.list(parent)?;

        let id = ListId::new(self.lists.len());
        let value_names = value_names.iter().map(|x| x.to_string()).collect();
        let list = ProbeList::new(id, Some(parent), name, description, value_names);
        self.list_mut(parent)?.add_child(id);
        self.lists.push(Some(list));

        self.events.publish(ProbeSetEvent::ListAdded(id));
        Ok(id)
    }

    pub fn rename_list(&mut self, list: ListId, name: impl Into<String>) -> Result<()> {
        self.list_mut(list)?.set_name(name);
        self.events.publish(ProbeSetEvent::ListRenamed(list));
        Ok(())
    }

    /// Delete a list together with all lists below it.
    ///
    /// Subscribers are notified while the list is still linked into the tree. The active list is
    /// reset to the root if it was part of the deleted subtree.
    pub fn delete_list(&mut self, list: ListId) -> Result<()> {
        if list == ListId::ROOT {
            return Err(ModelError::invalid_argument(
                "The root list can't be deleted on its own, delete the probe set instead",
            )
            .into());
        }

        // Every list except the root has a parent
        let parent = self.list(list)?.parent().unwrap_or(ListId::ROOT);
        let position = self
            .list(parent)?
            .children()
            .iter()
            .position(|x| *x == list)
            .unwrap_or_default();
        let subtree: Vec<ListId> = self
            .all_probe_lists_from(list)?
            .iter()
            .map(|x| x.id())
            .collect();

        self.events.publish(ProbeSetEvent::ListRemoved {
            list,
            parent,
            position,
        });

        self.list_mut(parent)?.remove_child(list);
        for id in &subtree {
            if let Some(slot) = self.lists.get_mut(id.get()) {
                *slot = None;
            }
        }
        log::debug!(
            "Deleted probe list {list} with {} nested lists",
            subtree.len() - 1
        );

        if self.active.is_some_and(|x| subtree.contains(&x)) {
            self.active = None;
            self.events.publish(ProbeSetEvent::ActiveListChanged(None));
        }
        Ok(())
    }

    /// Tear down the whole tree: all lists, subscribers and the collection link are dropped.
    pub fn delete(mut self) {
        log::debug!(
            "Deleting probe set {} with {} lists",
            self.root.description(),
            self.lists.iter().flatten().count() + 1
        );
        self.events.clear();
        self.collection = None;
        self.lists.clear();
    }

    pub fn root(&self) -> &ProbeList {
        &self.root
    }

    pub fn list(&self, list: ListId) -> Result<&ProbeList> {
        if list == ListId::ROOT {
            return Ok(&self.root);
        }
        self.lists
            .get(list.get())
            .and_then(|x| x.as_ref())
            .ok_or_else(|| missing_list(list))
    }

    pub fn list_mut(&mut self, list: ListId) -> Result<&mut ProbeList> {
        if list == ListId::ROOT {
            return Ok(&mut self.root);
        }
        self.lists
            .get_mut(list.get())
            .and_then(|x| x.as_mut())
            .ok_or_else(|| missing_list(list))
    }

    pub fn children(&self, list: ListId) -> Result<Vec<&ProbeList>> {
        self.list(list)?
            .children()
            .iter()
            .map(|x| self.list(*x))
            .collect()
    }

    pub fn parent(&self, list: ListId) -> Result<Option<&ProbeList>> {
        self.list(list)?
            .parent()
            .map(|x| self.list(x))
            .transpose()
    }

    /// Every list of the tree in pre-order, starting with the root. Sibling order is the creation
    /// order, so repeated calls always return lists in the same order.
    pub fn all_probe_lists(&self) -> Vec<&ProbeList> {
        let mut lists = Vec::new();
        self.collect_lists(&self.root, &mut lists);
        lists
    }

    /// The given list followed by every list below it, in pre-order.
    pub fn all_probe_lists_from(&self, list: ListId) -> Result<Vec<&ProbeList>> {
        let mut lists = Vec::new();
        self.collect_lists(self.list(list)?, &mut lists);
        Ok(lists)
    }

    fn collect_lists<'a>(&'a self, list: &'a ProbeList, saveto: &mut Vec<&'a ProbeList>) {
        saveto.push(list);
        for child in list.children() {
            // Children are always unlinked before their slot is freed
            if let Ok(child) = self.list(*child) {
                self.collect_lists(child, saveto);
            }
        }
    }

    /// Expected total number of probes in the set.
    pub fn size(&self) -> usize {
        self.expected_size
    }

    pub fn just_description(&self) -> &str {
        self.root.description()
    }

    /// Description of the set including the current quantitation, if any.
    pub fn description(&self) -> String {
        match &self.current_quantitation {
            Some(quantitation) => format!(
                "{}. Quantitated with {}",
                self.root.description(),
                quantitation
            ),
            None => self.root.description().clone(),
        }
    }

    pub fn set_description(&mut self, description: &str) {
        self.root.set_description(description);
    }

    pub fn current_quantitation(&self) -> Option<&str> {
        self.current_quantitation.as_deref()
    }

    pub fn set_current_quantitation(&mut self, quantitation: Option<String>) {
        self.current_quantitation = quantitation;
    }

    /// Make the list active and notify the data collection. `None` falls back to the root.
    pub fn set_active_list(&mut self, list: Option<ListId>) -> Result<()> {
        if let Some(list) = list {
            self.list(list)?;
            if let Some(collection) = &self.collection {
                collection.active_probe_list_changed(list);
            }
        }
        self.active = list;
        self.events.publish(ProbeSetEvent::ActiveListChanged(list));
        Ok(())
    }

    /// The active list, the root unless another list was made active.
    pub fn active_list(&self) -> &ProbeList {
        self.active
            .and_then(|x| self.list(x).ok())
            .unwrap_or(&self.root)
    }

    pub fn set_collection(&mut self, collection: impl DataCollection + 'static) {
        self.collection = Some(Box::new(collection));
    }

    /// Receive all future tree events of this probe set.
    pub fn subscribe(&self) -> Receiver<ProbeSetEvent> {
        self.events.subscribe()
    }
}

impl Debug for ProbeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSet")
            .field("description", &self.description())
            .field("expected_size", &self.expected_size)
            .field("lists", &(self.lists.iter().flatten().count() + 1))
            .field("active", &self.active)
            .field("subscribers", &self.events.subscribers())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ProbeSetBuilder {
    description: String,
    expected_size: Option<usize>,
    probes: Vec<Arc<Probe>>,
}

impl ProbeSetBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Expected number of probes for streaming import. Ignored when probes are given upfront.
    pub fn expected_size(mut self, expected_size: usize) -> Self {
        self.expected_size = Some(expected_size);
        self
    }

    pub fn probes(mut self, probes: impl IntoIterator<Item = Arc<Probe>>) -> Self {
        self.probes.extend(probes);
        self
    }

    pub fn build(self) -> Result<ProbeSet> {
        let expected_size = match self.probes.len() {
            0 => self.expected_size.unwrap_or(0),
            size => size,
        };

        validate_bulk_indices(&self.probes)?;

        let set = ProbeSet::new(&self.description, expected_size);
        for probe in self.probes {
            set.add_probe(probe, None)?;
        }
        Ok(set)
    }
}

// Probes restored with a known index keep it as long as it matches their position
fn assign_index(probe: &Probe, index: usize) -> Result<()> {
    match probe.index() {
        Some(existing) if existing == index => Ok(()),
        _ => probe.set_index(i64::try_from(index)?),
    }
}

// Bulk construction assigns index `i` to the i-th probe. Everything that would make it fail halfway
// is rejected before any index is assigned.
fn validate_bulk_indices(probes: &[Arc<Probe>]) -> Result<()> {
    let mut seen = AHashSet::with_capacity(probes.len());
    for (index, probe) in probes.iter().enumerate() {
        if !seen.insert(probe.serial()) {
            return Err(ModelError::invalid_state(format!(
                "Probe {} is listed more than once, can't assign it index {index}",
                probe.name()
            ))
            .into());
        }
        if let Some(existing) = probe.index().filter(|x| *x != index) {
            return Err(ModelError::invalid_state(format!(
                "Probe {} has index {existing}, but is placed at position {index}",
                probe.name()
            ))
            .into());
        }
    }
    Ok(())
}

fn missing_list(list: ListId) -> eyre::Report {
    ModelError::invalid_argument(format!("Probe list {list} doesn't exist in the probe set")).into()
}

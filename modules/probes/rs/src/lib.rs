pub use events::{EventBus, ProbeSetEvent};
pub use filters::{ProbeStrandFilter, QuantitationStrand, QuantitationStrandType};
pub use list::{ListId, ProbeList};
pub use probe::{Probe, ProbeBuilder};
pub use set::{DataCollection, ProbeSet, ProbeSetBuilder};

mod events;
mod filters;
mod list;
mod probe;
mod set;

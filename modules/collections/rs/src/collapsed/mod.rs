pub use collapsed::{CollapsedReads, CollapsedReadsBuilder};
pub use merge::merge;

#[allow(clippy::module_inception)]
mod collapsed;
mod merge;

pub use chromosome::Chromosome;
pub use genome::Genome;
pub use packed::{format_length, fragment_length, sort, sort_paired, PackedInterval, PackedOp};
pub use strand::Strand;

mod chromosome;
mod genome;
mod packed;
mod strand;

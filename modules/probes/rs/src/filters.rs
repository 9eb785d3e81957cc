use derive_more::Display;
use eyre::Report;

use probekit_core_rs::loc::{PackedInterval, PackedOp, Strand};
use probekit_core_rs::ModelError;

/// Which reads are counted when quantitating a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum QuantitationStrandType {
    #[display("All Reads")]
    All,
    #[display("Forward Only")]
    ForwardOnly,
    #[display("Reverse Only")]
    ReverseOnly,
    #[display("Unknown Only")]
    UnknownOnly,
    #[display("Forward or Reverse")]
    ForwardOrReverse,
    #[display("Same Strand as Probe")]
    SameStrandAsProbe,
    #[display("Opposite Strand to Probe")]
    OppositeStrandToProbe,
}

impl QuantitationStrandType {
    /// All types in the order they are offered to the user.
    pub const OPTIONS: [Self; 7] = [
        Self::All,
        Self::ForwardOnly,
        Self::ReverseOnly,
        Self::UnknownOnly,
        Self::ForwardOrReverse,
        Self::SameStrandAsProbe,
        Self::OppositeStrandToProbe,
    ];

    /// Stable integer tag used in saved projects.
    pub fn tag(&self) -> i32 {
        match self {
            Self::All => 99,
            Self::ForwardOnly => 100,
            Self::ReverseOnly => 101,
            Self::UnknownOnly => 102,
            Self::ForwardOrReverse => 103,
            Self::SameStrandAsProbe => 104,
            Self::OppositeStrandToProbe => 105,
        }
    }

    /// Whether a read on the given strand passes the filter for a probe on `probe` strand.
    pub fn accepts(&self, probe: Strand, read: Strand) -> bool {
        match self {
            Self::All => true,
            Self::ForwardOnly => read == Strand::Forward,
            Self::ReverseOnly => read == Strand::Reverse,
            Self::UnknownOnly => read == Strand::Unknown,
            Self::ForwardOrReverse => read.is_known(),
            Self::SameStrandAsProbe => read == probe,
            Self::OppositeStrandToProbe => read.is_known() && probe.is_known() && read != probe,
        }
    }
}

impl TryFrom<i32> for QuantitationStrandType {
    type Error = Report;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::OPTIONS
            .into_iter()
            .find(|x| x.tag() == value)
            .ok_or_else(|| {
                ModelError::invalid_argument(format!("Unknown quantitation type {value}")).into()
            })
    }
}

/// Stateful read filter applied while quantitating a single probe.
///
/// With `ignore_duplicates` set, a read identical to the last accepted one is rejected. Call
/// [`Self::reset_last_read`] when moving on to the next probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantitationStrand {
    kind: QuantitationStrandType,
    ignore_duplicates: bool,
    last_read: Option<PackedInterval>,
}

impl QuantitationStrand {
    pub fn new(kind: QuantitationStrandType) -> Self {
        Self {
            kind,
            ignore_duplicates: false,
            last_read: None,
        }
    }

    pub fn kind(&self) -> QuantitationStrandType {
        self.kind
    }

    pub fn ignore_duplicates(&self) -> bool {
        self.ignore_duplicates
    }

    pub fn set_ignore_duplicates(&mut self, ignore_duplicates: bool) -> &mut Self {
        self.ignore_duplicates = ignore_duplicates;
        self
    }

    pub fn use_read(&mut self, probe: &impl PackedOp, read: PackedInterval) -> bool {
        if self.ignore_duplicates && self.last_read == Some(read) {
            return false;
        }
        let accepted = self.kind.accepts(probe.strand(), read.strand());
        if accepted {
            self.last_read = Some(read);
        }
        accepted
    }

    pub fn reset_last_read(&mut self) {
        self.last_read = None;
    }
}

impl std::fmt::Display for QuantitationStrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Which probes are kept by strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ProbeStrandFilter {
    #[display("All Probes")]
    All,
    #[display("Forward Only")]
    ForwardOnly,
    #[display("Reverse Only")]
    ReverseOnly,
    #[display("Unknown Only")]
    UnknownOnly,
    #[display("Forward or Reverse")]
    ForwardOrReverse,
}

impl ProbeStrandFilter {
    pub const OPTIONS: [Self; 5] = [
        Self::All,
        Self::ForwardOnly,
        Self::ReverseOnly,
        Self::UnknownOnly,
        Self::ForwardOrReverse,
    ];

    pub fn tag(&self) -> i32 {
        match self {
            Self::All => 99,
            Self::ForwardOnly => 100,
            Self::ReverseOnly => 101,
            Self::UnknownOnly => 102,
            Self::ForwardOrReverse => 103,
        }
    }

    pub fn use_probe(&self, probe: &impl PackedOp) -> bool {
        let strand = probe.strand();
        match self {
            Self::All => true,
            Self::ForwardOnly => strand == Strand::Forward,
            Self::ReverseOnly => strand == Strand::Reverse,
            Self::UnknownOnly => strand == Strand::Unknown,
            Self::ForwardOrReverse => strand.is_known(),
        }
    }
}

impl TryFrom<i32> for ProbeStrandFilter {
    type Error = Report;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::OPTIONS
            .into_iter()
            .find(|x| x.tag() == value)
            .ok_or_else(|| {
                ModelError::invalid_argument(format!("Unknown probe strand type {value}")).into()
            })
    }
}

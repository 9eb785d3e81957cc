use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// Assembly chromosome shared by every probe and read located on it.
///
/// Chromosomes are identified by their name. The length is only ever extended: importers set it
/// to the largest coordinate they have seen, and annotation files may later report a larger one.
#[derive(Debug)]
pub struct Chromosome {
    name: String,
    length: AtomicU32,
}

impl Chromosome {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_length(name, 0)
    }

    pub fn with_length(name: impl Into<String>, length: u32) -> Self {
        Self {
            name: name.into(),
            length: AtomicU32::new(length),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Known length of the chromosome, 0 if nothing is known yet.
    pub fn length(&self) -> u32 {
        self.length.load(AtomicOrdering::Relaxed)
    }

    /// Extend the chromosome to `length`. Shorter lengths are ignored.
    pub fn set_length(&self, length: u32) -> u32 {
        self.length
            .fetch_max(length, AtomicOrdering::Relaxed)
            .max(length)
    }

    // Artificial chromosomes built by hand are prefixed with 'pseudo', it's ignored for ordering
    fn sort_name(&self) -> &str {
        self.name.strip_prefix("pseudo").unwrap_or(&self.name)
    }
}

impl Clone for Chromosome {
    fn clone(&self) -> Self {
        Self::with_length(self.name.clone(), self.length())
    }
}

impl PartialEq for Chromosome {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Chromosome {}

impl Hash for Chromosome {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Chromosome {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Numbered chromosomes come first in numeric order, named ones follow in lexical order.
impl Ord for Chromosome {
    fn cmp(&self, other: &Self) -> Ordering {
        let (this, that) = (self.sort_name(), other.sort_name());
        let ordering = match (this.parse::<i64>(), that.parse::<i64>()) {
            (Ok(this), Ok(that)) => this.cmp(&that),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => this.cmp(that),
        };
        ordering.then_with(|| self.name.cmp(&other.name))
    }
}

impl Display for Chromosome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chromosome_length_only_grows() {
        let chr = Chromosome::new("1");
        assert_eq!(chr.length(), 0);
        assert_eq!(chr.set_length(100), 100);
        assert_eq!(chr.set_length(50), 100);
        assert_eq!(chr.length(), 100);
        assert_eq!(chr.set_length(150), 150);
    }

    #[test]
    fn test_chromosome_ordering() {
        let mut chromosomes: Vec<_> = ["X", "10", "2", "pseudo3", "MT", "1", "Y"]
            .into_iter()
            .map(Chromosome::new)
            .collect();
        chromosomes.sort();
        let names: Vec<_> = chromosomes.iter().map(|x| x.name()).collect();
        assert_eq!(names, ["1", "2", "pseudo3", "10", "MT", "X", "Y"]);
    }

    #[test]
    fn test_chromosome_ordering_consistent_with_eq() {
        let plain = Chromosome::new("1");
        let pseudo = Chromosome::new("pseudo1");
        assert_ne!(plain, pseudo);
        assert_ne!(plain.cmp(&pseudo), Ordering::Equal);
        assert_eq!(plain.cmp(&Chromosome::with_length("1", 10)), Ordering::Equal);
    }
}

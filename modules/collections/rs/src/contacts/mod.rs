pub use hits::InterChromosomeHitStore;

mod hits;

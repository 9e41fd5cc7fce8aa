//! Text simplification data handling crate

pub mod corpora;
pub mod tiers;

// Re-export main types
pub use corpora::{ParallelCorpus, SentencePair};
pub use tiers::{Tier, TierPair};

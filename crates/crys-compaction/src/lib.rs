//! # crys-compaction
//!
//! Compaction for the Crystalizer.
//!
//! This crate provides:
//! - Pointer resolution: how many trailing shards the head hides
//! - Retention resolution: how many visible shards must stay unfolded
//! - The memoized [`Compactor`] that folds everything older into the crystal
//!
//! ## Ordering of the split
//!
//! 1. The head window is removed from consideration and never folded
//! 2. Retention is evaluated against the remaining visible shards
//! 3. The oldest visible shards beyond the retained count are folded, in order
//!
//! ## Example
//!
//! ```rust,ignore
//! use crys_compaction::{Compactor, Snapshot};
//!
//! let compactor = Compactor::new(config, Arc::new(Snapshot::new(0, shards)), Head::top());
//! let generated = compactor.consume(None)?;
//! ```

mod compactor;
mod pointer;
mod retention;

pub use compactor::{CompactionPlan, CompactionStats, Compactor, Generated, Snapshot};
pub use pointer::resolve_pointer;
pub use retention::{resolve_keep, RetentionScope};

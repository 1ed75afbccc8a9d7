//! # crys-engine
//!
//! The persistent [`Crystalizer`] facade.
//!
//! A Crystalizer keeps a crystal (the folded aggregate) plus an ordered log
//! of shards. Modifications are recorded as pending operations and only
//! applied by [`Crystalizer::harden`], which builds on the compacted state of
//! the previous instance. Reads run a memoized compaction that folds the
//! oldest visible shards, as far as the retention policy allows, while the
//! head window always stays unfolded.

pub mod crystalizer;
pub mod ops;

pub use crystalizer::{Crystalizer, Take};
pub use ops::Op;

pub use crys_compaction::{CompactionStats, Snapshot};
pub use crys_core::{
    selector, Clock, Config, ConfigBuilder, Crystal, CrystalError, Direction, ErrorKind, FieldValue, Head,
    Keep, Result, Settings, Shard, Sort, SortKey, SystemClock, Timestamp,
};

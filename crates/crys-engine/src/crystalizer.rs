//! The persistent Crystalizer facade.
//!
//! Every modifying call returns a new instance that shares the resolved
//! state of the instance it came from and layers one pending operation on
//! top. Reads need a hardened instance: `harden()` applies the pending
//! operations to the compacted state and starts a fresh memo.
//!
//! ```rust,ignore
//! let c = Crystalizer::new(config)
//!     .with_all(shards)
//!     .with_head_at(-2)
//!     .harden()?;
//!
//! let total = c.as_crystal()?;
//! ```

use crate::ops::{apply_ops, push_op, Op};
use crys_compaction::{resolve_pointer, CompactionStats, Compactor, Generated, Snapshot};
use crys_core::{Config, Crystal, CrystalError, Head, Result, Shard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Result of [`Crystalizer::take`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Take<C, S> {
    /// Everything visible folded together.
    pub crystal: C,
    /// Shards kept unfolded.
    pub shards: Vec<S>,
    /// The crystal before the kept shards.
    pub partial: C,
}

/// Incremental reducer over an ordered shard log.
pub struct Crystalizer<C, S> {
    config: Arc<Config<C, S>>,
    resolved: Arc<Compactor<C, S>>,
    head: Head<S>,
    pending: Vec<Op<S>>,
}

impl<C: Crystal, S: Shard> Crystalizer<C, S> {
    /// A hardened, empty Crystalizer starting from the configured initial crystal.
    pub fn new(config: Config<C, S>) -> Self {
        let crystal = config.initial().clone();
        Self::from_parts(Arc::new(config), Snapshot::new(crystal, Vec::new()))
    }

    /// Resume from a previously produced crystal and shard log.
    ///
    /// The shards are sorted but not mapped or stamped again.
    pub fn resume(config: Config<C, S>, crystal: C, mut shards: Vec<S>) -> Self {
        config.sort(&mut shards);
        Self::from_parts(Arc::new(config), Snapshot::new(crystal, shards))
    }

    fn from_parts(config: Arc<Config<C, S>>, base: Snapshot<C, S>) -> Self {
        let head = Head::top();
        let resolved = Compactor::new(Arc::clone(&config), Arc::new(base), head.clone());
        Crystalizer {
            config,
            resolved: Arc::new(resolved),
            head,
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config<C, S> {
        &self.config
    }

    /// The head pointer as currently specified.
    pub fn head(&self) -> &Head<S> {
        &self.head
    }

    /// Whether there are no pending modifications.
    pub fn is_hardened(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending modifications (consecutive appends count once).
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn layer(&self, op: Op<S>, head: Head<S>) -> Self {
        let mut pending = self.pending.clone();
        push_op(&mut pending, op);
        Crystalizer {
            config: Arc::clone(&self.config),
            resolved: Arc::clone(&self.resolved),
            head,
            pending,
        }
    }

    fn reposition(&self, head: Head<S>) -> Self {
        self.layer(Op::Reposition(head.clone()), head)
    }

    /// After a write, absolute heads return to the top; focus survives.
    fn head_after_write(&self) -> Head<S> {
        match &self.head {
            Head::Absolute(_) => Head::top(),
            seek => seek.clone(),
        }
    }

    /// Append one shard.
    pub fn with(&self, shard: S) -> Self {
        self.with_all([shard])
    }

    /// Append shards. Each is mapped and stamped once, now.
    ///
    /// Under an absolute head pointing into the past, the head window is
    /// discarded first.
    pub fn with_all<I>(&self, shards: I) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        let shards = shards.into_iter().map(|s| self.config.prepare(s)).collect();
        let op = Op::With {
            shards,
            head: self.head.clone(),
        };
        self.layer(op, self.head_after_write())
    }

    /// Remove every shard matching `select`.
    pub fn without<F>(&self, select: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        let op = Op::Without {
            select: Arc::new(select),
            head: self.head.clone(),
        };
        self.layer(op, self.head_after_write())
    }

    /// Hide the last `count` shards from compaction. Clears any focus.
    pub fn leave(&self, count: usize) -> Self {
        let distance = i64::try_from(count).unwrap_or(i64::MAX);
        self.reposition(Head::Absolute(distance))
    }

    /// Like [`leave`](Self::leave), computed from the current head window size.
    pub fn leave_with<F>(&self, f: F) -> Result<Self>
    where
        F: FnOnce(usize) -> usize,
    {
        let current = self.head_window_len()?;
        Ok(self.leave(f(current)))
    }

    /// Point the head at the first shard matching `seek`.
    pub fn focus<F>(&self, seek: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.reposition(Head::Seek(Arc::new(seek)))
    }

    /// Place the head relative to the most recent shard: negative values
    /// move into the past, positive values toward the future.
    pub fn with_head_at(&self, offset: i64) -> Self {
        self.reposition(Head::Absolute(offset.saturating_neg()))
    }

    /// Move the head back to the most recent shard.
    pub fn with_head_top(&self) -> Self {
        self.reposition(Head::top())
    }

    /// Move an absolute head by `delta`, with the sign convention of
    /// [`with_head_at`](Self::with_head_at).
    pub fn with_head_inc(&self, delta: i64) -> Result<Self> {
        match &self.head {
            Head::Absolute(distance) => {
                Ok(self.reposition(Head::Absolute(distance.saturating_sub(delta))))
            }
            Head::Seek(_) => Err(CrystalError::SeekIncrement),
        }
    }

    /// Apply pending modifications on top of the compacted state.
    pub fn harden(&self) -> Result<Self> {
        if self.is_hardened() {
            return Ok(self.clone());
        }

        let base = self.resolved.consume_clamped(None)?.to_snapshot();
        tracing::debug!(
            pending = self.pending.len(),
            base_len = base.len(),
            head = ?self.head,
            "hardening pending modifications"
        );
        let next = apply_ops(&self.config, base, &self.pending)?;

        Ok(Self {
            config: Arc::clone(&self.config),
            resolved: Arc::new(Compactor::new(
                Arc::clone(&self.config),
                Arc::new(next),
                self.head.clone(),
            )),
            head: self.head.clone(),
            pending: Vec::new(),
        })
    }

    fn generated(&self) -> Result<Arc<Generated<C, S>>> {
        if !self.is_hardened() {
            return Err(CrystalError::NotHardened);
        }
        self.resolved.consume(None)
    }

    /// Compact, retaining at most `limit` visible shards (and never more
    /// than the retention policy allows). Hardens first if needed.
    pub fn take(&self, limit: Option<usize>) -> Result<Take<C, S>> {
        let hardened = self.harden()?;
        let generated = hardened.resolved.consume(limit)?;
        let retained = generated.retained();

        Ok(Take {
            crystal: self.config.fold(generated.crystal.clone(), retained),
            shards: retained.to_vec(),
            partial: generated.crystal.clone(),
        })
    }

    /// The crystal with only the compacted shards folded in.
    pub fn partial_crystal(&self) -> Result<C> {
        Ok(self.generated()?.crystal.clone())
    }

    /// The visible shards left unfolded.
    pub fn partial_shards(&self) -> Result<Vec<S>> {
        Ok(self.generated()?.retained().to_vec())
    }

    /// The crystal with every visible shard folded in.
    pub fn as_crystal(&self) -> Result<C> {
        let generated = self.generated()?;
        Ok(self.config.fold(generated.crystal.clone(), generated.retained()))
    }

    /// The most recent visible shard still unfolded, if any.
    pub fn last(&self) -> Result<Option<S>> {
        Ok(self.generated()?.retained().last().cloned())
    }

    /// Shards hidden by the head pointer.
    pub fn head_window(&self) -> Result<Vec<S>> {
        Ok(self.generated()?.head_window().to_vec())
    }

    /// The compacted crystal and every unfolded shard, head window included.
    pub fn snapshot(&self) -> Result<Snapshot<C, S>> {
        Ok(self.generated()?.to_snapshot())
    }

    pub fn stats(&self) -> Result<CompactionStats> {
        if !self.is_hardened() {
            return Err(CrystalError::NotHardened);
        }
        self.resolved.stats()
    }

    /// Size of the head window the current head resolves to.
    fn head_window_len(&self) -> Result<usize> {
        let strict = self.config.strict_bounds();
        if self.is_hardened() {
            return resolve_pointer(&self.head, &self.resolved.base().shards, strict);
        }
        let base = self.resolved.consume_clamped(None)?.to_snapshot();
        let log = apply_ops(&self.config, base, &self.pending)?;
        resolve_pointer(&self.head, &log.shards, strict)
    }
}

impl<C, S> Clone for Crystalizer<C, S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Crystalizer {
            config: Arc::clone(&self.config),
            resolved: Arc::clone(&self.resolved),
            head: self.head.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<C, S> fmt::Debug for Crystalizer<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crystalizer")
            .field("config", &self.config)
            .field("head", &self.head)
            .field("pending", &self.pending)
            .finish()
    }
}

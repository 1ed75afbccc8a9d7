//! Memoized compaction.
//!
//! A [`Compactor`] is bound to one base [`Snapshot`] and one head pointer.
//! Each request resolves the pointer and the retention tree into a
//! [`CompactionPlan`], folds the oldest visible shards into the crystal and
//! caches the result under the plan's retained count.

use crate::pointer::resolve_pointer;
use crate::retention::{resolve_keep, RetentionScope};
use crys_core::{Config, Crystal, Head, Result, Shard};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An aggregate together with the sorted shards not yet folded into it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<C, S> {
    pub crystal: C,
    pub shards: Vec<S>,
}

impl<C, S> Snapshot<C, S> {
    pub fn new(crystal: C, shards: Vec<S>) -> Self {
        Snapshot { crystal, shards }
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

/// How a compaction splits the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionPlan {
    /// Shards in the base log.
    pub total: usize,

    /// Trailing shards hidden by the head pointer. Never folded.
    pub head_window: usize,

    /// Visible shards left unfolded.
    pub retain: usize,

    /// Oldest visible shards folded into the crystal.
    pub fold: usize,
}

impl CompactionPlan {
    pub fn visible(&self) -> usize {
        self.total - self.head_window
    }
}

/// Result of a compaction.
///
/// `shards` holds the retained shards followed by the head window, so the
/// pair can serve as the base of the next compaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generated<C, S> {
    pub crystal: C,
    pub shards: Vec<S>,
    pub plan: CompactionPlan,
}

impl<C: Crystal, S: Shard> Generated<C, S> {
    /// Visible shards that were kept unfolded.
    ///
    /// Empty if the plan does not fit the shards, as a hand-edited
    /// deserialized value may not.
    pub fn retained(&self) -> &[S] {
        self.shards.get(..self.plan.retain).unwrap_or(&[])
    }

    /// Shards hidden by the head pointer.
    pub fn head_window(&self) -> &[S] {
        self.shards.get(self.plan.retain..).unwrap_or(&[])
    }

    /// The state a later modification builds on.
    pub fn to_snapshot(&self) -> Snapshot<C, S> {
        Snapshot::new(self.crystal.clone(), self.shards.clone())
    }
}

/// Counters describing a compactor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionStats {
    pub folded: usize,
    pub retained: usize,
    pub head_window: usize,
    pub memo_entries: usize,
}

/// Memoized compactor over a fixed base log.
pub struct Compactor<C, S> {
    config: Arc<Config<C, S>>,
    base: Arc<Snapshot<C, S>>,
    head: Head<S>,
    memo: RwLock<BTreeMap<usize, Arc<Generated<C, S>>>>,
}

impl<C: Crystal, S: Shard> Compactor<C, S> {
    pub fn new(config: Arc<Config<C, S>>, base: Arc<Snapshot<C, S>>, head: Head<S>) -> Self {
        Compactor {
            config,
            base,
            head,
            memo: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &Arc<Config<C, S>> {
        &self.config
    }

    pub fn base(&self) -> &Arc<Snapshot<C, S>> {
        &self.base
    }

    pub fn head(&self) -> &Head<S> {
        &self.head
    }

    /// Resolve the head and retention into a split of the base log.
    ///
    /// The head window is removed first; retention is evaluated on the
    /// visible shards only, then capped by `wanted` and the visible count.
    pub fn plan(&self, wanted: Option<usize>) -> Result<CompactionPlan> {
        self.plan_with(wanted, self.config.strict_bounds())
    }

    fn plan_with(&self, wanted: Option<usize>, strict_bounds: bool) -> Result<CompactionPlan> {
        let shards = &self.base.shards;
        let total = shards.len();

        let head_window = resolve_pointer(&self.head, shards, strict_bounds)?;
        let visible = &shards[..total - head_window];

        let scope = RetentionScope {
            now: self.config.now(),
            timestamp_key: self.config.timestamp_key(),
            strict_bounds,
        };
        let keep = resolve_keep(self.config.keep(), visible, &scope)?;

        let retain = keep.min(wanted.unwrap_or(usize::MAX)).min(visible.len());

        Ok(CompactionPlan {
            total,
            head_window,
            retain,
            fold: visible.len() - retain,
        })
    }

    /// Compact, reusing a memoized result for the same retained count.
    pub fn consume(&self, wanted: Option<usize>) -> Result<Arc<Generated<C, S>>> {
        let plan = self.plan(wanted)?;
        Ok(self.memoized(plan))
    }

    /// Like [`consume`](Self::consume) but always clamping out-of-range
    /// values. Rebasing onto this compactor's state goes through here, so a
    /// base that is still too short for the policy never blocks new writes.
    pub fn consume_clamped(&self, wanted: Option<usize>) -> Result<Arc<Generated<C, S>>> {
        let plan = self.plan_with(wanted, false)?;
        Ok(self.memoized(plan))
    }

    fn memoized(&self, plan: CompactionPlan) -> Arc<Generated<C, S>> {
        if let Some(hit) = self.memo.read().get(&plan.retain) {
            tracing::trace!(retain = plan.retain, "compaction memo hit");
            return Arc::clone(hit);
        }

        let generated = Arc::new(self.compute(plan));

        // A racing fill for the same key computed an equal value; keep the first.
        let mut memo = self.memo.write();
        Arc::clone(memo.entry(plan.retain).or_insert(generated))
    }

    fn compute(&self, plan: CompactionPlan) -> Generated<C, S> {
        let shards = &self.base.shards;
        let crystal = self.config.fold(self.base.crystal.clone(), &shards[..plan.fold]);

        tracing::debug!(
            total = plan.total,
            folded = plan.fold,
            retained = plan.retain,
            head_window = plan.head_window,
            "compacted shard log"
        );

        Generated {
            crystal,
            shards: shards[plan.fold..].to_vec(),
            plan,
        }
    }

    /// Number of memoized results.
    pub fn memo_len(&self) -> usize {
        self.memo.read().len()
    }

    /// Stats for the default, policy-limited compaction.
    pub fn stats(&self) -> Result<CompactionStats> {
        let plan = self.plan(None)?;
        Ok(CompactionStats {
            folded: plan.fold,
            retained: plan.retain,
            head_window: plan.head_window,
            memo_entries: self.memo_len(),
        })
    }
}

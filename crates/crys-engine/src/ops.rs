//! Pending modifications and how they rewrite the shard log.
//!
//! Writes made while an absolute head points into the past discard the head
//! window first: writing at a point in history drops everything after it.
//! Seek heads do not truncate; they are re-resolved against the new log.

use crys_compaction::{resolve_pointer, Snapshot};
use crys_core::{Config, Crystal, Head, Result, Selector, Shard};
use std::fmt;

/// One not-yet-applied modification.
pub enum Op<S> {
    /// Append already prepared shards. `head` is the pointer at call time.
    With { shards: Vec<S>, head: Head<S> },
    /// Drop matching shards. `head` is the pointer at call time.
    Without { select: Selector<S>, head: Head<S> },
    /// The head moved. No effect on the log itself.
    Reposition(Head<S>),
}

impl<S> Clone for Op<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Op::With { shards, head } => Op::With {
                shards: shards.clone(),
                head: head.clone(),
            },
            Op::Without { select, head } => Op::Without {
                select: select.clone(),
                head: head.clone(),
            },
            Op::Reposition(head) => Op::Reposition(head.clone()),
        }
    }
}

impl<S> fmt::Debug for Op<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::With { shards, head } => write!(f, "With({} shards, {:?})", shards.len(), head),
            Op::Without { head, .. } => write!(f, "Without(<selector>, {:?})", head),
            Op::Reposition(head) => write!(f, "Reposition({:?})", head),
        }
    }
}

/// Whether writing under `head` discards any shards.
fn truncates<S>(head: &Head<S>) -> bool {
    matches!(head, Head::Absolute(d) if *d > 0)
}

/// Append `op`, merging consecutive appends into one batch when the later
/// append cannot truncate anything.
pub fn push_op<S: Shard>(ops: &mut Vec<Op<S>>, op: Op<S>) {
    if let Op::With { shards: incoming, head } = &op {
        if !truncates(head) {
            if let Some(Op::With { shards, .. }) = ops.last_mut() {
                shards.extend(incoming.iter().cloned());
                return;
            }
        }
    }
    ops.push(op);
}

/// Drop the head window when writing under an absolute head.
fn cut_head<S: Shard>(shards: &mut Vec<S>, head: &Head<S>, strict: bool) -> Result<()> {
    if head.is_absolute() {
        let window = resolve_pointer(head, shards, strict)?;
        let keep = shards.len() - window;
        shards.truncate(keep);
    }
    Ok(())
}

/// Apply `ops` in order to `base`, producing the next base log.
pub fn apply_ops<C, S>(config: &Config<C, S>, base: Snapshot<C, S>, ops: &[Op<S>]) -> Result<Snapshot<C, S>>
where
    C: Crystal,
    S: Shard,
{
    let strict = config.strict_bounds();
    let Snapshot { crystal, mut shards } = base;

    for op in ops {
        match op {
            Op::With { shards: incoming, head } => {
                cut_head(&mut shards, head, strict)?;
                shards.extend(incoming.iter().cloned());
                config.sort(&mut shards);
            }
            Op::Without { select, head } => {
                cut_head(&mut shards, head, strict)?;
                shards.retain(|shard| !select(shard));
            }
            Op::Reposition(_) => {}
        }
    }

    Ok(Snapshot::new(crystal, shards))
}

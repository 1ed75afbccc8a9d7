//! Retention resolution.
//!
//! Evaluates a [`Keep`] tree into the number of trailing shards that must
//! stay unfolded. `Min` and `Max` evaluate every child against the same
//! shards and the same "now", then reduce.

use crys_core::{CrystalError, FieldValue, Keep, Result, Shard, Timestamp};

/// Everything besides the shards that retention may depend on.
#[derive(Clone, Copy, Debug)]
pub struct RetentionScope<'a> {
    /// Evaluation time, read once per compaction.
    pub now: Timestamp,
    pub timestamp_key: Option<&'a str>,
    pub strict_bounds: bool,
}

impl RetentionScope<'_> {
    fn nested(&self) -> Self {
        RetentionScope { strict_bounds: false, ..*self }
    }
}

/// Resolve `keep` into a trailing count.
///
/// The result may exceed `shards.len()` for `Count` (clamping is the
/// compactor's job). Strict bounds reject a top-level `Count` larger than
/// the log; inside `Min` and `Max` a count is a cap and is never rejected.
/// An empty `Min` keeps everything and an empty `Max` keeps nothing, the
/// identities of each reduction.
pub fn resolve_keep<S: Shard>(keep: &Keep<S>, shards: &[S], scope: &RetentionScope<'_>) -> Result<usize> {
    let len = shards.len();

    let count = match keep {
        Keep::All => len,
        Keep::None => 0,
        Keep::Count(n) => {
            if scope.strict_bounds && *n > len {
                return Err(CrystalError::KeepOutOfBounds { count: *n, len });
            }
            *n
        }
        Keep::First(select) => shards
            .iter()
            .position(|shard| select(shard))
            .map_or(0, |index| len - index),
        Keep::Since(window) => {
            let key = scope
                .timestamp_key
                .ok_or(CrystalError::SinceWithoutTimestampKey)?;
            let window = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
            let threshold = FieldValue::Int(scope.now.saturating_sub(window));

            // Nothing at or after the threshold: everything is old, keep none.
            shards
                .iter()
                .position(|shard| shard.timestamp(key).is_some_and(|ts| ts >= threshold))
                .map_or(0, |index| len - index)
        }
        Keep::Min(children) => {
            let scope = scope.nested();
            let mut min = len;
            for child in children {
                min = min.min(resolve_keep(child, shards, &scope)?);
            }
            min
        }
        Keep::Max(children) => {
            let scope = scope.nested();
            let mut max = 0;
            for child in children {
                max = max.max(resolve_keep(child, shards, &scope)?);
            }
            max
        }
    };

    Ok(count)
}

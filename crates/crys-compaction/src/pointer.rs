//! Head pointer resolution.
//!
//! A resolved pointer is the number of trailing shards hidden from
//! compaction (the head window).

use crys_core::{CrystalError, Head, Result, Shard};

/// Resolve `head` against `shards` into a head window size in `[0, len]`.
///
/// Absolute distances are clamped unless `strict` is set, in which case an
/// out-of-range distance is a bounds error. A seek that matches nothing falls
/// back to the top of the log.
pub fn resolve_pointer<S: Shard>(head: &Head<S>, shards: &[S], strict: bool) -> Result<usize> {
    let len = shards.len();

    match head {
        Head::Absolute(distance) => {
            let distance = *distance;
            if distance < 0 || distance as u64 > len as u64 {
                if strict {
                    return Err(CrystalError::HeadOutOfBounds { distance, len });
                }
                return Ok(if distance < 0 { 0 } else { len });
            }
            Ok(distance as usize)
        }
        Head::Seek(seek) => match shards.iter().position(|shard| seek(shard)) {
            Some(index) => Ok(len - index - 1),
            None => {
                tracing::warn!(len, "seek pointer matched no shard, falling back to top");
                Ok(0)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crys_core::selector;
    use serde_json::{json, Value};

    fn shards(n: i64) -> Vec<Value> {
        (0..n).map(|id| json!({ "id": id, "value": 2 })).collect()
    }

    #[test]
    fn test_absolute_within_range() {
        let log = shards(10);
        assert_eq!(resolve_pointer(&Head::Absolute(0), &log, false).unwrap(), 0);
        assert_eq!(resolve_pointer(&Head::Absolute(3), &log, false).unwrap(), 3);
        assert_eq!(resolve_pointer(&Head::Absolute(10), &log, true).unwrap(), 10);
    }

    #[test]
    fn test_absolute_clamps() {
        let log = shards(4);
        assert_eq!(resolve_pointer(&Head::Absolute(9), &log, false).unwrap(), 4);
        assert_eq!(resolve_pointer(&Head::Absolute(-2), &log, false).unwrap(), 0);
    }

    #[test]
    fn test_absolute_strict_bounds() {
        let log = shards(4);
        assert_eq!(
            resolve_pointer(&Head::Absolute(5), &log, true).unwrap_err(),
            CrystalError::HeadOutOfBounds { distance: 5, len: 4 }
        );
        assert!(resolve_pointer(&Head::Absolute(-1), &log, true).is_err());
    }

    #[test]
    fn test_seek_is_trailing_distance() {
        let log = shards(20);
        let head: Head<Value> = Head::Seek(selector(|s: &Value| s["id"] == 15));
        assert_eq!(resolve_pointer(&head, &log, false).unwrap(), 4);

        let last: Head<Value> = Head::Seek(selector(|s: &Value| s["id"] == 19));
        assert_eq!(resolve_pointer(&last, &log, false).unwrap(), 0);
    }

    #[test]
    fn test_seek_first_match_wins() {
        let log = vec![json!({ "k": 1 }), json!({ "k": 2 }), json!({ "k": 1 })];
        let head: Head<Value> = Head::Seek(selector(|s: &Value| s["k"] == 1));
        assert_eq!(resolve_pointer(&head, &log, false).unwrap(), 2);
    }

    #[test]
    fn test_seek_miss_falls_back_to_top() {
        let log = shards(5);
        let head: Head<Value> = Head::Seek(selector(|s: &Value| s["id"] == 99));
        assert_eq!(resolve_pointer(&head, &log, true).unwrap(), 0);
        assert_eq!(resolve_pointer(&head, &[], false).unwrap(), 0);
    }
}

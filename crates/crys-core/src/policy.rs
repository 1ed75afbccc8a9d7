//! Retention and head-pointer policies.
//!
//! [`Keep`] decides how many trailing, visible shards must stay unfolded.
//! It is a tree: `Min` and `Max` combine the counts of their children.
//! [`Head`] decides how many of the most recent shards are hidden from
//! compaction altogether.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A predicate over shards.
pub type Selector<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Wrap a closure as a [`Selector`].
pub fn selector<S, F>(f: F) -> Selector<S>
where
    F: Fn(&S) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Retention policy.
pub enum Keep<S> {
    /// Keep every visible shard unfolded.
    All,
    /// Fold everything.
    None,
    /// Keep the last `n` shards.
    Count(usize),
    /// Keep everything from the first matching shard onward.
    First(Selector<S>),
    /// Keep everything stamped at or after `now - duration`.
    Since(Duration),
    /// Smallest count among the children.
    Min(Vec<Keep<S>>),
    /// Largest count among the children.
    Max(Vec<Keep<S>>),
}

impl<S> Keep<S> {
    pub fn first<F>(f: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Keep::First(Arc::new(f))
    }

    /// Whether a `Since` appears anywhere in the tree.
    pub fn uses_time(&self) -> bool {
        match self {
            Keep::Since(_) => true,
            Keep::Min(children) | Keep::Max(children) => children.iter().any(Keep::uses_time),
            _ => false,
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            Keep::Min(children) | Keep::Max(children) => {
                1 + children.iter().map(Keep::size).sum::<usize>()
            }
            _ => 1,
        }
    }
}

impl<S> Default for Keep<S> {
    fn default() -> Self {
        Keep::All
    }
}

impl<S> Clone for Keep<S> {
    fn clone(&self) -> Self {
        match self {
            Keep::All => Keep::All,
            Keep::None => Keep::None,
            Keep::Count(n) => Keep::Count(*n),
            Keep::First(sel) => Keep::First(Arc::clone(sel)),
            Keep::Since(d) => Keep::Since(*d),
            Keep::Min(children) => Keep::Min(children.clone()),
            Keep::Max(children) => Keep::Max(children.clone()),
        }
    }
}

impl<S> fmt::Debug for Keep<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keep::All => write!(f, "All"),
            Keep::None => write!(f, "None"),
            Keep::Count(n) => write!(f, "Count({})", n),
            Keep::First(_) => write!(f, "First(<selector>)"),
            Keep::Since(d) => write!(f, "Since({:?})", d),
            Keep::Min(children) => f.debug_tuple("Min").field(children).finish(),
            Keep::Max(children) => f.debug_tuple("Max").field(children).finish(),
        }
    }
}

/// Where the head points.
///
/// `Absolute` stores a distance from the end of the log: `Absolute(0)` is
/// the most recent shard, `Absolute(2)` hides the last two. The distance is
/// signed so relative moves compose exactly before any clamping happens.
pub enum Head<S> {
    Absolute(i64),
    Seek(Selector<S>),
}

impl<S> Head<S> {
    pub fn top() -> Self {
        Head::Absolute(0)
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, Head::Absolute(_))
    }

    /// The stored distance, for absolute pointers.
    pub fn distance(&self) -> Option<i64> {
        match self {
            Head::Absolute(d) => Some(*d),
            Head::Seek(_) => None,
        }
    }
}

impl<S> Default for Head<S> {
    fn default() -> Self {
        Head::top()
    }
}

impl<S> Clone for Head<S> {
    fn clone(&self) -> Self {
        match self {
            Head::Absolute(d) => Head::Absolute(*d),
            Head::Seek(sel) => Head::Seek(Arc::clone(sel)),
        }
    }
}

impl<S> fmt::Debug for Head<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Head::Absolute(d) => write!(f, "Absolute({})", d),
            Head::Seek(_) => write!(f, "Seek(<selector>)"),
        }
    }
}

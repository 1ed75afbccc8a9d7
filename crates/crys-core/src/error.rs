//! Error types for the Crystalizer.

use thiserror::Error;

/// Which invariant family an error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration can never work.
    Configuration,
    /// The call is invalid for the instance's current state.
    State,
    /// A pointer or retention value was out of range under strict bounds.
    Bounds,
}

/// Errors raised by the Crystalizer. All are synchronous programming errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrystalError {
    #[error("Ambiguous ordering: an explicit sort cannot be combined with a timestamp key")]
    AmbiguousOrdering,

    #[error("Since retention requires a timestamp key")]
    SinceWithoutTimestampKey,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Cannot read hardened values from a Crystalizer with pending modifications")]
    NotHardened,

    #[error("Cannot increment a seek pointer; reset to an absolute pointer first")]
    SeekIncrement,

    #[error("Head distance {distance} out of bounds (length: {len})")]
    HeadOutOfBounds { distance: i64, len: usize },

    #[error("Keep count {count} out of bounds (length: {len})")]
    KeepOutOfBounds { count: usize, len: usize },
}

impl CrystalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrystalError::AmbiguousOrdering
            | CrystalError::SinceWithoutTimestampKey
            | CrystalError::InvalidSettings(_) => ErrorKind::Configuration,
            CrystalError::NotHardened | CrystalError::SeekIncrement => ErrorKind::State,
            CrystalError::HeadOutOfBounds { .. } | CrystalError::KeepOutOfBounds { .. } => {
                ErrorKind::Bounds
            }
        }
    }
}

impl From<serde_json::Error> for CrystalError {
    fn from(err: serde_json::Error) -> Self {
        CrystalError::InvalidSettings(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CrystalError>;

//! # crys-core
//!
//! Leaf types for the Crystalizer, an incremental reduction engine that
//! folds an ordered log of shards into a crystal (aggregate) while keeping a
//! configurable tail of shards unfolded.
//!
//! This crate provides:
//! - [`Shard`] / [`Crystal`]: the capabilities records and aggregates need
//! - [`Keep`] / [`Head`]: retention trees and head pointers
//! - [`Config`] / [`Settings`]: validated construction parameters
//! - [`Clock`]: the injectable time source
//! - [`CrystalError`]: the error taxonomy
//!
//! ## Example
//!
//! ```rust,ignore
//! use crys_core::{Config, Keep};
//! use serde_json::Value;
//!
//! let config = Config::<i64, Value>::builder(0, |acc, s| acc + s["value"].as_i64().unwrap_or(0))
//!     .keep(Keep::Count(5))
//!     .timestamp_key("ts")
//!     .build()?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod policy;
pub mod value;

pub use clock::{Clock, SystemClock};
pub use config::{Comparator, Config, ConfigBuilder, Direction, Mapper, Reducer, Settings, Sort, SortKey};
pub use error::{CrystalError, ErrorKind, Result};
pub use policy::{selector, Head, Keep, Selector};
pub use value::{Crystal, FieldValue, Shard, Timestamp};

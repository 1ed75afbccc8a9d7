//! Construction parameters for a Crystalizer.
//!
//! [`Settings`] is the data-only, serializable part. [`Config`] adds the
//! behaviour (reducer, mapper, retention tree, sort, clock) and is built and
//! validated through [`ConfigBuilder`].

use crate::clock::{Clock, SystemClock};
use crate::error::{CrystalError, Result};
use crate::policy::Keep;
use crate::value::{Crystal, FieldValue, Shard, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Folds one shard into the aggregate. Must be pure.
pub type Reducer<C, S> = Arc<dyn Fn(C, &S) -> C + Send + Sync>;

/// Transforms a shard once, when it is accepted into the log.
pub type Mapper<S> = Arc<dyn Fn(S) -> S + Send + Sync>;

/// Explicit shard ordering.
pub type Comparator<S> = Arc<dyn Fn(&S, &S) -> Ordering + Send + Sync>;

/// Sort direction for a key rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// What a sort rule compares.
pub enum SortKey<S> {
    /// A named scalar field.
    Field(String),
    /// A derived key.
    Fn(Arc<dyn Fn(&S) -> FieldValue + Send + Sync>),
}

impl<S: Shard> SortKey<S> {
    fn extract(&self, shard: &S) -> FieldValue {
        match self {
            SortKey::Field(name) => shard.field(name).unwrap_or(FieldValue::Null),
            SortKey::Fn(f) => f(shard),
        }
    }
}

/// Explicit sort order.
pub enum Sort<S> {
    Comparator(Comparator<S>),
    Keys(Vec<(Direction, SortKey<S>)>),
}

impl<S: Shard> Sort<S> {
    fn compare(&self, a: &S, b: &S) -> Ordering {
        match self {
            Sort::Comparator(cmp) => cmp(a, b),
            Sort::Keys(rules) => {
                for (direction, key) in rules {
                    let ord = key.extract(a).cmp(&key.extract(b));
                    let ord = match direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            }
        }
    }
}

/// Serializable settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Field used to stamp and order shards implicitly.
    pub timestamp_key: Option<String>,

    /// Reject out-of-range head and keep values instead of clamping them.
    pub strict_bounds: bool,
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        match &self.timestamp_key {
            Some(key) if key.is_empty() => Err(CrystalError::InvalidSettings(
                "timestamp_key must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Validated configuration shared by every instance in a lineage.
pub struct Config<C, S> {
    initial: C,
    reducer: Reducer<C, S>,
    mapper: Option<Mapper<S>>,
    keep: Keep<S>,
    sort: Option<Sort<S>>,
    clock: Arc<dyn Clock>,
    settings: Settings,
}

impl<C: Crystal, S: Shard> Config<C, S> {
    /// Start building a configuration from the two required parts.
    pub fn builder<F>(initial: C, reducer: F) -> ConfigBuilder<C, S>
    where
        F: Fn(C, &S) -> C + Send + Sync + 'static,
    {
        ConfigBuilder {
            initial,
            reducer: Arc::new(reducer),
            mapper: None,
            keep: Keep::All,
            sort: None,
            clock: Arc::new(SystemClock),
            settings: Settings::default(),
        }
    }

    pub fn initial(&self) -> &C {
        &self.initial
    }

    pub fn keep(&self) -> &Keep<S> {
        &self.keep
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn timestamp_key(&self) -> Option<&str> {
        self.settings.timestamp_key.as_deref()
    }

    pub fn strict_bounds(&self) -> bool {
        self.settings.strict_bounds
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Fold `shards` into `crystal`, in order.
    pub fn fold<'a, I>(&self, crystal: C, shards: I) -> C
    where
        I: IntoIterator<Item = &'a S>,
    {
        shards
            .into_iter()
            .fold(crystal, |acc, shard| (self.reducer)(acc, shard))
    }

    /// Map a freshly written shard and stamp it if it lacks a timestamp.
    pub fn prepare(&self, shard: S) -> S {
        let mut shard = match &self.mapper {
            Some(map) => map(shard),
            None => shard,
        };
        if let Some(key) = self.timestamp_key() {
            if !shard.has_field(key) {
                shard.set_field(key, FieldValue::Int(self.now()));
            }
        }
        shard
    }

    /// Compare two shards by the configured ordering.
    ///
    /// The implicit timestamp rule comes first, then any explicit sort.
    pub fn compare(&self, a: &S, b: &S) -> Ordering {
        let by_time = match self.timestamp_key() {
            Some(key) => a.timestamp(key).cmp(&b.timestamp(key)),
            None => Ordering::Equal,
        };
        by_time.then_with(|| match &self.sort {
            Some(sort) => sort.compare(a, b),
            None => Ordering::Equal,
        })
    }

    /// Whether any ordering is configured at all.
    pub fn is_ordered(&self) -> bool {
        self.sort.is_some() || self.timestamp_key().is_some()
    }

    /// Stable-sort shards by the configured ordering.
    pub fn sort(&self, shards: &mut [S]) {
        if self.is_ordered() {
            shards.sort_by(|a, b| self.compare(a, b));
        }
    }
}

impl<C, S> fmt::Debug for Config<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("keep", &self.keep)
            .field("mapped", &self.mapper.is_some())
            .field("sorted", &self.sort.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Builder for [`Config`].
pub struct ConfigBuilder<C, S> {
    initial: C,
    reducer: Reducer<C, S>,
    mapper: Option<Mapper<S>>,
    keep: Keep<S>,
    sort: Option<Sort<S>>,
    clock: Arc<dyn Clock>,
    settings: Settings,
}

impl<C: Crystal, S: Shard> ConfigBuilder<C, S> {
    pub fn map<F>(mut self, f: F) -> Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        self.mapper = Some(Arc::new(f));
        self
    }

    pub fn keep(mut self, keep: Keep<S>) -> Self {
        self.keep = keep;
        self
    }

    pub fn sort(mut self, sort: Sort<S>) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Shorthand for an explicit comparator.
    pub fn sort_by<F>(self, f: F) -> Self
    where
        F: Fn(&S, &S) -> Ordering + Send + Sync + 'static,
    {
        self.sort(Sort::Comparator(Arc::new(f)))
    }

    /// Shorthand for a single ascending field rule.
    pub fn sort_by_field(self, field: impl Into<String>) -> Self {
        self.sort(Sort::Keys(vec![(Direction::Asc, SortKey::Field(field.into()))]))
    }

    pub fn timestamp_key(mut self, key: impl Into<String>) -> Self {
        self.settings.timestamp_key = Some(key.into());
        self
    }

    pub fn strict_bounds(mut self, strict: bool) -> Self {
        self.settings.strict_bounds = strict;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clock<K: Clock + 'static>(mut self, clock: K) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<Config<C, S>> {
        self.settings.validate()?;

        if self.sort.is_some() && self.settings.timestamp_key.is_some() {
            return Err(CrystalError::AmbiguousOrdering);
        }
        if self.keep.uses_time() && self.settings.timestamp_key.is_none() {
            return Err(CrystalError::SinceWithoutTimestampKey);
        }

        tracing::debug!(
            keep = ?self.keep,
            timestamp_key = ?self.settings.timestamp_key,
            strict_bounds = self.settings.strict_bounds,
            "built crystalizer config"
        );

        Ok(Config {
            initial: self.initial,
            reducer: self.reducer,
            mapper: self.mapper,
            keep: self.keep,
            sort: self.sort,
            clock: self.clock,
            settings: self.settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn sum(acc: i64, shard: &Value) -> i64 {
        acc + shard["value"].as_i64().unwrap_or(0)
    }

    #[test]
    fn test_defaults() {
        let config = Config::<i64, Value>::builder(0, sum).build().unwrap();

        assert!(matches!(config.keep(), Keep::All));
        assert_eq!(config.timestamp_key(), None);
        assert!(!config.strict_bounds());
        assert!(!config.is_ordered());
    }

    #[test]
    fn test_sort_and_timestamp_key_are_exclusive() {
        let err = Config::<i64, Value>::builder(0, sum)
            .timestamp_key("ts")
            .sort_by(|_, _| Ordering::Greater)
            .build()
            .unwrap_err();

        assert_eq!(err, CrystalError::AmbiguousOrdering);
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_since_requires_timestamp_key() {
        let nested = Keep::Max(vec![Keep::Count(2), Keep::Since(Duration::from_millis(5))]);
        let err = Config::<i64, Value>::builder(0, sum)
            .keep(nested.clone())
            .build()
            .unwrap_err();
        assert_eq!(err, CrystalError::SinceWithoutTimestampKey);

        assert!(Config::<i64, Value>::builder(0, sum)
            .keep(nested)
            .timestamp_key("ts")
            .build()
            .is_ok());
    }

    #[test]
    fn test_prepare_maps_then_stamps() {
        let config = Config::<i64, Value>::builder(0, sum)
            .timestamp_key("ts")
            .clock(|| 50_i64)
            .map(|mut s: Value| {
                s["value"] = json!(s["value"].as_i64().unwrap_or(0) * 10);
                s
            })
            .build()
            .unwrap();

        assert_eq!(config.prepare(json!({ "value": 2 })), json!({ "value": 20, "ts": 50 }));
        assert_eq!(
            config.prepare(json!({ "value": 1, "ts": 5 })),
            json!({ "value": 10, "ts": 5 })
        );
    }

    #[test]
    fn test_prepare_keeps_nested_timestamp() {
        let config = Config::<i64, Value>::builder(0, sum)
            .timestamp_key("ts")
            .clock(|| 50_i64)
            .build()
            .unwrap();

        let shard = json!({ "value": 1, "ts": { "at": 5 } });
        assert_eq!(config.prepare(shard.clone()), shard);
    }

    #[test]
    fn test_timestamp_order_is_fractional() {
        let config = Config::<i64, Value>::builder(0, sum)
            .timestamp_key("ts")
            .build()
            .unwrap();

        let mut shards = vec![json!({ "ts": 10.7 }), json!({ "ts": 10.2 }), json!({ "ts": 10 })];
        config.sort(&mut shards);

        let stamps: Vec<_> = shards.iter().map(|s| s["ts"].as_f64().unwrap()).collect();
        assert_eq!(stamps, vec![10.0, 10.2, 10.7]);
    }

    #[test]
    fn test_sort_keys_with_direction() {
        let config = Config::<i64, Value>::builder(0, sum)
            .sort(Sort::Keys(vec![
                (Direction::Asc, SortKey::Field("group".into())),
                (
                    Direction::Desc,
                    SortKey::Fn(Arc::new(|s: &Value| FieldValue::from(s["id"].as_i64().unwrap_or(0)))),
                ),
            ]))
            .build()
            .unwrap();

        let mut shards = vec![
            json!({ "group": 2, "id": 1 }),
            json!({ "group": 1, "id": 1 }),
            json!({ "group": 1, "id": 3 }),
            json!({ "group": 2, "id": 5 }),
        ];
        config.sort(&mut shards);

        let order: Vec<_> = shards.iter().map(|s| (s["group"].as_i64(), s["id"].as_i64())).collect();
        assert_eq!(
            order,
            vec![(Some(1), Some(3)), (Some(1), Some(1)), (Some(2), Some(5)), (Some(2), Some(1))]
        );
    }

    #[test]
    fn test_fold_in_order() {
        let config = Config::<Vec<i64>, Value>::builder(vec![], |mut acc, s: &Value| {
            acc.push(s["id"].as_i64().unwrap_or(-1));
            acc
        })
        .build()
        .unwrap();

        let shards = vec![json!({ "id": 3 }), json!({ "id": 1 }), json!({ "id": 2 })];
        assert_eq!(config.fold(vec![0], &shards), vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_settings_from_json() {
        let settings = Settings::from_json(r#"{ "timestamp_key": "ts" }"#).unwrap();
        assert_eq!(settings.timestamp_key.as_deref(), Some("ts"));
        assert!(!settings.strict_bounds);

        let round = Settings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(round, settings);

        let err = Settings::from_json(r#"{ "timestamp_key": "" }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(Settings::from_json("not json").is_err());
    }
}

//! Telemetry registry.
//!
//! The registry owns every flag and count created against it (or adopted by
//! it) and is the unit of lifecycle: dropping it releases all of them.
//! Structure changes take a coarse write lock; serialization and lookups take
//! the read lock. Recording never touches the lock, only the metric's own
//! atomic cell.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;

use crate::config::TelemetryConfig;
use crate::error::{Result, TelemetryError};
use crate::metric::{check_name, Count, Flag, MetricKind};
use crate::serialize::{self, Entry, SerializationFormat, SerializedJson};

/// What to do when a name is registered twice within one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `TelemetryError::DuplicateName`; the registry is unchanged.
    #[default]
    Reject,
    /// Hand back the already registered metric.
    Alias,
}

#[derive(Default)]
struct Metrics {
    // Insertion order.
    flags: Vec<Flag>,
    counts: Vec<Count>,
}

/// A telemetry session: named flags and counts plus an active/inactive mode.
pub struct Registry {
    active: bool,
    duplicates: DuplicatePolicy,
    metrics: RwLock<Metrics>,
}

impl Registry {
    /// Create an empty registry rejecting duplicate names.
    ///
    /// `active` is a hint for the embedding application: when false it is
    /// expected to skip creating and recording metrics altogether. Recording
    /// itself is never gated.
    pub fn new(active: bool) -> Self {
        Self::with_policy(active, DuplicatePolicy::default())
    }

    pub fn with_policy(active: bool, duplicates: DuplicatePolicy) -> Self {
        tracing::debug!(active, ?duplicates, "telemetry registry created");
        Self {
            active,
            duplicates,
            metrics: RwLock::new(Metrics::default()),
        }
    }

    pub fn from_config(cfg: &TelemetryConfig) -> Self {
        Self::with_policy(cfg.active, cfg.duplicate_names)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    fn read(&self) -> RwLockReadGuard<'_, Metrics> {
        // Nothing panics while holding the lock; recover rather than propagate.
        self.metrics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Metrics> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a flag owned by this registry.
    pub fn new_flag(&self, name: impl Into<String>) -> Result<Flag> {
        let name = name.into();
        check_name(&name).inspect_err(|_| tracing::warn!("rejected flag with empty name"))?;

        let mut metrics = self.write();
        if let Some(existing) = metrics.flags.iter().find(|f| f.name() == name) {
            return self.on_duplicate(MetricKind::Flag, existing.clone());
        }
        let flag = Flag::new(name)?;
        metrics.flags.push(flag.clone());
        tracing::debug!(name = %flag.name(), "flag created");
        Ok(flag)
    }

    /// Adopt a detached flag. The registry becomes its owner; the returned
    /// handle is the one to record on from now on.
    pub fn add_flag(&self, flag: Flag) -> Result<Flag> {
        let mut metrics = self.write();
        if let Some(existing) = metrics.flags.iter().find(|f| f.name() == flag.name()) {
            if existing.same_cell(&flag) {
                return Ok(flag);
            }
            return self.on_duplicate(MetricKind::Flag, existing.clone());
        }
        metrics.flags.push(flag.clone());
        tracing::debug!(name = %flag.name(), "flag adopted");
        Ok(flag)
    }

    /// Create a count owned by this registry.
    pub fn new_count(&self, name: impl Into<String>) -> Result<Count> {
        let name = name.into();
        check_name(&name).inspect_err(|_| tracing::warn!("rejected count with empty name"))?;

        let mut metrics = self.write();
        if let Some(existing) = metrics.counts.iter().find(|c| c.name() == name) {
            return self.on_duplicate(MetricKind::Count, existing.clone());
        }
        let count = Count::new(name)?;
        metrics.counts.push(count.clone());
        tracing::debug!(name = %count.name(), "count created");
        Ok(count)
    }

    /// Adopt a detached count. See [`Registry::add_flag`].
    pub fn add_count(&self, count: Count) -> Result<Count> {
        let mut metrics = self.write();
        if let Some(existing) = metrics.counts.iter().find(|c| c.name() == count.name()) {
            if existing.same_cell(&count) {
                return Ok(count);
            }
            return self.on_duplicate(MetricKind::Count, existing.clone());
        }
        metrics.counts.push(count.clone());
        tracing::debug!(name = %count.name(), "count adopted");
        Ok(count)
    }

    fn on_duplicate<M: Named>(&self, kind: MetricKind, existing: M) -> Result<M> {
        match self.duplicates {
            DuplicatePolicy::Alias => Ok(existing),
            DuplicatePolicy::Reject => {
                tracing::warn!(%kind, name = %existing.name(), "duplicate metric name rejected");
                Err(TelemetryError::DuplicateName {
                    kind,
                    name: existing.name().to_owned(),
                })
            }
        }
    }

    /// Look up a registered flag by name.
    pub fn flag(&self, name: &str) -> Option<Flag> {
        self.read().flags.iter().find(|f| f.name() == name).cloned()
    }

    /// Look up a registered count by name.
    pub fn count(&self, name: &str) -> Option<Count> {
        self.read().counts.iter().find(|c| c.name() == name).cloned()
    }

    /// Number of registered metrics, both kinds.
    pub fn len(&self) -> usize {
        let metrics = self.read();
        metrics.flags.len() + metrics.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current values, ordered by name, one entry per name.
    ///
    /// A flag and a count may share a name; they share one key in the
    /// output and the count's value wins.
    pub fn snapshot(&self) -> Vec<Entry> {
        let metrics = self.read();
        let mut entries: Vec<Entry> = metrics
            .counts
            .iter()
            .map(|c| Entry::new(c.name(), MetricKind::Count, c.value()))
            .chain(
                metrics
                    .flags
                    .iter()
                    .map(|f| Entry::new(f.name(), MetricKind::Flag, f.value())),
            )
            .collect();
        drop(metrics);
        entries.sort_by(|a, b| (a.name.as_str(), a.kind).cmp(&(b.name.as_str(), b.kind)));
        // Sorted with counts first on a tie, so dedup keeps the count.
        let before = entries.len();
        entries.dedup_by(|later, kept| later.name == kept.name);
        if entries.len() != before {
            tracing::warn!(
                shadowed = before - entries.len(),
                "flag value shadowed by a count with the same name"
            );
        }
        entries
    }

    /// Render every metric in `format`.
    pub fn serialize(&self, format: SerializationFormat) -> Result<SerializedJson> {
        let entries = self.snapshot();
        tracing::trace!(entries = entries.len(), ?format, "serializing telemetry");
        serialize::render(&entries, format)
    }

    /// Render every metric as a pretty-printed flat JSON object:
    ///
    /// ```text
    /// {
    ///   "COUNT": 2,
    ///   "FLAG": 1
    /// }
    /// ```
    pub fn serialize_plain_json(&self) -> Result<String> {
        self.serialize(SerializationFormat::PlainJson)
            .map(SerializedJson::into_string)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let metrics = self.metrics.get_mut().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            flags = metrics.flags.len(),
            counts = metrics.counts.len(),
            "telemetry registry freed"
        );
    }
}

trait Named {
    fn name(&self) -> &str;
}

impl Named for Flag {
    fn name(&self) -> &str {
        Flag::name(self)
    }
}

impl Named for Count {
    fn name(&self) -> &str {
        Count::name(self)
    }
}

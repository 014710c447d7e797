//! Metric handles: boolean flags and saturating counts.
//!
//! A handle is a cheap `Clone` of an `Arc`-backed cell. Every clone records
//! into the same cell, so a handle can be moved into worker threads freely.
//! Each update is a single atomic operation; concurrent recording on the same
//! metric never loses an observation.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, TelemetryError};

/// The two metric kinds. Each kind has its own name namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    // Declaration order is the tie-break when a count and a flag share a name.
    Count,
    Flag,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Count => "count",
            MetricKind::Flag => "flag",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TelemetryError::EmptyName);
    }
    Ok(())
}

struct FlagCell {
    name: String,
    set: AtomicBool,
}

/// Flag metric.
///
/// Unset until the first `record()`, then set for good. Useful to track
/// whether a feature was ever used during a session. Serialized as `0`/`1`.
#[derive(Clone)]
pub struct Flag {
    cell: Arc<FlagCell>,
}

impl Flag {
    /// Create a detached flag, owned by the caller until it is adopted by a
    /// [`Registry`](crate::Registry) via `add_flag`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            cell: Arc::new(FlagCell {
                name,
                set: AtomicBool::new(false),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// Set the flag. Idempotent.
    pub fn record(&self) {
        self.cell.set.store(true, Ordering::Relaxed);
    }

    /// Set the flag if the callback returns `Some(())`.
    pub fn record_cb<F>(&self, cb: F)
    where
        F: FnOnce() -> Option<()>,
    {
        // Already set: skip the callback entirely.
        if self.is_set() {
            return;
        }
        if cb().is_some() {
            self.record();
        }
    }

    pub fn is_set(&self) -> bool {
        self.cell.set.load(Ordering::Relaxed)
    }

    /// Serialized value.
    pub fn value(&self) -> u64 {
        u64::from(self.is_set())
    }

    pub(crate) fn same_cell(&self, other: &Flag) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name())
            .field("set", &self.is_set())
            .finish()
    }
}

struct CountCell {
    name: String,
    value: AtomicU64,
}

/// Count metric.
///
/// Accumulates the numbers passed to `record()`, e.g. how many times a
/// feature was used or an error was triggered. The running total saturates
/// at `u64::MAX` instead of wrapping.
#[derive(Clone)]
pub struct Count {
    cell: Arc<CountCell>,
}

impl Count {
    /// Create a detached count, owned by the caller until it is adopted by a
    /// [`Registry`](crate::Registry) via `add_count`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            cell: Arc::new(CountCell {
                name,
                value: AtomicU64::new(0),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// Add `delta` to the running total, saturating at `u64::MAX`.
    pub fn record(&self, delta: u64) {
        // The closure never returns None, so the update always lands.
        let _ = self
            .cell
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_add(delta))
            });
    }

    /// Record the value produced by `cb`; `None` records nothing.
    pub fn record_cb<F>(&self, cb: F)
    where
        F: FnOnce() -> Option<u64>,
    {
        if let Some(delta) = cb() {
            self.record(delta);
        }
    }

    pub fn value(&self) -> u64 {
        self.cell.value.load(Ordering::Relaxed)
    }

    pub(crate) fn same_cell(&self, other: &Count) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Count")
            .field("name", &self.name())
            .field("value", &self.value())
            .finish()
    }
}

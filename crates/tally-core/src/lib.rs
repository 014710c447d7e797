//! tally core: in-process flags and counts with deterministic JSON output.
//!
//! A [`Registry`] owns named [`Flag`]s (boolean, set once) and [`Count`]s
//! (saturating accumulators). Recording is lock-free and safe from any
//! thread; serialization renders every metric as one flat JSON object
//! ordered by name. There is no I/O beyond reading an optional YAML config.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible
//! paths surface as `TelemetryError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod global;
pub mod metric;
pub mod registry;
pub mod serialize;

/// Shared result type.
pub use error::{ErrorCode, Result, TelemetryError};
pub use metric::{Count, Flag, MetricKind};
pub use registry::{DuplicatePolicy, Registry};
pub use serialize::{Entry, SerializationFormat, SerializedJson};

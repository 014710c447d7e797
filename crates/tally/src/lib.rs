//! Top-level facade crate for tally.
//!
//! Re-exports the core registry and the C ABI so users can depend on a single crate.

pub mod core {
    pub use tally_core::*;
}

pub mod capi {
    pub use tally_capi::*;
}

pub use tally_core::{Count, Flag, Registry, Result, TelemetryError};

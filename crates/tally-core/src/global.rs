//! Process-wide registry for callers that cannot pass a registry around.
//!
//! Nothing is installed implicitly: the embedding application calls
//! [`install`] once it has built its registry and [`uninstall`] at teardown.
//! Explicit registry passing remains the primary API; everything here is a
//! thin wrapper over one installed instance.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;
use crate::registry::Registry;

static GLOBAL: RwLock<Option<Arc<Registry>>> = RwLock::new(None);

/// Install `registry` as the process-wide registry, returning the previous one.
pub fn install(registry: Arc<Registry>) -> Option<Arc<Registry>> {
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    let prev = slot.replace(registry);
    tracing::info!(replaced = prev.is_some(), "global telemetry registry installed");
    prev
}

/// Remove the process-wide registry. It is freed once the last handle to it
/// is dropped.
pub fn uninstall() -> Option<Arc<Registry>> {
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    let prev = slot.take();
    if prev.is_some() {
        tracing::info!("global telemetry registry uninstalled");
    }
    prev
}

pub fn get() -> Option<Arc<Registry>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Serialize the installed registry; `Ok(None)` when nothing is installed.
pub fn serialize_plain_json() -> Result<Option<String>> {
    get().map(|r| r.serialize_plain_json()).transpose()
}

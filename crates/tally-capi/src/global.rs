//! Process-wide registry entry points.

use std::ffi::c_char;
use std::ptr;
use std::sync::Arc;

use tally_core::global;

use crate::error::{fail, null_arg, set_last_error, TelemetryStatus};
use crate::handles::telemetry_t;
use crate::serialized::render_c;

/// Make `telemetry` the process-wide registry.
///
/// The global slot keeps the registry alive after `telemetry_free` until
/// `telemetry_uninstall_global`; metric handles still die with `telemetry`.
///
/// # Safety
/// `telemetry` must be NULL or a live registry.
#[no_mangle]
pub unsafe extern "C" fn telemetry_install_global(telemetry: *mut telemetry_t) -> TelemetryStatus {
    let Some(t) = telemetry.as_ref() else {
        return null_arg();
    };
    global::install(Arc::clone(&t.registry));
    TelemetryStatus::Ok
}

#[no_mangle]
pub extern "C" fn telemetry_uninstall_global() {
    global::uninstall();
}

/// Serialize the process-wide registry. NULL when none is installed. Free
/// with `telemetry_free_serialized_json`.
#[no_mangle]
pub extern "C" fn telemetry_serialize_global_plain_json() -> *mut c_char {
    let Some(registry) = global::get() else {
        set_last_error("no global telemetry registry installed");
        return ptr::null_mut();
    };
    match render_c(&registry) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

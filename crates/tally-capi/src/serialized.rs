//! Serialization entry points.
//!
//! Two shapes: a `serialized_string_t` handle with a borrowed view and its
//! own free, or a plain owned `char*` freed with
//! `telemetry_free_serialized_json`.

use std::ffi::{c_char, CString};
use std::ptr;

use tally_core::{Registry, Result, SerializationFormat, TelemetryError};

use crate::error::{fail, null_arg};
use crate::handles::telemetry_t;

/// Opaque serialization result. Owns a NUL-terminated copy of the JSON text.
pub struct serialized_string_t {
    inner: CString,
}

pub(crate) fn render_c(registry: &Registry) -> Result<CString> {
    let json = registry.serialize(SerializationFormat::PlainJson)?;
    CString::new(json.into_string())
        .map_err(|e| TelemetryError::Internal(format!("serialized json contains NUL: {e}")))
}

/// Serialize every metric of `telemetry`. NULL on failure.
///
/// # Safety
/// `telemetry` must be NULL or a live registry.
#[no_mangle]
pub unsafe extern "C" fn telemetry_serialize_plain_json(
    telemetry: *mut telemetry_t,
) -> *mut serialized_string_t {
    let Some(t) = telemetry.as_ref() else {
        null_arg();
        return ptr::null_mut();
    };
    match render_c(t.registry()) {
        Ok(inner) => Box::into_raw(Box::new(serialized_string_t { inner })),
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

/// Borrow the text of a serialization result. Valid until
/// `telemetry_free_serialized_string`.
///
/// # Safety
/// `serialized` must be NULL or a live serialization handle.
#[no_mangle]
pub unsafe extern "C" fn telemetry_borrow_string(
    serialized: *const serialized_string_t,
) -> *const c_char {
    match serialized.as_ref() {
        Some(s) => s.inner.as_ptr(),
        None => ptr::null(),
    }
}

/// # Safety
/// `serialized` must be NULL or come from `telemetry_serialize_plain_json`.
#[no_mangle]
pub unsafe extern "C" fn telemetry_free_serialized_string(serialized: *mut serialized_string_t) {
    if !serialized.is_null() {
        drop(Box::from_raw(serialized));
    }
}

/// Serialize every metric of `telemetry` into an owned string. NULL on
/// failure. Free with `telemetry_free_serialized_json`.
///
/// # Safety
/// `telemetry` must be NULL or a live registry.
#[no_mangle]
pub unsafe extern "C" fn telemetry_serialize_plain_json_string(
    telemetry: *mut telemetry_t,
) -> *mut c_char {
    let Some(t) = telemetry.as_ref() else {
        null_arg();
        return ptr::null_mut();
    };
    match render_c(t.registry()) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `json` must be NULL or a string returned by
/// `telemetry_serialize_plain_json_string` or
/// `telemetry_serialize_global_plain_json`.
#[no_mangle]
pub unsafe extern "C" fn telemetry_free_serialized_json(json: *mut c_char) {
    if !json.is_null() {
        drop(CString::from_raw(json));
    }
}

//! Status codes and the thread-local last-error message.

use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::ptr;

use tally_core::{ErrorCode, TelemetryError};

/// Status returned by fallible C entry points (`telemetry_status_t`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryStatus {
    Ok = 0,
    NullPointer = -1,
    InvalidName = -2,
    DuplicateName = -3,
    Internal = -99,
}

impl From<&TelemetryError> for TelemetryStatus {
    fn from(e: &TelemetryError) -> Self {
        match e.code() {
            ErrorCode::InvalidName => TelemetryStatus::InvalidName,
            ErrorCode::DuplicateName => TelemetryStatus::DuplicateName,
            ErrorCode::UnsupportedVersion | ErrorCode::BadConfig | ErrorCode::Internal => {
                TelemetryStatus::Internal
            }
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(msg: impl Into<String>) {
    let msg = msg.into();
    tracing::debug!(error = %msg, "telemetry C API call failed");
    let msg = CString::new(msg).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(msg));
}

/// Record `e` as the last error and map it to a status.
pub(crate) fn fail(e: &TelemetryError) -> TelemetryStatus {
    set_last_error(e.to_string());
    e.into()
}

pub(crate) fn null_arg() -> TelemetryStatus {
    set_last_error("null pointer argument");
    TelemetryStatus::NullPointer
}

/// Message of the last failed call on this thread, or NULL.
///
/// The pointer stays valid until the next failing call on this thread or
/// `telemetry_clear_last_error`.
#[no_mangle]
pub extern "C" fn telemetry_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |msg| msg.as_ptr())
    })
}

#[no_mangle]
pub extern "C" fn telemetry_clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

//! C ABI for tally.
//!
//! Exposes the registry through opaque handles (`telemetry_t`, `flag_t`,
//! `count_t`, `serialized_string_t`); see `include/telemetry.h`. Both
//! ownership shapes are supported: metrics created against a registry, and
//! detached metrics later attached with `telemetry_add_*`.
//!
//! Handle lifetimes are the caller's obligation. Null pointers are tolerated
//! (no-op, NULL, or `TELEMETRY_NULL_POINTER`); freed or foreign pointers are
//! undefined behavior.

#![allow(non_camel_case_types)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod global;
pub mod handles;
pub mod serialized;

pub use error::{telemetry_clear_last_error, telemetry_last_error, TelemetryStatus};
pub use global::{
    telemetry_install_global, telemetry_serialize_global_plain_json, telemetry_uninstall_global,
};
pub use handles::{
    count_t, flag_t, telemetry_add_count, telemetry_add_flag, telemetry_count_create,
    telemetry_count_free, telemetry_flag_create, telemetry_flag_free, telemetry_free,
    telemetry_init, telemetry_init_from_config, telemetry_new_count, telemetry_new_flag,
    telemetry_record_count, telemetry_record_flag, telemetry_t,
};
pub use serialized::{
    serialized_string_t, telemetry_borrow_string, telemetry_free_serialized_json,
    telemetry_free_serialized_string, telemetry_serialize_plain_json,
    telemetry_serialize_plain_json_string,
};

//! C ABI integration tests.
//!
//! Drives the exported `telemetry_*` functions the way a C caller would:
//! raw handles, NUL-terminated names, explicit frees.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::ffi::{c_char, CStr, CString};
use std::io::Write;
use std::ptr;

use tally_capi::*;

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

unsafe fn owned_json(t: *mut telemetry_t) -> String {
    let s = telemetry_serialize_plain_json_string(t);
    assert!(!s.is_null());
    let out = CStr::from_ptr(s).to_str().unwrap().to_owned();
    telemetry_free_serialized_json(s);
    out
}

unsafe fn last_error() -> Option<String> {
    let p = telemetry_last_error();
    (!p.is_null()).then(|| CStr::from_ptr(p).to_string_lossy().into_owned())
}

// ============================================================================
// Owned-at-creation variant
// ============================================================================

#[test]
fn it_works() {
    unsafe {
        let telemetry = telemetry_init(1);

        let name = c("FLAG");
        let flag = telemetry_new_flag(telemetry, name.as_ptr());
        let name = c("COUNT");
        let count = telemetry_new_count(telemetry, name.as_ptr());

        telemetry_record_flag(flag);
        telemetry_record_count(count, 2);
        telemetry_record_count(count, 3);

        let serialized = telemetry_serialize_plain_json(telemetry);
        assert!(!serialized.is_null());
        let s = telemetry_borrow_string(serialized);
        let repr = CStr::from_ptr(s).to_str().unwrap();
        assert_eq!(repr, "{\n  \"COUNT\": 5,\n  \"FLAG\": 1\n}");

        telemetry_free_serialized_string(serialized);
        telemetry_free(telemetry);
    }
}

#[test]
fn inactive_registry_still_serializes() {
    unsafe {
        let telemetry = telemetry_init(0);
        assert!(!(*telemetry).registry().is_active());
        assert_eq!(owned_json(telemetry), "{}");
        telemetry_free(telemetry);
    }
}

#[test]
fn duplicate_name_returns_null() {
    unsafe {
        telemetry_clear_last_error();
        let telemetry = telemetry_init(1);
        let name = c("DUP");
        assert!(!telemetry_new_count(telemetry, name.as_ptr()).is_null());
        assert!(telemetry_new_count(telemetry, name.as_ptr()).is_null());
        assert!(last_error().unwrap().contains("duplicate count name: DUP"));

        // Flags live in their own namespace.
        assert!(!telemetry_new_flag(telemetry, name.as_ptr()).is_null());
        telemetry_free(telemetry);
    }
}

#[test]
fn invalid_names_return_null() {
    unsafe {
        let telemetry = telemetry_init(1);

        telemetry_clear_last_error();
        assert!(telemetry_new_flag(telemetry, ptr::null()).is_null());
        assert!(last_error().unwrap().contains("null"));

        let empty = c("");
        assert!(telemetry_new_flag(telemetry, empty.as_ptr()).is_null());
        assert!(last_error().unwrap().contains("empty"));

        let bad_utf8 = [0xffu8, 0xfe, 0x00];
        assert!(telemetry_count_create(bad_utf8.as_ptr() as *const c_char).is_null());
        assert!(last_error().unwrap().contains("UTF-8"));

        assert!((*telemetry).registry().is_empty());
        telemetry_free(telemetry);
    }
}

// ============================================================================
// Detached create-then-attach variant
// ============================================================================

#[test]
fn detached_metrics_attach_and_serialize() {
    unsafe {
        let telemetry = telemetry_init(1);

        let name = c("FLAG");
        let flag = telemetry_flag_create(name.as_ptr());
        assert_eq!(telemetry_add_flag(telemetry, flag), TelemetryStatus::Ok);

        let name = c("COUNT");
        let count = telemetry_count_create(name.as_ptr());
        assert_eq!(telemetry_add_count(telemetry, count), TelemetryStatus::Ok);

        telemetry_record_flag(flag);
        telemetry_record_count(count, 2);

        assert_eq!(owned_json(telemetry), "{\n  \"COUNT\": 2,\n  \"FLAG\": 1\n}");
        telemetry_free(telemetry);
    }
}

#[test]
fn rejected_attach_leaves_ownership_with_caller() {
    unsafe {
        let telemetry = telemetry_init(1);
        let name = c("FLAG");
        let owned = telemetry_new_flag(telemetry, name.as_ptr());
        telemetry_record_flag(owned);

        let detached = telemetry_flag_create(name.as_ptr());
        assert_eq!(
            telemetry_add_flag(telemetry, detached),
            TelemetryStatus::DuplicateName
        );
        telemetry_flag_free(detached);

        assert_eq!(owned_json(telemetry), "{\n  \"FLAG\": 1\n}");
        telemetry_free(telemetry);
    }
}

#[test]
fn reattaching_an_owned_handle_is_a_noop() {
    unsafe {
        let telemetry = telemetry_init(1);

        let name = c("FLAG");
        let flag = telemetry_flag_create(name.as_ptr());
        assert_eq!(telemetry_add_flag(telemetry, flag), TelemetryStatus::Ok);
        assert_eq!(telemetry_add_flag(telemetry, flag), TelemetryStatus::Ok);

        let name = c("COUNT");
        let count = telemetry_count_create(name.as_ptr());
        assert_eq!(telemetry_add_count(telemetry, count), TelemetryStatus::Ok);
        assert_eq!(telemetry_add_count(telemetry, count), TelemetryStatus::Ok);

        // Handles from new_* are owned already; attaching them changes nothing.
        let name = c("OWNED");
        let owned = telemetry_new_count(telemetry, name.as_ptr());
        assert_eq!(telemetry_add_count(telemetry, owned), TelemetryStatus::Ok);

        telemetry_record_flag(flag);
        telemetry_record_count(count, 3);
        telemetry_record_count(owned, 1);

        assert_eq!((*telemetry).registry().len(), 3);
        assert_eq!(
            owned_json(telemetry),
            "{\n  \"COUNT\": 3,\n  \"FLAG\": 1,\n  \"OWNED\": 1\n}"
        );
        // Each handle is freed exactly once.
        telemetry_free(telemetry);
    }
}

#[test]
fn null_arguments_are_reported() {
    unsafe {
        let name = c("X");
        let count = telemetry_count_create(name.as_ptr());
        assert_eq!(
            telemetry_add_count(ptr::null_mut(), count),
            TelemetryStatus::NullPointer
        );
        telemetry_count_free(count);

        let telemetry = telemetry_init(1);
        assert_eq!(
            telemetry_add_flag(telemetry, ptr::null_mut()),
            TelemetryStatus::NullPointer
        );
        telemetry_free(telemetry);

        // No-ops.
        telemetry_record_flag(ptr::null_mut());
        telemetry_record_count(ptr::null_mut(), 1);
        telemetry_free(ptr::null_mut());
        telemetry_free_serialized_string(ptr::null_mut());
        telemetry_free_serialized_json(ptr::null_mut());
        assert!(telemetry_borrow_string(ptr::null()).is_null());
        assert!(telemetry_serialize_plain_json(ptr::null_mut()).is_null());
    }
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn init_from_config_applies_alias_policy() {
    let path = std::env::temp_dir().join(format!("tally-capi-{}.yaml", std::process::id()));
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "version: 1\nactive: true\nduplicate_names: alias").unwrap();
    drop(f);

    unsafe {
        let cpath = c(path.to_str().unwrap());
        let telemetry = telemetry_init_from_config(cpath.as_ptr());
        assert!(!telemetry.is_null());

        let name = c("HITS");
        let a = telemetry_new_count(telemetry, name.as_ptr());
        let b = telemetry_new_count(telemetry, name.as_ptr());
        assert!(!b.is_null());

        // Attaching a detached duplicate re-points it at the registered cell.
        let detached = telemetry_count_create(name.as_ptr());
        assert_eq!(telemetry_add_count(telemetry, detached), TelemetryStatus::Ok);

        telemetry_record_count(a, 1);
        telemetry_record_count(b, 2);
        telemetry_record_count(detached, 3);
        assert_eq!(owned_json(telemetry), "{\n  \"HITS\": 6\n}");
        telemetry_free(telemetry);
    }
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn init_from_missing_config_returns_null() {
    unsafe {
        let path = c("/definitely/not/here/tally.yaml");
        assert!(telemetry_init_from_config(path.as_ptr()).is_null());
        assert!(last_error().unwrap().contains("read config failed"));
    }
}

// ============================================================================
// Status codes
// ============================================================================

#[test]
fn status_codes_have_stable_values() {
    assert_eq!(TelemetryStatus::Ok as i32, 0);
    assert_eq!(TelemetryStatus::NullPointer as i32, -1);
    assert_eq!(TelemetryStatus::InvalidName as i32, -2);
    assert_eq!(TelemetryStatus::DuplicateName as i32, -3);
    assert_eq!(TelemetryStatus::Internal as i32, -99);
}

#[test]
fn clear_last_error_resets_message() {
    unsafe {
        telemetry_new_flag(ptr::null_mut(), ptr::null());
    }
    assert!(!telemetry_last_error().is_null());
    telemetry_clear_last_error();
    assert!(telemetry_last_error().is_null());
}

// ============================================================================
// Concurrent use of one registry handle
// ============================================================================

#[derive(Clone, Copy)]
struct Shared(*mut telemetry_t);

// The registry handle is documented as usable from several threads at once.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

#[test]
fn concurrent_create_attach_and_serialize() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let telemetry = Shared(telemetry_init(1));
    std::thread::scope(|s| {
        for t in 0..THREADS {
            s.spawn(move || unsafe {
                let telemetry = telemetry;
                for i in 0..PER_THREAD {
                    if i % 2 == 0 {
                        let name = c(&format!("C_{t:02}_{i:03}"));
                        let count = telemetry_new_count(telemetry.0, name.as_ptr());
                        assert!(!count.is_null());
                        telemetry_record_count(count, 1);
                    } else {
                        let name = c(&format!("D_{t:02}_{i:03}"));
                        let count = telemetry_count_create(name.as_ptr());
                        assert_eq!(telemetry_add_count(telemetry.0, count), TelemetryStatus::Ok);
                        // Racing a second attach of the same handle must not
                        // hand ownership over twice.
                        assert_eq!(telemetry_add_count(telemetry.0, count), TelemetryStatus::Ok);
                        telemetry_record_count(count, 2);
                    }
                }
            });
        }
        s.spawn(move || unsafe {
            let telemetry = telemetry;
            for _ in 0..20 {
                let json = owned_json(telemetry.0);
                assert!(json.starts_with('{') && json.ends_with('}'));
            }
        });
    });

    unsafe {
        assert_eq!((*telemetry.0).registry().len(), THREADS * PER_THREAD);
        let json = owned_json(telemetry.0);
        let values: Vec<&str> = json
            .lines()
            .filter(|l| l.starts_with("  \""))
            .map(|l| l.trim_end_matches(',').rsplit(": ").next().unwrap())
            .collect();
        assert_eq!(values.len(), THREADS * PER_THREAD);
        assert_eq!(values.iter().filter(|v| **v == "1").count(), THREADS * PER_THREAD / 2);
        assert_eq!(values.iter().filter(|v| **v == "2").count(), THREADS * PER_THREAD / 2);
        telemetry_free(telemetry.0);
    }
}

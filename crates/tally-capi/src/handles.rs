//! Registry and metric handles.

use std::ffi::{c_char, c_int, c_uint, CStr};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tally_core::{config, Count, Flag, Registry};

use crate::error::{fail, null_arg, set_last_error, TelemetryStatus};

/// Opaque registry handle.
///
/// Owns every `flag_t`/`count_t` created against it or attached to it; they
/// are freed together with the registry. Creation and attachment may run on
/// several threads at once: the owned handles sit behind a mutex that is held
/// across the core registry call, so only `telemetry_free` needs exclusive
/// access.
pub struct telemetry_t {
    pub(crate) registry: Arc<Registry>,
    owned: Mutex<Owned>,
}

#[derive(Default)]
struct Owned {
    flags: Vec<*mut flag_t>,
    counts: Vec<*mut count_t>,
}

impl telemetry_t {
    fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            owned: Mutex::new(Owned::default()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn owned(&self) -> MutexGuard<'_, Owned> {
        self.owned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for telemetry_t {
    fn drop(&mut self) {
        let owned = self.owned.get_mut().unwrap_or_else(PoisonError::into_inner);
        // SAFETY: every pointer was produced by `Box::into_raw` and recorded
        // here exactly once (attach skips handles already owned).
        unsafe {
            for flag in owned.flags.drain(..) {
                drop(Box::from_raw(flag));
            }
            for count in owned.counts.drain(..) {
                drop(Box::from_raw(count));
            }
        }
    }
}

/// Opaque flag handle.
pub struct flag_t {
    inner: Flag,
}

/// Opaque count handle.
pub struct count_t {
    inner: Count,
}

unsafe fn name_arg<'a>(name: *const c_char) -> Result<&'a str, TelemetryStatus> {
    if name.is_null() {
        return Err(null_arg());
    }
    CStr::from_ptr(name).to_str().map_err(|_| {
        set_last_error("metric name is not valid UTF-8");
        TelemetryStatus::InvalidName
    })
}

/// Create a registry. `is_active != 0` marks the session active.
#[no_mangle]
pub extern "C" fn telemetry_init(is_active: c_int) -> *mut telemetry_t {
    Box::into_raw(Box::new(telemetry_t::new(Registry::new(is_active != 0))))
}

/// Create a registry from a YAML config file. Returns NULL on failure (see
/// `telemetry_last_error`).
///
/// # Safety
/// `path` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn telemetry_init_from_config(path: *const c_char) -> *mut telemetry_t {
    if path.is_null() {
        null_arg();
        return ptr::null_mut();
    }
    let Ok(path) = CStr::from_ptr(path).to_str() else {
        set_last_error("config path is not valid UTF-8");
        return ptr::null_mut();
    };
    match config::load_from_file(path) {
        Ok(cfg) => Box::into_raw(Box::new(telemetry_t::new(Registry::from_config(&cfg)))),
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

/// Free a registry and every metric it owns. NULL is a no-op.
///
/// # Safety
/// `telemetry` must be NULL or a live pointer from `telemetry_init*`. All
/// metric handles owned by it become dangling.
#[no_mangle]
pub unsafe extern "C" fn telemetry_free(telemetry: *mut telemetry_t) {
    if telemetry.is_null() {
        return;
    }
    drop(Box::from_raw(telemetry));
}

/// Create a flag owned by `telemetry`. NULL on invalid or rejected name.
///
/// # Safety
/// `telemetry` must be a live registry; `name` a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn telemetry_new_flag(
    telemetry: *mut telemetry_t,
    name: *const c_char,
) -> *mut flag_t {
    if telemetry.is_null() {
        null_arg();
        return ptr::null_mut();
    }
    let Ok(name) = name_arg(name) else {
        return ptr::null_mut();
    };
    let t = &*telemetry;
    let mut owned = t.owned();
    match t.registry.new_flag(name) {
        Ok(inner) => {
            let flag = Box::into_raw(Box::new(flag_t { inner }));
            owned.flags.push(flag);
            flag
        }
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

/// Create a detached flag, owned by the caller until `telemetry_add_flag`.
///
/// # Safety
/// `name` must be NULL or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn telemetry_flag_create(name: *const c_char) -> *mut flag_t {
    let Ok(name) = name_arg(name) else {
        return ptr::null_mut();
    };
    match Flag::new(name) {
        Ok(inner) => Box::into_raw(Box::new(flag_t { inner })),
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

/// Transfer a detached flag into `telemetry`.
///
/// On `TELEMETRY_OK` the registry owns `flag` and the caller must not free
/// it. On any other status the caller keeps ownership. Attaching a flag this
/// registry already owns is a no-op.
///
/// # Safety
/// Both pointers must be live; `flag` must not be owned by another registry.
#[no_mangle]
pub unsafe extern "C" fn telemetry_add_flag(
    telemetry: *mut telemetry_t,
    flag: *mut flag_t,
) -> TelemetryStatus {
    if telemetry.is_null() || flag.is_null() {
        return null_arg();
    }
    let t = &*telemetry;
    let mut owned = t.owned();
    if owned.flags.contains(&flag) {
        return TelemetryStatus::Ok;
    }
    match t.registry.add_flag((*flag).inner.clone()) {
        Ok(registered) => {
            // Under the alias policy this re-points the handle at the
            // registered cell.
            (*flag).inner = registered;
            owned.flags.push(flag);
            TelemetryStatus::Ok
        }
        Err(e) => fail(&e),
    }
}

/// Free a flag that was never attached. NULL is a no-op.
///
/// # Safety
/// `flag` must come from `telemetry_flag_create` and must not have been
/// attached to a registry.
#[no_mangle]
pub unsafe extern "C" fn telemetry_flag_free(flag: *mut flag_t) {
    if !flag.is_null() {
        drop(Box::from_raw(flag));
    }
}

/// Set a flag. NULL is a no-op.
///
/// # Safety
/// `flag` must be NULL or a live flag handle.
#[no_mangle]
pub unsafe extern "C" fn telemetry_record_flag(flag: *mut flag_t) {
    if let Some(flag) = flag.as_ref() {
        flag.inner.record();
    }
}

/// Create a count owned by `telemetry`. NULL on invalid or rejected name.
///
/// # Safety
/// `telemetry` must be a live registry; `name` a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn telemetry_new_count(
    telemetry: *mut telemetry_t,
    name: *const c_char,
) -> *mut count_t {
    if telemetry.is_null() {
        null_arg();
        return ptr::null_mut();
    }
    let Ok(name) = name_arg(name) else {
        return ptr::null_mut();
    };
    let t = &*telemetry;
    let mut owned = t.owned();
    match t.registry.new_count(name) {
        Ok(inner) => {
            let count = Box::into_raw(Box::new(count_t { inner }));
            owned.counts.push(count);
            count
        }
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

/// Create a detached count, owned by the caller until `telemetry_add_count`.
///
/// # Safety
/// `name` must be NULL or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn telemetry_count_create(name: *const c_char) -> *mut count_t {
    let Ok(name) = name_arg(name) else {
        return ptr::null_mut();
    };
    match Count::new(name) {
        Ok(inner) => Box::into_raw(Box::new(count_t { inner })),
        Err(e) => {
            fail(&e);
            ptr::null_mut()
        }
    }
}

/// Transfer a detached count into `telemetry`. Ownership rules as for
/// `telemetry_add_flag`.
///
/// # Safety
/// Both pointers must be live; `count` must not be owned by another registry.
#[no_mangle]
pub unsafe extern "C" fn telemetry_add_count(
    telemetry: *mut telemetry_t,
    count: *mut count_t,
) -> TelemetryStatus {
    if telemetry.is_null() || count.is_null() {
        return null_arg();
    }
    let t = &*telemetry;
    let mut owned = t.owned();
    if owned.counts.contains(&count) {
        return TelemetryStatus::Ok;
    }
    match t.registry.add_count((*count).inner.clone()) {
        Ok(registered) => {
            (*count).inner = registered;
            owned.counts.push(count);
            TelemetryStatus::Ok
        }
        Err(e) => fail(&e),
    }
}

/// # Safety
/// `count` must come from `telemetry_count_create` and must not have been
/// attached to a registry.
#[no_mangle]
pub unsafe extern "C" fn telemetry_count_free(count: *mut count_t) {
    if !count.is_null() {
        drop(Box::from_raw(count));
    }
}

/// Add `value` to a count (saturating). NULL is a no-op.
///
/// # Safety
/// `count` must be NULL or a live count handle.
#[no_mangle]
pub unsafe extern "C" fn telemetry_record_count(count: *mut count_t, value: c_uint) {
    if let Some(count) = count.as_ref() {
        count.inner.record(u64::from(value));
    }
}

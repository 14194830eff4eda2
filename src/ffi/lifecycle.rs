// src/ffi/lifecycle.rs
// ============================================================================
// C ABI for the lifecycle engine. The wrappers decode C strings, run the
// service on the shared Tokio runtime, and hand JSON back to the caller.
//
// Memory ownership:
//   * Any *mut c_char returned from Rust must be released with
//     `lifecycle_free`, exactly once.
//   * Incoming pointers must be NUL-terminated UTF-8. Violations come back as
//     `ErrorCode::InvalidArgument` / `ErrorCode::NullPointer`.
//
// JSON contract for `lifecycle_batch_execute`:
//   { "action": "finalize|unfinalize|delete|disable|enable",
//     "kind": "interview|account",        // required for delete
//     "targetIds": ["id", ...] }
// On success `*result` receives a BatchReport:
//   { "totalAttempted", "successCount", "failureCount",
//     "failures": [{ "id", "reason" }], "outcomes": [{ "id", "ok", "errorDetail"? }] }
// ----------------------------------------------------------------------------

use crate::config::LifecycleConfig;
use crate::domains::lifecycle::BatchRequestDto;
use crate::ffi::error::{ErrorCode, FFIError, FFIResult};
use crate::ffi::handle_status_result;
use crate::globals;

use lazy_static::lazy_static;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

lazy_static! {
    static ref RUNTIME: Mutex<Option<Arc<Runtime>>> = Mutex::new(None);
}

/// Shared runtime for every FFI call so the pool always lives on the runtime that created it
fn runtime() -> FFIResult<Arc<Runtime>> {
    let mut guard = RUNTIME
        .lock()
        .map_err(|_| FFIError::internal("RUNTIME lock poisoned".to_string()))?;
    if let Some(rt) = guard.as_ref() {
        return Ok(rt.clone());
    }
    let rt = Arc::new(
        Runtime::new().map_err(|e| FFIError::internal(format!("failed to create tokio runtime: {e}")))?,
    );
    *guard = Some(rt.clone());
    Ok(rt)
}

fn block_on_async<F, T, E>(future: F) -> FFIResult<T>
where
    F: std::future::Future<Output = Result<T, E>>,
    FFIError: From<E>,
{
    runtime()?.block_on(future).map_err(FFIError::from)
}

/// Ensure pointer is not null
macro_rules! ensure_ptr {
    ($ptr:expr) => {
        if $ptr.is_null() {
            return Err(FFIError::new(ErrorCode::NullPointer, "null pointer"));
        }
    };
}

unsafe fn read_str<'a>(ptr: *const c_char) -> FFIResult<&'a str> {
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| FFIError::new(ErrorCode::InvalidUtf8, "invalid utf-8"))
}

/// Initialize the engine. `db_path` may be NULL to take `LIFECYCLE_DB_PATH` from the environment.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lifecycle_initialize(db_path: *const c_char) -> c_int {
    handle_status_result(|| unsafe {
        let config = LifecycleConfig::from_env();
        let config = if db_path.is_null() {
            config
        } else {
            config.with_db_path(read_str(db_path)?)
        };
        block_on_async(globals::initialize(config))
    })
}

/// Run one batch request. Expected JSON payload is described at the top of this file.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lifecycle_batch_execute(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(payload_json);
        ensure_ptr!(result);

        let json = read_str(payload_json)?;
        let dto: BatchRequestDto = serde_json::from_str(json)
            .map_err(|e| FFIError::invalid_argument(&format!("json parse error: {e}")))?;

        let svc = globals::get_lifecycle_service()?;
        let report = block_on_async(svc.run_batch(dto))?;

        let json_resp = serde_json::to_string(&report)
            .map_err(|e| FFIError::internal(format!("ser {e}")))?;
        *result = CString::new(json_resp)?.into_raw();
        Ok(())
    })
}

/// Free a string returned by this module
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lifecycle_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

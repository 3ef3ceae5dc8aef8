// SPDX-License-Identifier: MPL-2.0

//! Small helpers shared by the wrappers

use crate::errors::{BridgeError, BridgeResult};
use std::any::Any;
use std::ffi::CString;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked
///
/// Teardown paths catch panics, so a poisoned lock only means an earlier
/// cascade step failed; the guarded state is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Convert a Rust string for the C boundary
pub(crate) fn cstring(value: &str) -> BridgeResult<CString> {
    CString::new(value).map_err(|_| BridgeError::InvalidString(value.to_string()))
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

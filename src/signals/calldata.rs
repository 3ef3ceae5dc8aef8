// SPDX-License-Identifier: MPL-2.0

use crate::native::{CalldataPtr, NativeApi, OutputHandle, SourceHandle};
use libc::c_void;
use std::ffi::CString;

/// Typed, by-name view of a signal's parameter blob
///
/// Only valid for the duration of the callback it was handed to. Every getter
/// returns `None` when the field is absent or has another type.
pub struct Calldata<'a> {
    api: &'a dyn NativeApi,
    ptr: CalldataPtr,
}

impl<'a> Calldata<'a> {
    /// # Safety
    /// `ptr` must be the blob of a signal invocation that outlives `'a`.
    pub unsafe fn new(api: &'a dyn NativeApi, ptr: CalldataPtr) -> Self {
        Self { api, ptr }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        let name = CString::new(name).ok()?;
        // SAFETY: the blob is alive for `'a` (see `new`).
        unsafe { self.api.calldata_int(self.ptr, &name) }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        let name = CString::new(name).ok()?;
        // SAFETY: see `int`.
        unsafe { self.api.calldata_float(self.ptr, &name) }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        let name = CString::new(name).ok()?;
        // SAFETY: see `int`.
        unsafe { self.api.calldata_bool(self.ptr, &name) }
    }

    pub fn ptr(&self, name: &str) -> Option<*mut c_void> {
        let name = CString::new(name).ok()?;
        // SAFETY: see `int`.
        unsafe { self.api.calldata_ptr(self.ptr, &name) }
    }

    pub fn string(&self, name: &str) -> Option<String> {
        let name = CString::new(name).ok()?;
        // SAFETY: see `int`.
        unsafe { self.api.calldata_string(self.ptr, &name) }
    }

    /// The `source` pointer field, as a borrowed handle
    pub fn source(&self) -> Option<SourceHandle> {
        self.ptr("source").map(SourceHandle::from_ptr)
    }

    /// The `output` pointer field, as a borrowed handle
    pub fn output(&self) -> Option<OutputHandle> {
        self.ptr("output").map(OutputHandle::from_ptr)
    }

    pub fn raw(&self) -> CalldataPtr {
        self.ptr
    }
}

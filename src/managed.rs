// SPDX-License-Identifier: MPL-2.0

//! Single-release ownership of one native handle
//!
//! [`Managed`] couples a handle to an "owns" flag and a release guarantee: the
//! native release runs at most once, and once the wrapper is released every
//! access fails with [`BridgeError::ObjectDisposed`].
//!
//! The flag is this wrapper's claim on the object, not the only claim. The
//! engine keeps its own reference counts; shared-ownership layers (encoder
//! attach counts) are tracked separately on top of this.
//!
//! No synchronisation happens here. A `Managed` has one owner, and disposing
//! the same object from two threads at once is the caller's bug.

use crate::errors::{BridgeError, BridgeResult, ObjectKind};
use crate::native::{
    DataHandle, EncoderHandle, NativeApi, OutputHandle, SceneItemHandle, ServiceHandle,
    SourceHandle,
};
use crate::utils::panic_message;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A handle type the bridge can own and release
pub trait NativeHandle: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const KIND: ObjectKind;

    fn is_null_handle(self) -> bool;

    /// Give one reference back to the engine
    fn release(self, api: &dyn NativeApi);
}

macro_rules! impl_native_handle {
    ($handle:ty, $kind:expr, $release:ident) => {
        impl NativeHandle for $handle {
            const KIND: ObjectKind = $kind;

            fn is_null_handle(self) -> bool {
                self.is_null()
            }

            fn release(self, api: &dyn NativeApi) {
                api.$release(self);
            }
        }
    };
}

impl_native_handle!(DataHandle, ObjectKind::Data, data_release);
impl_native_handle!(SourceHandle, ObjectKind::Source, source_release);
impl_native_handle!(SceneItemHandle, ObjectKind::SceneItem, sceneitem_release);
impl_native_handle!(EncoderHandle, ObjectKind::Encoder, encoder_release);
impl_native_handle!(OutputHandle, ObjectKind::Output, output_release);
impl_native_handle!(ServiceHandle, ObjectKind::Service, service_release);

/// One owned (or borrowed) native handle with a single-shot release
pub struct Managed<H: NativeHandle> {
    api: Arc<dyn NativeApi>,
    handle: H,
    owns: bool,
    released: bool,
}

impl<H: NativeHandle> Managed<H> {
    /// Wrap a handle returned by the engine
    ///
    /// `owns` says whether this wrapper holds a reference it must give back.
    pub fn wrap(api: Arc<dyn NativeApi>, handle: H, owns: bool) -> BridgeResult<Self> {
        if handle.is_null_handle() {
            return Err(BridgeError::InvalidHandle { kind: H::KIND });
        }
        trace!(kind = %H::KIND, %handle, owns, "Wrapping native object");
        Ok(Self {
            api,
            handle,
            owns,
            released: false,
        })
    }

    /// The handle, as long as the wrapper has not been released
    pub fn access(&self) -> BridgeResult<H> {
        if self.released {
            return Err(BridgeError::ObjectDisposed { kind: H::KIND });
        }
        Ok(self.handle)
    }

    /// Release the wrapper's claim. Idempotent.
    ///
    /// Returns whether the native release callback ran on this call. The wrapper
    /// is marked released before the callback so a failing release is never
    /// retried.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        if !self.owns {
            trace!(kind = %H::KIND, handle = %self.handle, "Dropping borrowed native object");
            return false;
        }
        debug!(kind = %H::KIND, handle = %self.handle, "Releasing native object");
        self.handle.release(self.api.as_ref());
        true
    }

    /// Mark released without calling the engine
    ///
    /// For native operations that consume the reference themselves (scene item
    /// removal).
    pub(crate) fn forget(&mut self) {
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn owns(&self) -> bool {
        self.owns
    }

    pub fn api(&self) -> &Arc<dyn NativeApi> {
        &self.api
    }

    /// Identity of the wrapped object, usable after release for bookkeeping only
    pub(crate) fn identity(&self) -> H {
        self.handle
    }
}

impl<H: NativeHandle> Drop for Managed<H> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<H: NativeHandle> fmt::Debug for Managed<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed")
            .field("kind", &H::KIND)
            .field("handle", &self.handle)
            .field("owns", &self.owns)
            .field("released", &self.released)
            .finish()
    }
}

/// Run one step of a disposal cascade
///
/// Errors and panics are logged and discarded so the remaining steps still run.
pub(crate) fn teardown_step<F>(step: &str, f: F)
where
    F: FnOnce() -> BridgeResult<()>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(step, error = %e, "Teardown step failed"),
        Err(payload) => warn!(
            step,
            panic = %panic_message(payload.as_ref()),
            "Teardown step panicked"
        ),
    }
}

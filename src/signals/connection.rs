// SPDX-License-Identifier: MPL-2.0

//! Host closures registered in a native signal table
//!
//! The engine stores a plain function pointer plus an opaque `data` pointer and
//! may call it from any of its threads until the slot is disconnected. The
//! closure is boxed and leaked into that `data` pointer on connect, and only
//! reclaimed after the native disconnect has returned.
//!
//! A source or output handler lives inside its object, so the connection holds
//! its own reference to that object and gives it back after disconnecting.

use super::calldata::Calldata;
use crate::errors::{BridgeError, BridgeResult, ObjectKind};
use crate::managed::Managed;
use crate::native::{CalldataPtr, NativeApi, OutputHandle, SignalHandlerHandle, SourceHandle};
use crate::utils::{cstring, panic_message};
use libc::c_void;
use std::ffi::CString;
use std::panic::AssertUnwindSafe;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::{debug, error};

type Callback = dyn Fn(&Calldata<'_>) + Send + Sync + 'static;

struct TrampolineState {
    api: Arc<dyn NativeApi>,
    signal: String,
    callback: Box<Callback>,
}

/// Owning pointer to the leaked trampoline state
struct StatePtr(NonNull<TrampolineState>);

// SAFETY: the pointee only holds `Send + Sync` data and is never mutated after
// connect; it is freed once, by the connection, after native disconnect.
unsafe impl Send for StatePtr {}
unsafe impl Sync for StatePtr {}

unsafe extern "C" fn trampoline(data: *mut c_void, calldata: *mut c_void) {
    if data.is_null() {
        return;
    }
    // SAFETY: `data` is the state registered in `SignalConnection::connect`,
    // which stays allocated until after the slot is disconnected.
    let state = unsafe { &*(data as *const TrampolineState) };
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: the engine keeps `calldata` alive for this invocation.
        let calldata = unsafe { Calldata::new(state.api.as_ref(), CalldataPtr::from_ptr(calldata)) };
        (state.callback)(&calldata);
    }));
    if let Err(payload) = result {
        error!(
            signal = %state.signal,
            panic = %panic_message(payload.as_ref()),
            "Signal callback panicked"
        );
    }
}

/// The object whose signal table a connection is registered on
#[derive(Debug)]
pub(crate) enum SignalOwner {
    /// Engine-wide table, alive until shutdown
    Global,
    Source(Managed<SourceHandle>),
    Output(Managed<OutputHandle>),
}

impl SignalOwner {
    /// Take a new reference to `source` for the connection's lifetime
    pub(crate) fn source(api: &Arc<dyn NativeApi>, source: SourceHandle) -> BridgeResult<Self> {
        let acquired = api.source_get_ref(source);
        if acquired.is_null() {
            return Err(BridgeError::AcquireFailed {
                kind: ObjectKind::Source,
            });
        }
        Managed::wrap(api.clone(), acquired, true).map(Self::Source)
    }

    /// Take a new reference to `output` for the connection's lifetime
    pub(crate) fn output(api: &Arc<dyn NativeApi>, output: OutputHandle) -> BridgeResult<Self> {
        let acquired = api.output_get_ref(output);
        if acquired.is_null() {
            return Err(BridgeError::AcquireFailed {
                kind: ObjectKind::Output,
            });
        }
        Managed::wrap(api.clone(), acquired, true).map(Self::Output)
    }

    /// The signal table of the owned object
    fn handler(&self, api: &dyn NativeApi) -> SignalHandlerHandle {
        match self {
            Self::Global => api.global_signal_handler(),
            Self::Source(source) => api.source_signal_handler(source.identity()),
            Self::Output(output) => api.output_signal_handler(output.identity()),
        }
    }

    fn release(&mut self) {
        match self {
            Self::Global => {}
            Self::Source(source) => {
                source.release();
            }
            Self::Output(output) => {
                output.release();
            }
        }
    }
}

/// A live registration of a closure on one named signal
///
/// The connection keeps the object owning the signal alive until it is
/// disconnected. Dropping the connection disconnects it.
pub struct SignalConnection {
    api: Arc<dyn NativeApi>,
    owner: SignalOwner,
    handler: SignalHandlerHandle,
    signal: CString,
    state: Option<StatePtr>,
}

impl SignalConnection {
    /// Register `callback` for `signal` on the table of `owner`
    pub(crate) fn connect<F>(
        api: &Arc<dyn NativeApi>,
        owner: SignalOwner,
        signal: &str,
        callback: F,
    ) -> BridgeResult<Self>
    where
        F: Fn(&Calldata<'_>) + Send + Sync + 'static,
    {
        let handler = owner.handler(api.as_ref());
        if handler.is_null() {
            return Err(BridgeError::InvalidHandle {
                kind: ObjectKind::SignalHandler,
            });
        }
        let c_signal = cstring(signal)?;
        let state = Box::new(TrampolineState {
            api: api.clone(),
            signal: signal.to_string(),
            callback: Box::new(callback),
        });
        let state = NonNull::from(Box::leak(state));
        api.signal_connect(handler, &c_signal, trampoline, state.as_ptr().cast());
        debug!(%handler, signal, "Connected signal");

        Ok(Self {
            api: api.clone(),
            owner,
            handler,
            signal: c_signal,
            state: Some(StatePtr(state)),
        })
    }

    /// Unregister the callback. Idempotent.
    pub fn disconnect(&mut self) {
        let Some(StatePtr(state)) = self.state.take() else {
            return;
        };
        self.api
            .signal_disconnect(self.handler, &self.signal, trampoline, state.as_ptr().cast());
        debug!(handler = %self.handler, signal = %self.signal.to_string_lossy(), "Disconnected signal");
        // SAFETY: allocated by `Box::leak` in `connect`; the engine no longer
        // holds the pointer after disconnect.
        drop(unsafe { Box::from_raw(state.as_ptr()) });
        self.owner.release();
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_some()
    }

    pub fn signal(&self) -> &str {
        self.signal.to_str().unwrap_or_default()
    }

    pub fn handler(&self) -> SignalHandlerHandle {
        self.handler
    }
}

impl Drop for SignalConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for SignalConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalConnection")
            .field("handler", &self.handler)
            .field("signal", &self.signal)
            .field("connected", &self.is_connected())
            .finish()
    }
}

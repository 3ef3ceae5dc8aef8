// SPDX-License-Identifier: MPL-2.0

//! Typed opaque handles to native engine objects
//!
//! A handle is only an identity: core logic never dereferences it, it only hands
//! it back to the [`NativeApi`](super::NativeApi). Zero is the null sentinel.

use libc::c_void;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(usize);

        impl $name {
            /// The null handle ("no object")
            #[inline]
            pub const fn null() -> Self {
                Self(0)
            }

            /// Wrap a raw integer handle value
            #[inline]
            pub const fn from_raw(raw: usize) -> Self {
                Self(raw)
            }

            /// Wrap a native pointer
            #[inline]
            pub fn from_ptr<T>(ptr: *mut T) -> Self {
                Self(ptr as usize)
            }

            #[inline]
            pub const fn raw(self) -> usize {
                self.0
            }

            /// Hand the handle back to native code as a pointer
            #[inline]
            pub fn as_ptr<T>(self) -> *mut T {
                self.0 as *mut T
            }

            #[inline]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }
    };
}

define_handle!(
    /// Settings bag (`obs_data_t`)
    DataHandle
);
define_handle!(
    /// Source (`obs_source_t`), including the source side of a scene
    SourceHandle
);
define_handle!(
    /// Scene (`obs_scene_t`)
    SceneHandle
);
define_handle!(
    /// Placement of a source inside a scene (`obs_sceneitem_t`)
    SceneItemHandle
);
define_handle!(
    /// Video or audio encoder (`obs_encoder_t`)
    EncoderHandle
);
define_handle!(
    /// Output (`obs_output_t`)
    OutputHandle
);
define_handle!(
    /// Streaming destination (`obs_service_t`)
    ServiceHandle
);
define_handle!(
    /// Signal table of an object or of the engine (`signal_handler_t`)
    SignalHandlerHandle
);
define_handle!(
    /// Event parameter blob passed to a signal callback (`calldata_t`)
    CalldataPtr
);

/// Native signal callback: `void (*)(void *data, calldata_t *cd)`
pub type SignalCallback = unsafe extern "C" fn(data: *mut c_void, calldata: *mut c_void);

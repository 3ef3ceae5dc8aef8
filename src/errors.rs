// SPDX-License-Identifier: MPL-2.0

//! Error types for the bridge
//!
//! Construction and dependency failures are hard errors. Start/stop outcomes are
//! reported as booleans plus the output's last-error string, and teardown failures
//! are logged and discarded (see [`crate::managed::teardown_step`]).

use std::time::Duration;

/// Result type alias using BridgeError
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Native object kinds, used to label errors and log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Data,
    Source,
    Scene,
    SceneItem,
    Encoder,
    Output,
    Service,
    SignalHandler,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Data => "data",
            ObjectKind::Source => "source",
            ObjectKind::Scene => "scene",
            ObjectKind::SceneItem => "scene item",
            ObjectKind::Encoder => "encoder",
            ObjectKind::Output => "output",
            ObjectKind::Service => "service",
            ObjectKind::SignalHandler => "signal handler",
        };
        f.write_str(name)
    }
}

/// Something an output needs before it can start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// No video encoder attached
    VideoEncoder,
    /// Publishing output without a streaming destination
    Service,
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dependency::VideoEncoder => f.write_str("video encoder"),
            Dependency::Service => f.write_str("service"),
        }
    }
}

/// Main bridge error type
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Attempt to wrap a null handle
    #[error("cannot wrap a null {kind} handle")]
    InvalidHandle { kind: ObjectKind },

    /// Operation attempted after the wrapper was released
    #[error("use of disposed {kind}")]
    ObjectDisposed { kind: ObjectKind },

    /// Native factory returned null (bad type id, engine not initialised, exhaustion)
    #[error("failed to create {kind} of type '{type_id}'")]
    CreationFailed { kind: ObjectKind, type_id: String },

    /// Native side refused to hand out a new reference (object is being destroyed)
    #[error("failed to acquire a new reference to {kind}")]
    AcquireFailed { kind: ObjectKind },

    /// Native scene rejected the source (e.g. a scene added to itself)
    #[error("failed to add source '{source_name}' to scene '{scene}'")]
    AddFailed { scene: String, source_name: String },

    /// Output started without a required dependency
    #[error("output is missing a {0}")]
    MissingDependency(Dependency),

    /// The attached service reports it cannot connect
    #[error("service '{0}' is not configured to connect")]
    ServiceNotConfigurable(String),

    /// Stop did not reach the inactive state within the bound
    #[error("operation timed out after {timeout:?}")]
    OperationTimedOut { timeout: Duration },

    /// Output channel outside the engine's channel table
    #[error("output channel {channel} is out of range (max {max})")]
    InvalidChannel { channel: u32, max: u32 },

    /// Audio track outside the engine's mixer range
    #[error("audio track {track} is out of range (max {max})")]
    InvalidTrack { track: usize, max: usize },

    /// Pause requested on an output that cannot pause
    #[error("output '{0}' does not support pausing")]
    PauseUnsupported(String),

    /// The context was shut down
    #[error("engine context has been shut down")]
    EngineShutDown,

    /// String argument cannot cross the C boundary
    #[error("string contains an interior nul byte: {0:?}")]
    InvalidString(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether this error came from touching a released wrapper
    pub fn is_disposed(&self) -> bool {
        matches!(self, BridgeError::ObjectDisposed { .. })
    }
}

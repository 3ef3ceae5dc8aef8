// SPDX-License-Identifier: MPL-2.0

//! Output status values

use crate::signals::Calldata;
use serde::{Deserialize, Serialize};

/// Result code carried by an output's `stop` signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCode {
    Success,
    BadPath,
    ConnectFailed,
    InvalidStream,
    Error,
    Disconnected,
    Unsupported,
    NoSpace,
    EncodeError,
    Unknown(i64),
}

impl StopCode {
    pub fn from_raw(code: i64) -> Self {
        match code {
            0 => StopCode::Success,
            -1 => StopCode::BadPath,
            -2 => StopCode::ConnectFailed,
            -3 => StopCode::InvalidStream,
            -4 => StopCode::Error,
            -5 => StopCode::Disconnected,
            -6 => StopCode::Unsupported,
            -7 => StopCode::NoSpace,
            -8 => StopCode::EncodeError,
            other => StopCode::Unknown(other),
        }
    }

    pub fn raw(self) -> i64 {
        match self {
            StopCode::Success => 0,
            StopCode::BadPath => -1,
            StopCode::ConnectFailed => -2,
            StopCode::InvalidStream => -3,
            StopCode::Error => -4,
            StopCode::Disconnected => -5,
            StopCode::Unsupported => -6,
            StopCode::NoSpace => -7,
            StopCode::EncodeError => -8,
            StopCode::Unknown(code) => code,
        }
    }

    /// The `code` field of a `stop` signal
    pub fn from_calldata(calldata: &Calldata<'_>) -> Option<Self> {
        calldata.int("code").map(Self::from_raw)
    }

    pub fn is_success(self) -> bool {
        self == StopCode::Success
    }
}

impl std::fmt::Display for StopCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopCode::Success => f.write_str("stopped normally"),
            StopCode::BadPath => f.write_str("invalid output path"),
            StopCode::ConnectFailed => f.write_str("could not connect to server"),
            StopCode::InvalidStream => f.write_str("invalid stream key or path"),
            StopCode::Error => f.write_str("generic output error"),
            StopCode::Disconnected => f.write_str("disconnected from server"),
            StopCode::Unsupported => f.write_str("unsupported settings"),
            StopCode::NoSpace => f.write_str("out of disk space"),
            StopCode::EncodeError => f.write_str("encoder error"),
            StopCode::Unknown(code) => write!(f, "unknown stop code {code}"),
        }
    }
}

/// Frame and byte counters of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputStats {
    pub total_frames: u64,
    pub dropped_frames: u64,
    pub total_bytes: u64,
}

impl OutputStats {
    /// Share of frames dropped, 0.0 when nothing was produced
    pub fn drop_ratio(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.dropped_frames as f64 / self.total_frames as f64
    }
}

/// Lifecycle position of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputState {
    /// No video encoder yet
    Created,
    /// Encoders attached, never started
    Configured,
    Started,
    Paused,
    Reconnecting,
    Stopped,
    Disposed,
}

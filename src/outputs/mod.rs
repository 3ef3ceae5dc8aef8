// SPDX-License-Identifier: MPL-2.0

//! Outputs, services and output status values

pub mod output;
pub mod recording;
pub mod service;
pub mod stop;

pub use output::Output;
pub use recording::{default_recording_dir, recording_file_name, recording_path};
pub use service::Service;
pub use stop::{OutputState, OutputStats, StopCode};

use crate::config::BridgeConfig;
use serde::{Deserialize, Serialize};

/// What an output produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputKind {
    #[default]
    Generic,
    /// File muxer writing to its `path` setting
    Recording,
    /// In-memory buffer saved on demand
    ReplayBuffer,
    /// Publishing to a [`Service`]
    Streaming,
}

impl OutputKind {
    pub fn requires_service(self) -> bool {
        self == OutputKind::Streaming
    }
}

/// Lifetime policy for one output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Detach encoders and dispose the output once it is stopped
    pub auto_dispose: bool,
    /// Register on the context so shutdown tears it down
    pub managed: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            auto_dispose: true,
            managed: true,
        }
    }
}

impl OutputOptions {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            auto_dispose: config.auto_dispose_outputs,
            managed: true,
        }
    }
}

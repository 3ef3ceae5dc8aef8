// SPDX-License-Identifier: MPL-2.0

//! Bridge-wide constants

use std::time::Duration;

/// Number of output channels in the engine's channel table
pub const MAX_CHANNELS: u32 = 64;

/// Number of audio mixes an output can carry
pub const MAX_AUDIO_MIXES: usize = 6;

/// Folder created under the user's videos directory for recordings
pub const RECORDING_FOLDER: &str = "obs-bridge";

/// Directory name under the user's config directory
pub const CONFIG_DIR_NAME: &str = "obs-bridge";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Stop timing defaults
pub mod timing {
    use super::Duration;

    /// How long `stop` waits for an output to report inactive
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(30);

    /// Sleep between activity polls while stopping
    pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);
}

/// Well-known engine type ids
pub mod type_ids {
    /// File muxer used for recordings
    pub const RECORDING_OUTPUT: &str = "ffmpeg_muxer";

    /// In-memory replay buffer
    pub const REPLAY_BUFFER_OUTPUT: &str = "replay_buffer";

    /// RTMP publisher
    pub const STREAMING_OUTPUT: &str = "rtmp_output";

    /// Custom RTMP destination
    pub const CUSTOM_SERVICE: &str = "rtmp_custom";

    pub const X264_ENCODER: &str = "obs_x264";

    pub const AAC_ENCODER: &str = "ffmpeg_aac";

    /// Container for scenes' underlying sources
    pub const SCENE: &str = "scene";
}

/// Native signal names emitted by outputs
pub mod signals {
    pub const START: &str = "start";
    pub const STOP: &str = "stop";
    pub const STARTING: &str = "starting";
    pub const STOPPING: &str = "stopping";
    pub const ACTIVATE: &str = "activate";
    pub const DEACTIVATE: &str = "deactivate";
    pub const RECONNECT: &str = "reconnect";
    pub const RECONNECT_SUCCESS: &str = "reconnect_success";
}

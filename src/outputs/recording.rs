// SPDX-License-Identifier: MPL-2.0

//! Recording file naming

use crate::constants::RECORDING_FOLDER;
use crate::errors::BridgeResult;
use std::path::{Path, PathBuf};
use tracing::info;

/// `REC_<local timestamp>.<extension>`
pub fn recording_file_name(extension: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("REC_{}.{}", timestamp, extension.trim_start_matches('.'))
}

pub fn recording_path(dir: &Path, extension: &str) -> PathBuf {
    dir.join(recording_file_name(extension))
}

/// `<videos>/obs-bridge`, or `./obs-bridge` without a videos directory
pub fn default_recording_dir() -> PathBuf {
    dirs::video_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(RECORDING_FOLDER)
}

/// Create `dir` if needed
pub fn ensure_recording_dir(dir: &Path) -> BridgeResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    info!(path = %dir.display(), "Recording directory ready");
    Ok(dir.to_path_buf())
}

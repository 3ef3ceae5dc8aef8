// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use obs_bridge::constants::{MAX_AUDIO_MIXES, MAX_CHANNELS, signals, timing, type_ids};

#[test]
fn test_engine_table_sizes() {
    assert_eq!(MAX_CHANNELS, 64);
    assert_eq!(MAX_AUDIO_MIXES, 6);
}

#[test]
fn test_poll_interval_shorter_than_timeout() {
    // Several polls must fit into one stop window
    assert!(timing::STOP_POLL_INTERVAL * 10 < timing::STOP_TIMEOUT);
}

#[test]
fn test_type_ids_are_distinct() {
    let ids = [
        type_ids::RECORDING_OUTPUT,
        type_ids::REPLAY_BUFFER_OUTPUT,
        type_ids::STREAMING_OUTPUT,
        type_ids::CUSTOM_SERVICE,
        type_ids::X264_ENCODER,
        type_ids::AAC_ENCODER,
        type_ids::SCENE,
    ];
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            assert_ne!(a, b, "Type ids should not collide");
        }
    }
}

#[test]
fn test_output_signal_names() {
    assert_eq!(signals::START, "start");
    assert_eq!(signals::STOP, "stop");
}

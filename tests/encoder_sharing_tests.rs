// SPDX-License-Identifier: MPL-2.0

//! Integration tests for encoders shared between outputs

use obs_bridge::native::mock::{MockCall, MockEngine};
use obs_bridge::{Context, Encoder, ObjectKind, Output, OutputOptions, OutputKind};
use std::path::Path;

fn encoder_refs(engine: &MockEngine, handle: usize) -> (usize, usize) {
    let addrefs = engine.count(|c| matches!(c, MockCall::AddRef { handle: h, .. } if *h == handle));
    let releases =
        engine.count(|c| matches!(c, MockCall::Release { handle: h, .. } if *h == handle));
    (addrefs, releases)
}

#[test]
fn test_attach_sequence_takes_single_extra_reference() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    let raw = encoder.handle().unwrap().raw();

    assert_eq!(encoder.attach().unwrap(), 1);
    assert_eq!(encoder.attach().unwrap(), 2);
    assert_eq!(encoder.detach(), 1);
    assert_eq!(encoder.detach(), 0);

    let (addrefs, releases) = encoder_refs(&engine, raw);
    assert_eq!(addrefs, 1, "only the first attach takes a reference");
    assert_eq!(releases, 1, "only the last detach gives it back");
    assert!(engine.is_alive(raw), "the creator still holds its reference");
}

#[test]
fn test_two_outputs_share_one_encoder() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    let raw = encoder.handle().unwrap().raw();

    let recording = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();
    let replay = Output::replay_buffer(&ctx, "replay", None).unwrap();
    recording.set_video_encoder(&encoder).unwrap();
    replay.set_video_encoder(&encoder).unwrap();
    assert_eq!(encoder.attach_count(), 2);

    recording.dispose();
    assert_eq!(encoder.attach_count(), 1);
    assert!(engine.is_alive(raw));

    replay.dispose();
    assert_eq!(encoder.attach_count(), 0);

    let (addrefs, releases) = encoder_refs(&engine, raw);
    assert_eq!((addrefs, releases), (1, 1));
}

#[test]
fn test_disposed_encoder_lives_until_outputs_detach() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    let raw = encoder.handle().unwrap().raw();
    let output = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();
    output.set_video_encoder(&encoder).unwrap();

    encoder.dispose();
    assert!(encoder.is_disposed());
    assert!(engine.is_alive(raw), "the attached output keeps it alive");

    assert!(output.start().unwrap());
    assert!(output.stop_default());
    assert!(!engine.is_alive(raw));
    assert!(engine.violations().is_empty());
}

#[test]
fn test_disposed_encoder_cannot_be_attached() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    let output = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();

    encoder.dispose();

    assert!(output.set_video_encoder(&encoder).unwrap_err().is_disposed());
    assert_eq!(encoder.attach_count(), 0);
    assert!(output.video_encoder().is_none());
}

#[test]
fn test_audio_encoder_shared_across_tracks() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let audio = Encoder::audio(&ctx, "ffmpeg_aac", "audio", None, 0).unwrap();
    let output = Output::create(
        &ctx,
        OutputKind::Generic,
        "ffmpeg_muxer",
        "rec",
        None,
        OutputOptions::default(),
    )
    .unwrap();

    output.set_audio_encoder(&audio, 0).unwrap();
    output.set_audio_encoder(&audio, 1).unwrap();
    assert_eq!(audio.attach_count(), 2);
    assert!(output.audio_encoder(1).unwrap().same_encoder(&audio));

    output.dispose();
    assert_eq!(audio.attach_count(), 0);
    assert_eq!(audio.codec().unwrap().as_deref(), Some("aac"));
}

#[test]
fn test_output_detaches_before_its_own_release() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    let encoder_raw = encoder.handle().unwrap().raw();
    let output = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();
    let output_raw = output.handle().unwrap().raw();
    output.set_video_encoder(&encoder).unwrap();
    engine.clear_calls();

    output.dispose();

    let calls = engine.calls();
    let detach = calls
        .iter()
        .position(|c| matches!(c, MockCall::SetVideoEncoder { output, encoder: 0 } if *output == output_raw))
        .expect("video encoder slot should be cleared");
    let extra_release = calls
        .iter()
        .position(|c| matches!(c, MockCall::Release { handle, .. } if *handle == encoder_raw))
        .expect("extra encoder reference should be released");
    let output_release = calls
        .iter()
        .position(|c| {
            matches!(c, MockCall::Release { kind: ObjectKind::Output, handle } if *handle == output_raw)
        })
        .expect("output should be released");
    assert!(detach < output_release);
    assert!(extra_release < output_release);
}

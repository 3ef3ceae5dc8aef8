// SPDX-License-Identifier: MPL-2.0

//! Integration tests for output start/stop and auto-dispose

use obs_bridge::native::mock::{MockCall, MockEngine, StopBehavior};
use obs_bridge::{
    BridgeConfig, BridgeError, Context, Dependency, Encoder, Output, OutputKind, OutputOptions,
    OutputState, OutputStats, Service,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn setup() -> (Arc<MockEngine>, Context) {
    obs_bridge::logging::init_for_tests();
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    (engine, ctx)
}

fn recording_with_encoder(ctx: &Context) -> (Output, Encoder) {
    let output = Output::recording(ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();
    let encoder = Encoder::video(ctx, "obs_x264", "video", None).unwrap();
    output.set_video_encoder(&encoder).unwrap();
    (output, encoder)
}

fn starts(engine: &MockEngine) -> usize {
    engine.count(|c| matches!(c, MockCall::OutputStart { .. }))
}

#[test]
fn test_start_without_video_encoder_never_reaches_engine() {
    let (engine, ctx) = setup();
    let output = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();

    let err = output.start().unwrap_err();

    assert!(matches!(
        err,
        BridgeError::MissingDependency(Dependency::VideoEncoder)
    ));
    assert_eq!(starts(&engine), 0);
}

#[test]
fn test_streaming_without_service_never_reaches_engine() {
    let (engine, ctx) = setup();
    let output = Output::streaming(&ctx, "stream", None).unwrap();
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    output.set_video_encoder(&encoder).unwrap();

    let err = output.start().unwrap_err();

    assert!(matches!(
        err,
        BridgeError::MissingDependency(Dependency::Service)
    ));
    assert_eq!(starts(&engine), 0);
}

#[test]
fn test_streaming_starts_with_service() {
    let (_engine, ctx) = setup();
    let output = Output::streaming(&ctx, "stream", None).unwrap();
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    let service = Service::create(&ctx, "rtmp_custom", "dest", None).unwrap();
    output.set_video_encoder(&encoder).unwrap();
    output.set_service(&service).unwrap();

    assert!(output.start().unwrap());
    assert!(output.is_active().unwrap());
    assert!(output.stop_default());

    // The shared service outlives the output
    assert!(!service.is_disposed());
}

#[test]
fn test_stop_timeout_returns_false_then_disposes() {
    let (engine, ctx) = setup();
    engine.set_default_stop_behavior(StopBehavior::Never);
    let (output, encoder) = recording_with_encoder(&ctx);
    let output_raw = output.handle().unwrap().raw();
    assert!(output.start().unwrap());

    let started = Instant::now();
    let stopped = output.stop(true, Duration::from_millis(100));
    let elapsed = started.elapsed();

    assert!(!stopped, "stop should report the timeout");
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(5), "stop took {elapsed:?}");

    // The cascade still ran: forced stop, encoders detached, output released
    assert!(output.is_disposed());
    assert_eq!(encoder.attach_count(), 0);
    assert_eq!(
        engine.count(|c| matches!(c, MockCall::OutputForceStop { .. })),
        1
    );
    assert!(!engine.is_alive(output_raw));
    assert!(engine.violations().is_empty());
}

#[test]
fn test_stop_checked_reports_timeout() {
    let (engine, ctx) = setup();
    engine.set_default_stop_behavior(StopBehavior::Never);
    let (output, _encoder) = recording_with_encoder(&ctx);
    assert!(output.start().unwrap());

    let err = output.stop_checked(Duration::from_millis(20)).unwrap_err();

    assert!(matches!(err, BridgeError::OperationTimedOut { .. }));
    assert!(output.is_disposed());
}

#[test]
fn test_stop_waits_for_delayed_completion() {
    let (engine, ctx) = setup();
    engine.set_default_stop_behavior(StopBehavior::AfterPolls(3));
    let (output, encoder) = recording_with_encoder(&ctx);
    assert!(output.start().unwrap());

    assert!(output.stop(true, Duration::from_secs(5)));

    assert!(output.is_disposed());
    assert_eq!(encoder.attach_count(), 0);
    assert_eq!(
        engine.count(|c| matches!(c, MockCall::OutputForceStop { .. })),
        0,
        "a confirmed stop should not be forced"
    );
}

#[test]
fn test_non_waiting_stop_defers_dispose() {
    let (engine, ctx) = setup();
    engine.set_default_stop_behavior(StopBehavior::AfterPolls(3));
    let (output, encoder) = recording_with_encoder(&ctx);
    assert!(output.start().unwrap());

    assert!(!output.stop(false, Duration::ZERO));
    assert!(!output.is_disposed());
    assert_eq!(encoder.attach_count(), 1);

    let mut polls = 0;
    while output.is_active().unwrap() {
        polls += 1;
        assert!(polls < 10, "stop never completed");
    }

    assert!(output.is_disposed());
    assert_eq!(encoder.attach_count(), 0);
    assert!(output.is_active().unwrap_err().is_disposed());
}

#[test]
fn test_stop_without_auto_dispose_keeps_output() {
    let engine = MockEngine::new();
    let config = BridgeConfig {
        auto_dispose_outputs: false,
        ..BridgeConfig::default()
    };
    let ctx = Context::new(engine.api(), config);
    let (output, encoder) = recording_with_encoder(&ctx);
    assert!(!output.options().auto_dispose);

    assert!(output.start().unwrap());
    assert!(output.stop_default());
    assert!(!output.is_disposed());
    assert_eq!(output.state(), OutputState::Stopped);
    assert_eq!(encoder.attach_count(), 1);

    // Restartable until disposed
    assert!(output.start().unwrap());
    output.dispose();
    assert_eq!(encoder.attach_count(), 0);
}

#[test]
fn test_stop_on_disposed_or_idle_output_succeeds() {
    let (engine, ctx) = setup();
    let (output, _encoder) = recording_with_encoder(&ctx);

    assert!(output.stop_default(), "stopping an idle output succeeds");
    assert!(output.is_disposed());
    assert!(output.stop_default(), "stopping a disposed output succeeds");
    assert_eq!(engine.count(|c| matches!(c, MockCall::OutputStop { .. })), 0);
}

#[test]
fn test_failed_start_reports_last_error() {
    let (engine, ctx) = setup();
    let (output, _encoder) = recording_with_encoder(&ctx);
    engine.fail_start(output.handle().unwrap(), "disk full");

    assert!(!output.start().unwrap());
    assert_eq!(output.last_error().unwrap().as_deref(), Some("disk full"));
    assert_eq!(output.state(), OutputState::Configured);
}

#[test]
fn test_state_tracks_lifecycle() {
    let (engine, ctx) = setup();
    let output = Output::create(
        &ctx,
        OutputKind::Recording,
        "ffmpeg_muxer",
        "rec",
        None,
        OutputOptions::default(),
    )
    .unwrap();
    assert_eq!(output.state(), OutputState::Created);

    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    output.set_video_encoder(&encoder).unwrap();
    assert_eq!(output.state(), OutputState::Configured);

    assert!(output.start().unwrap());
    assert_eq!(output.state(), OutputState::Started);

    engine.set_reconnecting(output.handle().unwrap(), true);
    assert_eq!(output.state(), OutputState::Reconnecting);
    assert!(output.is_reconnecting().unwrap());

    output.dispose();
    assert_eq!(output.state(), OutputState::Disposed);
}

#[test]
fn test_stats_come_from_engine() {
    let (engine, ctx) = setup();
    let (output, _encoder) = recording_with_encoder(&ctx);
    engine.set_output_stats(output.handle().unwrap(), 600, 6, 1_048_576);

    let stats = output.stats().unwrap();

    assert_eq!(
        stats,
        OutputStats {
            total_frames: 600,
            dropped_frames: 6,
            total_bytes: 1_048_576,
        }
    );
    assert!((stats.drop_ratio() - 0.01).abs() < 1e-9);
}

#[test]
fn test_recording_path_lands_in_settings() {
    let (engine, ctx) = setup();
    let output = Output::recording(&ctx, "rec", Path::new("/tmp/out/REC_1.mkv")).unwrap();

    let settings = engine.settings_of(output.handle().unwrap().raw()).unwrap();

    assert_eq!(settings["path"], "/tmp/out/REC_1.mkv");
    assert_eq!(output.kind(), OutputKind::Recording);
    assert_eq!(output.type_id(), "ffmpeg_muxer");
}

#[test]
fn test_shutdown_disposes_managed_outputs() {
    let (engine, ctx) = setup();
    let (output, encoder) = recording_with_encoder(&ctx);
    assert!(output.start().unwrap());
    assert_eq!(ctx.managed_output_count(), 1);

    ctx.shutdown();

    assert!(output.is_disposed());
    assert_eq!(encoder.attach_count(), 0);
    assert_eq!(ctx.managed_output_count(), 0);
    assert!(matches!(
        Output::recording(&ctx, "late", Path::new("/tmp/late.mkv")),
        Err(BridgeError::EngineShutDown)
    ));
    assert!(engine.violations().is_empty());
}

#[test]
fn test_unmanaged_outputs_are_left_to_their_owner() {
    let (_engine, ctx) = setup();
    let options = OutputOptions {
        auto_dispose: true,
        managed: false,
    };
    let output = Output::create(&ctx, OutputKind::Generic, "ffmpeg_muxer", "rec", None, options)
        .unwrap();
    assert_eq!(ctx.managed_output_count(), 0);

    ctx.shutdown();

    assert!(!output.is_disposed());
}

#[test]
fn test_dropping_output_unregisters_it() {
    let (_engine, ctx) = setup();
    {
        let _output = Output::replay_buffer(&ctx, "replay", None).unwrap();
        assert_eq!(ctx.managed_output_count(), 1);
    }
    assert_eq!(ctx.managed_output_count(), 0);
}

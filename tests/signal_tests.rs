// SPDX-License-Identifier: MPL-2.0

//! Integration tests for signal subscriptions

use obs_bridge::constants::signals;
use obs_bridge::native::mock::{MockCall, MockCalldata, MockEngine};
use obs_bridge::{Context, Encoder, Output, OutputKind, OutputOptions, Source, StopCode};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn setup() -> (Arc<MockEngine>, Context) {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    (engine, ctx)
}

#[test]
fn test_stop_signal_fires_once_with_code() {
    let (engine, ctx) = setup();
    let output = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    output.set_video_encoder(&encoder).unwrap();
    engine.set_stop_code(output.handle().unwrap(), -5);

    let fired = Arc::new(AtomicUsize::new(0));
    let code = Arc::new(Mutex::new(None));
    let _connection = {
        let fired = fired.clone();
        let code = code.clone();
        output
            .connect_signal(signals::STOP, move |calldata| {
                fired.fetch_add(1, Ordering::SeqCst);
                *code.lock().unwrap() = StopCode::from_calldata(calldata);
            })
            .unwrap()
    };

    assert!(output.start().unwrap());
    assert!(output.stop_default());

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(*code.lock().unwrap(), Some(StopCode::Disconnected));
}

#[test]
fn test_no_callback_after_disconnect() {
    let (engine, ctx) = setup();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let mut connection = {
        let fired = fired.clone();
        source
            .connect_signal("rename", move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
    };
    let handler = connection.handler();

    assert_eq!(engine.emit(handler, "rename", &MockCalldata::new()), 1);
    connection.disconnect();
    assert!(!connection.is_connected());
    assert_eq!(engine.emit(handler, "rename", &MockCalldata::new()), 0);

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(engine.connected(handler, "rename"), 0);
}

#[test]
fn test_dropping_connection_disconnects() {
    let (engine, ctx) = setup();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    let connection = source.connect_signal("update", |_| {}).unwrap();
    let handler = connection.handler();
    assert_eq!(engine.connected(handler, "update"), 1);

    drop(connection);

    assert_eq!(engine.connected(handler, "update"), 0);
}

#[test]
fn test_calldata_fields_reach_callback() {
    let (engine, ctx) = setup();
    let seen = Arc::new(Mutex::new(None));
    let connection = {
        let seen = seen.clone();
        ctx.connect_signal("source_rename", move |calldata| {
            *seen.lock().unwrap() = Some((
                calldata.string("new_name"),
                calldata.string("prev_name"),
                calldata.int("missing"),
                calldata.bool("flag"),
                calldata.float("volume"),
            ));
        })
        .unwrap()
    };

    let delivered = engine.emit(
        connection.handler(),
        "source_rename",
        &MockCalldata::new()
            .with_string("new_name", "blue")
            .with_string("prev_name", "red")
            .with_bool("flag", true)
            .with_float("volume", 0.5),
    );

    assert_eq!(delivered, 1);
    let seen = seen.lock().unwrap().clone().unwrap();
    assert_eq!(seen.0.as_deref(), Some("blue"));
    assert_eq!(seen.1.as_deref(), Some("red"));
    assert_eq!(seen.2, None, "absent fields are None, not zero");
    assert_eq!(seen.3, Some(true));
    assert_eq!(seen.4, Some(0.5));
}

#[test]
fn test_panicking_callback_does_not_stop_others() {
    let (engine, ctx) = setup();
    let fired = Arc::new(AtomicUsize::new(0));
    let _bad = ctx
        .connect_signal("source_create", |_| panic!("callback failure"))
        .unwrap();
    let good = {
        let fired = fired.clone();
        ctx.connect_signal("source_create", move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap()
    };

    let delivered = engine.emit(good.handler(), "source_create", &MockCalldata::new());

    assert_eq!(delivered, 2);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_output_pointer_in_start_signal() {
    let (_engine, ctx) = setup();
    let output = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    output.set_video_encoder(&encoder).unwrap();
    let seen = Arc::new(Mutex::new(None));
    let _connection = {
        let seen = seen.clone();
        output
            .connect_signal(signals::START, move |calldata| {
                *seen.lock().unwrap() = calldata.output();
            })
            .unwrap()
    };

    assert!(output.start().unwrap());

    assert_eq!(*seen.lock().unwrap(), Some(output.handle().unwrap()));
}

#[test]
fn test_disconnected_stop_signal_stays_silent_on_restart() {
    let (engine, ctx) = setup();
    let options = OutputOptions {
        auto_dispose: false,
        ..OutputOptions::default()
    };
    let output =
        Output::create(&ctx, OutputKind::Recording, "ffmpeg_muxer", "rec", None, options).unwrap();
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    output.set_video_encoder(&encoder).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let code = Arc::new(Mutex::new(None));
    let mut connection = {
        let fired = fired.clone();
        let code = code.clone();
        output
            .connect_signal(signals::STOP, move |calldata| {
                fired.fetch_add(1, Ordering::SeqCst);
                *code.lock().unwrap() = calldata.int("code");
            })
            .unwrap()
    };

    assert!(output.start().unwrap());
    assert!(output.stop_default());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(*code.lock().unwrap(), Some(0));

    connection.disconnect();
    assert!(output.start().unwrap());
    assert!(output.stop_default());

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!output.is_disposed());
    assert!(engine.violations().is_empty());
}

#[test]
fn test_connection_keeps_disposed_output_alive_until_disconnect() {
    let (engine, ctx) = setup();
    let output = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();
    let raw = output.handle().unwrap().raw();
    let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
    output.set_video_encoder(&encoder).unwrap();
    let connection = output.connect_signal(signals::STOP, |_| {}).unwrap();

    assert!(output.start().unwrap());
    assert!(output.stop_default());
    assert!(output.is_disposed());
    assert!(engine.is_alive(raw), "the connection still holds the output");
    assert!(connection.is_connected());

    drop(connection);

    assert!(!engine.is_alive(raw));
    let calls = engine.calls();
    let disconnect = calls
        .iter()
        .position(|c| matches!(c, MockCall::SignalDisconnect { .. }))
        .unwrap();
    let destroy = calls
        .iter()
        .position(|c| matches!(c, MockCall::Destroy { handle, .. } if *handle == raw))
        .unwrap();
    assert!(disconnect < destroy, "disconnect must reach a live signal table");
    assert!(engine.violations().is_empty());
}

#[test]
fn test_connection_outlives_source_dispose() {
    let (engine, ctx) = setup();
    let mut source = Source::create(&ctx, "color_source", "red", None).unwrap();
    let raw = source.handle().unwrap().raw();
    let mut connection = source.connect_signal("rename", |_| {}).unwrap();

    source.dispose();
    assert!(engine.is_alive(raw));

    connection.disconnect();

    assert!(!engine.is_alive(raw));
    assert!(engine.violations().is_empty());
}

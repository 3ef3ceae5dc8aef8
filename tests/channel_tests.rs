// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the output channel registry

use obs_bridge::constants::MAX_CHANNELS;
use obs_bridge::native::mock::MockEngine;
use obs_bridge::{BridgeError, Context, Scene, Source};
use std::sync::Arc;

fn setup() -> (Arc<MockEngine>, Context) {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    (engine, ctx)
}

#[test]
fn test_scene_program_channel_cleared_on_dispose() {
    let (engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let raw = scene.source_handle().unwrap().raw();

    assert_eq!(scene.set_as_program(0).unwrap(), None);
    assert_eq!(engine.channel(0), Some(raw));
    assert_eq!(scene.assigned_channel(), Some(0));

    scene.dispose();

    assert_eq!(engine.channel(0), None);
    assert_eq!(ctx.channel_source(0), None);
    assert!(ctx.assigned_channels().is_empty());
}

#[test]
fn test_reassignment_leaves_new_scene_on_channel() {
    let (engine, ctx) = setup();
    let mut a = Scene::create(&ctx, "a").unwrap();
    let mut b = Scene::create(&ctx, "b").unwrap();
    let a_handle = a.source_handle().unwrap();
    let b_handle = b.source_handle().unwrap();

    a.set_as_program(0).unwrap();
    let displaced = b.set_as_program(0).unwrap();
    assert_eq!(displaced, Some(a_handle), "A should be reported as displaced");
    assert!(!a.is_disposed(), "the displaced scene is left to its owner");

    // A no longer owns the channel, so disposing it must not clear B
    a.dispose();
    assert_eq!(engine.channel(0), Some(b_handle.raw()));
    assert_eq!(ctx.channel_source(0), Some(b_handle));

    b.dispose();
    assert_eq!(engine.channel(0), None);
    assert!(engine.violations().is_empty());
}

#[test]
fn test_moving_source_between_channels() {
    let (engine, ctx) = setup();
    let mut source = Source::create(&ctx, "color_source", "red", None).unwrap();
    let raw = source.handle().unwrap().raw();

    source.set_as_program(1).unwrap();
    source.set_as_program(2).unwrap();

    assert_eq!(engine.channel(1), None);
    assert_eq!(engine.channel(2), Some(raw));
    assert_eq!(ctx.assigned_channels(), vec![2]);

    source.dispose();
    assert_eq!(engine.channel(2), None);
}

#[test]
fn test_channel_out_of_range() {
    let (_engine, ctx) = setup();
    let mut source = Source::create(&ctx, "color_source", "red", None).unwrap();

    let err = source.set_as_program(MAX_CHANNELS).unwrap_err();

    assert!(matches!(
        err,
        BridgeError::InvalidChannel { channel, max } if channel == MAX_CHANNELS && max == MAX_CHANNELS
    ));
    assert_eq!(source.assigned_channel(), None);
    assert!(ctx.output_source(MAX_CHANNELS).is_err());
}

#[test]
fn test_output_source_takes_new_reference() {
    let (engine, ctx) = setup();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    ctx.set_output_source(3, &source).unwrap();
    let raw = source.handle().unwrap().raw();
    let before = engine.ref_count(raw);

    let live = ctx.output_source(3).unwrap().unwrap();
    assert_eq!(live.handle().unwrap(), source.handle().unwrap());
    assert_eq!(engine.ref_count(raw), before + 1);

    drop(live);
    assert_eq!(engine.ref_count(raw), before);
    assert!(ctx.output_source(4).unwrap().is_none());
}

#[test]
fn test_clear_output_channel() {
    let (engine, ctx) = setup();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    ctx.set_output_source(5, &source).unwrap();

    let previous = ctx.clear_output_channel(5).unwrap();

    assert_eq!(previous, Some(source.handle().unwrap()));
    assert_eq!(engine.channel(5), None);
    assert_eq!(ctx.clear_output_channel(5).unwrap(), None);
}

#[test]
fn test_shutdown_clears_every_channel() {
    let (engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    scene.set_as_program(0).unwrap();
    ctx.set_output_source(1, &source).unwrap();

    ctx.shutdown();

    assert!(ctx.is_shut_down());
    assert_eq!(engine.channel(0), None);
    assert_eq!(engine.channel(1), None);
    assert!(matches!(
        Scene::create(&ctx, "late"),
        Err(BridgeError::EngineShutDown)
    ));

    // Disposing after shutdown finds its slot already gone
    scene.dispose();
    assert!(engine.violations().is_empty());
}

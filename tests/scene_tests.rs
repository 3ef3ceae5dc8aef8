// SPDX-License-Identifier: MPL-2.0

//! Integration tests for scenes, scene items and the scene disposal cascade

use obs_bridge::native::mock::{MockCall, MockEngine};
use obs_bridge::sources::{BoundsType, Crop, OrderMovement, Transform, Vec2};
use obs_bridge::{Context, ObjectKind, Scene, Source};

fn setup() -> (std::sync::Arc<MockEngine>, Context) {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    (engine, ctx)
}

/// Positions of release calls for `kind` in the call log
fn release_positions(calls: &[MockCall], kind: ObjectKind) -> Vec<usize> {
    calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, MockCall::Release { kind: k, .. } if *k == kind))
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn test_dispose_releases_items_before_scene() {
    let (engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let sources: Vec<Source> = ["a", "b", "c"]
        .iter()
        .map(|name| Source::create(&ctx, "color_source", name, None).unwrap())
        .collect();
    for source in &sources {
        scene.add_source(source).unwrap();
    }
    engine.clear_calls();

    scene.dispose();

    let calls = engine.calls();
    let items = release_positions(&calls, ObjectKind::SceneItem);
    let scenes = release_positions(&calls, ObjectKind::Scene);
    assert_eq!(items.len(), 3, "every tracked item should be released once");
    assert_eq!(scenes.len(), 1, "the scene should be released exactly once");
    assert!(
        items.iter().all(|&i| i < scenes[0]),
        "items must be released before the scene"
    );
    assert!(engine.violations().is_empty());
}

#[test]
fn test_cascade_survives_panicking_item_release() {
    let (engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let sources: Vec<Source> = ["a", "b", "c"]
        .iter()
        .map(|name| Source::create(&ctx, "color_source", name, None).unwrap())
        .collect();
    let items: Vec<_> = sources
        .iter()
        .map(|source| scene.add_source(source).unwrap())
        .collect();
    engine.panic_on_release(items[1].handle().unwrap().raw());
    engine.clear_calls();

    scene.dispose();

    let calls = engine.calls();
    let item_releases = release_positions(&calls, ObjectKind::SceneItem);
    let scene_releases = release_positions(&calls, ObjectKind::Scene);
    assert_eq!(item_releases.len(), 3);
    assert_eq!(scene_releases.len(), 1);
    assert!(item_releases.iter().all(|&i| i < scene_releases[0]));
    assert!(scene.is_disposed());
    assert!(items.iter().all(|item| item.is_disposed()));
}

#[test]
fn test_dispose_is_idempotent() {
    let (engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    scene.add_source(&source).unwrap();

    scene.dispose();
    scene.dispose();
    drop(scene);

    assert_eq!(
        engine.count(|c| matches!(c, MockCall::Release { kind: ObjectKind::Scene, .. })),
        1
    );
    assert!(engine.violations().is_empty());
}

#[test]
fn test_item_handles_fail_after_scene_dispose() {
    let (_engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    let item = scene.add_source(&source).unwrap();

    scene.dispose();

    assert!(item.position().unwrap_err().is_disposed());
    assert!(scene.add_source(&source).unwrap_err().is_disposed());
    assert!(scene.find_source("red").unwrap_err().is_disposed());
}

#[test]
fn test_full_teardown_leaves_engine_empty() {
    let (engine, ctx) = setup();
    {
        let mut scene = Scene::create(&ctx, "main").unwrap();
        let background = Source::create(&ctx, "color_source", "background", None).unwrap();
        let overlay = Source::create(&ctx, "image_source", "overlay", None).unwrap();
        scene.add_source(&background).unwrap();
        let item = scene.add_source(&overlay).unwrap();
        item.set_visible(false).unwrap();
        scene.set_as_program(0).unwrap();
    }
    assert_eq!(engine.live_objects(), 0);
    assert_eq!(engine.channel(0), None);
    assert!(engine.violations().is_empty());
}

#[test]
fn test_nested_scene_teardown_in_either_order() {
    let (engine, ctx) = setup();
    let mut outer = Scene::create(&ctx, "outer").unwrap();
    let mut inner = Scene::create(&ctx, "inner").unwrap();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    inner.add_source(&source).unwrap();
    outer.add_source(inner.source()).unwrap();

    // Removing the inner scene pulls it out of the outer one
    inner.dispose();
    assert_eq!(
        engine.scene_items(outer.source_handle().unwrap()).len(),
        0
    );
    outer.dispose();
    drop(source);

    assert_eq!(engine.live_objects(), 0);
    assert!(engine.violations().is_empty());
}

#[test]
fn test_item_transform_round_trip() {
    let (_engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    let item = scene.add_source(&source).unwrap();

    let transform = Transform {
        position: Vec2::new(100.0, 50.0),
        rotation: 90.0,
        scale: Vec2::new(0.5, 0.5),
        bounds: Vec2::new(1280.0, 720.0),
        bounds_type: BoundsType::ScaleInner,
        crop: Crop::new(1, 2, 3, 4),
    };
    item.set_transform(&transform).unwrap();
    assert_eq!(item.transform().unwrap(), transform);

    item.set_locked(true).unwrap().set_visible(false).unwrap();
    assert!(item.locked().unwrap());
    assert!(!item.visible().unwrap());
}

#[test]
fn test_item_order_moves() {
    let (_engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let a = Source::create(&ctx, "color_source", "a", None).unwrap();
    let b = Source::create(&ctx, "color_source", "b", None).unwrap();
    let first = scene.add_source(&a).unwrap();
    let second = scene.add_source(&b).unwrap();
    assert_eq!(first.order_position().unwrap(), 0);
    assert_eq!(second.order_position().unwrap(), 1);

    first.set_order(OrderMovement::MoveTop).unwrap();
    assert_eq!(first.order_position().unwrap(), 1);
    assert_eq!(second.order_position().unwrap(), 0);
}

#[test]
fn test_item_source_is_independently_owned() {
    let (engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();
    let item = scene.add_source(&source).unwrap();

    let shown = item.source().unwrap();
    assert_eq!(shown.handle().unwrap(), source.handle().unwrap());
    assert_eq!(shown.name().unwrap(), "red");
    drop(shown);

    assert!(engine.is_alive(source.handle().unwrap().raw()));
}

#[test]
fn test_removal_through_found_item_updates_scene_items() {
    let (engine, ctx) = setup();
    let mut scene = Scene::create(&ctx, "main").unwrap();
    let red = Source::create(&ctx, "color_source", "red", None).unwrap();
    let blue = Source::create(&ctx, "color_source", "blue", None).unwrap();
    let tracked = scene.add_source(&red).unwrap();
    scene.add_source(&blue).unwrap();
    assert_eq!(scene.item_count(), 2);

    let found = scene.find_source("red").unwrap().unwrap();
    assert!(!found.same_wrapper(&tracked));
    found.remove();

    assert!(tracked.is_removed());
    assert_eq!(scene.item_count(), 1);
    assert_eq!(scene.items().len(), 1);

    // The scene still gives back the reference it tracked
    scene.dispose();
    assert!(tracked.is_disposed());
    assert!(engine.violations().is_empty());
}

// SPDX-License-Identifier: MPL-2.0

//! Integration tests for single-release ownership

use obs_bridge::native::mock::{MockCall, MockEngine};
use obs_bridge::native::{DataHandle, NativeApi};
use obs_bridge::{BridgeError, Context, DataObject, Managed, ObjectKind, Source};

fn releases_of(engine: &MockEngine, handle: usize) -> usize {
    engine.count(|c| matches!(c, MockCall::Release { handle: h, .. } if *h == handle))
}

#[test]
fn test_double_release_runs_native_release_once() {
    let engine = MockEngine::new();
    let handle = engine.api().data_create();
    let mut managed = Managed::wrap(engine.api(), handle, true).unwrap();

    assert!(managed.release(), "first release should reach the engine");
    assert!(!managed.release(), "second release should be a no-op");
    drop(managed);

    assert_eq!(releases_of(&engine, handle.raw()), 1);
    assert!(engine.violations().is_empty());
}

#[test]
fn test_access_after_release_fails() {
    let engine = MockEngine::new();
    let handle = engine.api().data_create();
    let mut managed = Managed::wrap(engine.api(), handle, true).unwrap();
    assert_eq!(managed.access().unwrap(), handle);

    managed.release();

    let err = managed.access().unwrap_err();
    assert!(matches!(
        err,
        BridgeError::ObjectDisposed {
            kind: ObjectKind::Data
        }
    ));
}

#[test]
fn test_wrap_null_is_invalid_handle() {
    let engine = MockEngine::new();
    let result = Managed::wrap(engine.api(), DataHandle::null(), true);
    assert!(matches!(result, Err(BridgeError::InvalidHandle { .. })));
}

#[test]
fn test_drop_releases_owned_handle() {
    let engine = MockEngine::new();
    let handle = engine.api().data_create();
    {
        let _managed = Managed::wrap(engine.api(), handle, true).unwrap();
    }
    assert_eq!(releases_of(&engine, handle.raw()), 1);
    assert!(!engine.is_alive(handle.raw()));
}

#[test]
fn test_source_dispose_then_drop_releases_once() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let mut source = Source::create(&ctx, "color_source", "red", None).unwrap();
    let raw = source.handle().unwrap().raw();

    source.dispose();
    source.dispose();
    assert!(source.is_disposed());
    assert!(source.name().unwrap_err().is_disposed());
    drop(source);

    assert_eq!(releases_of(&engine, raw), 1);
    assert!(engine.violations().is_empty());
}

#[test]
fn test_data_object_dispose_blocks_access() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let mut data = DataObject::create(&ctx).unwrap();
    data.set_int("bitrate", 2500).unwrap();
    let raw = data.handle().unwrap().raw();

    data.dispose();

    assert!(data.is_disposed());
    assert!(data.get_int("bitrate").unwrap_err().is_disposed());
    assert!(data.set_int("bitrate", 1).unwrap_err().is_disposed());
    assert!(!engine.is_alive(raw));
    assert!(engine.violations().is_empty());
}

#[test]
fn test_wrappers_leave_no_live_objects() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    {
        let settings = DataObject::from_json(&ctx, r#"{"width": 640, "height": 480}"#).unwrap();
        let source = Source::create(&ctx, "color_source", "red", Some(&settings)).unwrap();
        assert_eq!(source.width().unwrap(), 640);
        let _settings_copy = source.settings().unwrap();
    }
    assert_eq!(engine.live_objects(), 0);
    assert!(engine.violations().is_empty());
}

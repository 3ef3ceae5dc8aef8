// SPDX-License-Identifier: MPL-2.0

//! Integration tests for settings bags handed to engine objects

use obs_bridge::native::mock::MockEngine;
use obs_bridge::{Context, DataObject, Encoder, Service, Source};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct StreamSettings {
    server: String,
    key: String,
    use_auth: bool,
}

#[test]
fn test_bag_can_be_dropped_after_creation() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let source = {
        let settings = DataObject::create(&ctx).unwrap();
        settings.set_int("width", 1920).unwrap().set_int("height", 1080).unwrap();
        Source::create(&ctx, "color_source", "red", Some(&settings)).unwrap()
    };

    assert_eq!(source.width().unwrap(), 1920);
    assert_eq!(source.height().unwrap(), 1080);
}

#[test]
fn test_typed_settings_reach_service() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let wanted = StreamSettings {
        server: "rtmp://live.example.com/app".to_string(),
        key: "secret".to_string(),
        use_auth: false,
    };
    let settings = DataObject::from_serialize(&ctx, &wanted).unwrap();

    let service = Service::create(&ctx, "rtmp_custom", "dest", Some(&settings)).unwrap();

    let stored = engine.settings_of(service.handle().unwrap().raw()).unwrap();
    assert_eq!(stored["server"], "rtmp://live.example.com/app");
    assert_eq!(settings.deserialize::<StreamSettings>().unwrap(), wanted);
}

#[test]
fn test_encoder_update_merges_settings() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let initial = DataObject::from_json(&ctx, r#"{"bitrate": 2500, "preset": "veryfast"}"#).unwrap();
    let encoder = Encoder::video(&ctx, "obs_x264", "video", Some(&initial)).unwrap();

    let change = DataObject::create(&ctx).unwrap();
    change.set_int("bitrate", 6000).unwrap();
    encoder.update(&change).unwrap();

    let stored = engine.settings_of(encoder.handle().unwrap().raw()).unwrap();
    assert_eq!(stored, json!({"bitrate": 6000, "preset": "veryfast"}));
}

#[test]
fn test_nested_objects() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let outer = DataObject::create(&ctx).unwrap();
    let inner = DataObject::create(&ctx).unwrap();
    inner.set_string("codec", "h264").unwrap();
    outer.set_obj("video", &inner).unwrap();
    drop(inner);

    let video = outer.get_obj("video").unwrap().unwrap();
    assert_eq!(video.get_string("codec").unwrap().as_deref(), Some("h264"));
    assert!(outer.get_obj("audio").unwrap().is_none());
    assert_eq!(outer.to_value().unwrap(), json!({"video": {"codec": "h264"}}));
}

#[test]
fn test_source_settings_are_a_separate_reference() {
    let engine = MockEngine::new();
    let ctx = Context::with_defaults(engine.api());
    let source = Source::create(&ctx, "color_source", "red", None).unwrap();

    let settings = source.settings().unwrap();
    settings.set_int("color", 0xff0000).unwrap();
    drop(settings);

    let again = source.settings().unwrap();
    assert_eq!(again.get_int("color").unwrap(), Some(0xff0000));
    assert!(again.has_value("color").unwrap());
    again.erase("color").unwrap();
    assert!(!again.has_value("color").unwrap());
}

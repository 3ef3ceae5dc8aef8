// SPDX-License-Identifier: MPL-2.0

//! obs-bridge - deterministic-lifetime wrappers over the libobs object graph
//!
//! The engine hands out reference-counted, aliasable objects. This crate wraps
//! them so each reference is given back exactly once, composites tear down their
//! parts in a fixed order, and outputs cannot be started without what they need.
//!
//! # Architecture
//!
//! - [`native`]: the [`NativeApi`] seam, typed handles, and the mock engine
//! - [`managed`]: single-release ownership shared by every wrapper
//! - [`context`]: process-wide state (output channels, managed outputs)
//! - [`data`]: settings bags
//! - [`sources`]: sources, scenes, scene items and their transforms
//! - [`encoders`]: encoders with attach/detach sharing
//! - [`outputs`]: outputs, services, stop handling and recording paths
//! - [`signals`]: engine signal subscriptions
//! - [`config`]: on-disk configuration
//! - [`logging`]: tracing subscriber setup
//!
//! # Example
//!
//! ```
//! use obs_bridge::native::mock::MockEngine;
//! use obs_bridge::{Context, Encoder, Output, Scene};
//! use std::path::Path;
//!
//! let engine = MockEngine::new();
//! let ctx = Context::with_defaults(engine.api());
//!
//! let mut scene = Scene::create(&ctx, "main").unwrap();
//! scene.set_as_program(0).unwrap();
//!
//! let video = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
//! video.bind_default_media().unwrap();
//! let output = Output::recording(&ctx, "rec", Path::new("/tmp/rec.mkv")).unwrap();
//! output.set_video_encoder(&video).unwrap();
//!
//! assert!(output.start().unwrap());
//! assert!(output.stop_default());
//! assert!(output.is_disposed());
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod data;
pub mod encoders;
pub mod errors;
pub mod logging;
pub mod managed;
pub mod native;
pub mod outputs;
pub mod signals;
pub mod sources;
pub(crate) mod utils;

pub use config::BridgeConfig;
pub use context::Context;
pub use data::DataObject;
pub use encoders::{Encoder, EncoderKind};
pub use errors::{BridgeError, BridgeResult, Dependency, ObjectKind};
pub use managed::{Managed, NativeHandle};
pub use native::NativeApi;
pub use outputs::{Output, OutputKind, OutputOptions, OutputState, OutputStats, Service, StopCode};
pub use signals::{Calldata, SignalConnection};
pub use sources::{Scene, SceneItem, Source};

// SPDX-License-Identifier: MPL-2.0

//! Shared encoders
//!
//! One encoder may feed several outputs at once (a recording and a stream
//! sharing the same video encode). Two counters track it independently:
//!
//! - the wrapper's own claim, released once by [`Encoder::dispose`] or drop
//! - the attach count, one per output using the encoder; the first attach
//!   takes an extra engine reference and the last detach gives it back
//!
//! So an encoder disposed by its creator keeps working for outputs that still
//! have it attached.

use crate::constants::MAX_AUDIO_MIXES;
use crate::context::Context;
use crate::data::DataObject;
use crate::errors::{BridgeError, BridgeResult, ObjectKind};
use crate::managed::Managed;
use crate::native::{EncoderHandle, NativeApi};
use crate::utils::{cstring, lock};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Which pipeline an encoder consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderKind {
    Video,
    /// Audio encoder reading one of the engine's mixes
    Audio { mixer: usize },
}

#[derive(Debug)]
struct EncoderState {
    base: Managed<EncoderHandle>,
    attach_count: u32,
    /// Engine reference held on behalf of attached outputs
    extra_ref: Option<EncoderHandle>,
}

struct EncoderShared {
    api: Arc<dyn NativeApi>,
    kind: EncoderKind,
    type_id: String,
    name: String,
    state: Mutex<EncoderState>,
}

impl Drop for EncoderShared {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(extra) = state.extra_ref.take() {
            warn!(handle = %extra, attach_count = state.attach_count, "Encoder dropped while attached");
            self.api.encoder_release(extra);
        }
    }
}

/// A video or audio encoder that outputs can share
///
/// Clones refer to the same encoder and the same counters.
#[derive(Clone)]
pub struct Encoder {
    shared: Arc<EncoderShared>,
}

impl Encoder {
    pub fn video(
        ctx: &Context,
        type_id: &str,
        name: &str,
        settings: Option<&DataObject>,
    ) -> BridgeResult<Self> {
        ctx.ensure_live()?;
        let settings = settings.map(DataObject::handle).transpose()?.unwrap_or_default();
        let handle = ctx
            .api()
            .video_encoder_create(&cstring(type_id)?, &cstring(name)?, settings);
        Self::from_new_handle(ctx, handle, EncoderKind::Video, type_id, name)
    }

    /// Audio encoder fed from mix `mixer` (`0..MAX_AUDIO_MIXES`)
    pub fn audio(
        ctx: &Context,
        type_id: &str,
        name: &str,
        settings: Option<&DataObject>,
        mixer: usize,
    ) -> BridgeResult<Self> {
        ctx.ensure_live()?;
        if mixer >= MAX_AUDIO_MIXES {
            return Err(BridgeError::InvalidTrack {
                track: mixer,
                max: MAX_AUDIO_MIXES,
            });
        }
        let settings = settings.map(DataObject::handle).transpose()?.unwrap_or_default();
        let handle = ctx.api().audio_encoder_create(
            &cstring(type_id)?,
            &cstring(name)?,
            settings,
            mixer,
        );
        Self::from_new_handle(ctx, handle, EncoderKind::Audio { mixer }, type_id, name)
    }

    fn from_new_handle(
        ctx: &Context,
        handle: EncoderHandle,
        kind: EncoderKind,
        type_id: &str,
        name: &str,
    ) -> BridgeResult<Self> {
        if handle.is_null() {
            return Err(BridgeError::CreationFailed {
                kind: ObjectKind::Encoder,
                type_id: type_id.to_string(),
            });
        }
        debug!(type_id, name, ?kind, %handle, "Created encoder");
        Ok(Self {
            shared: Arc::new(EncoderShared {
                api: ctx.api().clone(),
                kind,
                type_id: type_id.to_string(),
                name: name.to_string(),
                state: Mutex::new(EncoderState {
                    base: Managed::wrap(ctx.api().clone(), handle, true)?,
                    attach_count: 0,
                    extra_ref: None,
                }),
            }),
        })
    }

    pub fn handle(&self) -> BridgeResult<EncoderHandle> {
        lock(&self.shared.state).base.access()
    }

    pub fn kind(&self) -> EncoderKind {
        self.shared.kind
    }

    pub fn type_id(&self) -> &str {
        &self.shared.type_id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Whether both wrappers refer to the same encoder
    pub fn same_encoder(&self, other: &Encoder) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn attach_count(&self) -> u32 {
        lock(&self.shared.state).attach_count
    }

    /// Record one more output using this encoder; returns the new count
    ///
    /// Fails once the wrapper is disposed.
    pub fn attach(&self) -> BridgeResult<u32> {
        let mut state = lock(&self.shared.state);
        let handle = state.base.access()?;
        if state.attach_count == 0 {
            let extra = self.shared.api.encoder_get_ref(handle);
            if extra.is_null() {
                return Err(BridgeError::AcquireFailed {
                    kind: ObjectKind::Encoder,
                });
            }
            state.extra_ref = Some(extra);
        }
        state.attach_count += 1;
        debug!(encoder = %self.shared.name, attach_count = state.attach_count, "Encoder attached");
        Ok(state.attach_count)
    }

    /// Record one output letting go; returns the new count
    ///
    /// Works after the wrapper was disposed, so outputs can always let go.
    pub fn detach(&self) -> u32 {
        let mut state = lock(&self.shared.state);
        if state.attach_count == 0 {
            warn!(encoder = %self.shared.name, "Detach without matching attach");
            return 0;
        }
        state.attach_count -= 1;
        if state.attach_count == 0 {
            if let Some(extra) = state.extra_ref.take() {
                self.shared.api.encoder_release(extra);
            }
        }
        debug!(encoder = %self.shared.name, attach_count = state.attach_count, "Encoder detached");
        state.attach_count
    }

    pub fn update(&self, settings: &DataObject) -> BridgeResult<()> {
        let handle = self.handle()?;
        self.shared.api.encoder_update(handle, settings.handle()?);
        Ok(())
    }

    pub fn is_active(&self) -> BridgeResult<bool> {
        Ok(self.shared.api.encoder_active(self.handle()?))
    }

    /// Codec name reported by the engine (`h264`, `aac`, ...)
    pub fn codec(&self) -> BridgeResult<Option<String>> {
        Ok(self.shared.api.encoder_codec(self.handle()?))
    }

    /// Feed the encoder from the engine's default video or audio pipeline
    pub fn bind_default_media(&self) -> BridgeResult<()> {
        self.shared.api.encoder_bind_default_media(self.handle()?);
        Ok(())
    }

    /// Give the creator's reference back. Idempotent.
    ///
    /// Attached outputs keep the encoder alive until they detach.
    pub fn dispose(&self) {
        lock(&self.shared.state).base.release();
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.shared.state).base.is_released()
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("Encoder")
            .field("name", &self.shared.name)
            .field("type_id", &self.shared.type_id)
            .field("kind", &self.shared.kind)
            .field("base", &state.base)
            .field("attach_count", &state.attach_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::mock::{MockCall, MockEngine};

    fn encoder(engine: &Arc<MockEngine>) -> (Context, Encoder) {
        let ctx = Context::with_defaults(engine.api());
        let encoder = Encoder::video(&ctx, "obs_x264", "video", None).unwrap();
        (ctx, encoder)
    }

    #[test]
    fn test_first_attach_takes_one_extra_reference() {
        let engine = MockEngine::new();
        let (_ctx, encoder) = encoder(&engine);
        let raw = encoder.handle().unwrap().raw();

        assert_eq!(encoder.attach().unwrap(), 1);
        assert_eq!(encoder.attach().unwrap(), 2);
        assert_eq!(engine.ref_count(raw), 2);
        assert_eq!(engine.count(|c| matches!(c, MockCall::AddRef { .. })), 1);
    }

    #[test]
    fn test_disposed_encoder_survives_until_last_detach() {
        let engine = MockEngine::new();
        let (_ctx, encoder) = encoder(&engine);
        let raw = encoder.handle().unwrap().raw();
        encoder.attach().unwrap();

        encoder.dispose();
        assert!(encoder.attach().unwrap_err().is_disposed());
        assert!(engine.is_alive(raw));

        assert_eq!(encoder.detach(), 0);
        assert!(!engine.is_alive(raw));
    }

    #[test]
    fn test_detach_without_attach_is_harmless() {
        let engine = MockEngine::new();
        let (_ctx, encoder) = encoder(&engine);
        assert_eq!(encoder.detach(), 0);
        assert_eq!(engine.count(|c| matches!(c, MockCall::Release { .. })), 0);
    }

    #[test]
    fn test_audio_mixer_out_of_range() {
        let engine = MockEngine::new();
        let ctx = Context::with_defaults(engine.api());
        let err = Encoder::audio(&ctx, "ffmpeg_aac", "audio", None, MAX_AUDIO_MIXES).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidTrack { .. }));
    }

    #[test]
    fn test_codec_and_binding() {
        let engine = MockEngine::new();
        let ctx = Context::with_defaults(engine.api());
        let audio = Encoder::audio(&ctx, "ffmpeg_aac", "audio", None, 1).unwrap();
        assert_eq!(audio.codec().unwrap().as_deref(), Some("aac"));
        assert_eq!(audio.kind(), EncoderKind::Audio { mixer: 1 });
        audio.bind_default_media().unwrap();
        assert!(engine.is_bound(audio.handle().unwrap()));
    }
}

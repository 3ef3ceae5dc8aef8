// SPDX-License-Identifier: MPL-2.0

//! Outputs: encoders plus an optional destination, started and stopped as one
//!
//! An output attaches its encoders (see [`Encoder::attach`]) and always
//! detaches them before its own reference is released. With auto-dispose on,
//! a stop ends with that cascade even when the engine did not confirm the stop
//! in time; the output is force-stopped first in that case.

use super::service::Service;
use super::stop::{OutputState, OutputStats};
use super::{OutputKind, OutputOptions};
use crate::constants::{MAX_AUDIO_MIXES, type_ids};
use crate::context::Context;
use crate::data::DataObject;
use crate::encoders::Encoder;
use crate::errors::{BridgeError, BridgeResult, Dependency, ObjectKind};
use crate::managed::{Managed, teardown_step};
use crate::native::{EncoderHandle, NativeApi, OutputHandle, ServiceHandle};
use crate::signals::{Calldata, SignalConnection, SignalOwner};
use crate::utils::{cstring, lock};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

struct ServiceSlot {
    service: Service,
    owned: bool,
}

pub(crate) struct OutputCore {
    ctx: Context,
    base: Managed<OutputHandle>,
    name: String,
    type_id: String,
    kind: OutputKind,
    options: OutputOptions,
    video_encoder: Option<Encoder>,
    audio_encoders: BTreeMap<usize, Encoder>,
    service: Option<ServiceSlot>,
    started_once: bool,
    /// Auto-dispose waiting for a non-blocking stop to finish
    dispose_pending: bool,
}

impl OutputCore {
    fn api(&self) -> &dyn NativeApi {
        self.ctx.api().as_ref()
    }

    fn detach_video_encoder(&mut self, handle: OutputHandle) {
        if let Some(previous) = self.video_encoder.take() {
            self.api()
                .output_set_video_encoder(handle, EncoderHandle::null());
            previous.detach();
        }
    }

    fn detach_audio_encoder(&mut self, handle: OutputHandle, track: usize) {
        if let Some(previous) = self.audio_encoders.remove(&track) {
            self.api()
                .output_set_audio_encoder(handle, EncoderHandle::null(), track);
            previous.detach();
        }
    }

    fn detach_encoders(&mut self) {
        let handle = self.base.identity();
        self.detach_video_encoder(handle);
        let tracks: Vec<usize> = self.audio_encoders.keys().copied().collect();
        for track in tracks {
            self.detach_audio_encoder(handle, track);
        }
    }

    /// Force-stop if needed, detach encoders, release. Idempotent.
    fn dispose(&mut self) {
        if self.base.is_released() {
            return;
        }
        let handle = self.base.identity();
        debug!(output = %self.name, %handle, "Disposing output");

        teardown_step("force stop output", || {
            if self.api().output_active(handle) {
                warn!(output = %self.name, "Output still active at disposal; forcing stop");
                self.api().output_force_stop(handle);
            }
            Ok(())
        });
        teardown_step("detach encoders", || {
            self.detach_encoders();
            Ok(())
        });
        if self.options.managed {
            teardown_step("unregister output", || {
                self.ctx.unregister_output(handle);
                Ok(())
            });
        }
        teardown_step("release output", || {
            self.base.release();
            Ok(())
        });
        if let Some(slot) = self.service.take() {
            teardown_step("release owned service", || {
                if slot.owned {
                    slot.service.dispose();
                }
                Ok(())
            });
        }
        self.dispose_pending = false;
    }

    /// Context teardown path
    pub(crate) fn shutdown(&mut self) {
        if !self.base.is_released() {
            info!(output = %self.name, "Disposing managed output on shutdown");
        }
        self.dispose();
    }

    fn is_active(&mut self) -> BridgeResult<bool> {
        let handle = self.base.access()?;
        let active = self.api().output_active(handle);
        if !active && self.dispose_pending {
            debug!(output = %self.name, "Deferred stop finished; disposing");
            self.dispose();
        }
        Ok(active)
    }
}

impl Drop for OutputCore {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// A recording, replay buffer, stream or generic engine output
pub struct Output {
    core: Arc<Mutex<OutputCore>>,
}

impl Output {
    pub fn create(
        ctx: &Context,
        kind: OutputKind,
        type_id: &str,
        name: &str,
        settings: Option<&DataObject>,
        options: OutputOptions,
    ) -> BridgeResult<Self> {
        ctx.ensure_live()?;
        let settings = settings.map(DataObject::handle).transpose()?.unwrap_or_default();
        let handle = ctx
            .api()
            .output_create(&cstring(type_id)?, &cstring(name)?, settings);
        if handle.is_null() {
            return Err(BridgeError::CreationFailed {
                kind: ObjectKind::Output,
                type_id: type_id.to_string(),
            });
        }
        let core = Arc::new(Mutex::new(OutputCore {
            ctx: ctx.clone(),
            base: Managed::wrap(ctx.api().clone(), handle, true)?,
            name: name.to_string(),
            type_id: type_id.to_string(),
            kind,
            options,
            video_encoder: None,
            audio_encoders: BTreeMap::new(),
            service: None,
            started_once: false,
            dispose_pending: false,
        }));
        if options.managed {
            ctx.register_output(handle, Arc::downgrade(&core));
        }
        debug!(name, type_id, ?kind, %handle, "Created output");
        Ok(Self { core })
    }

    /// File recording to `path`, with the context's stop policy
    pub fn recording(ctx: &Context, name: &str, path: &Path) -> BridgeResult<Self> {
        let settings = DataObject::create(ctx)?;
        settings.set_string("path", &path.to_string_lossy())?;
        Self::create(
            ctx,
            OutputKind::Recording,
            type_ids::RECORDING_OUTPUT,
            name,
            Some(&settings),
            OutputOptions::from_config(ctx.config()),
        )
    }

    pub fn replay_buffer(
        ctx: &Context,
        name: &str,
        settings: Option<&DataObject>,
    ) -> BridgeResult<Self> {
        Self::create(
            ctx,
            OutputKind::ReplayBuffer,
            type_ids::REPLAY_BUFFER_OUTPUT,
            name,
            settings,
            OutputOptions::from_config(ctx.config()),
        )
    }

    /// Publishing output; needs a [`Service`] before it can start
    pub fn streaming(
        ctx: &Context,
        name: &str,
        settings: Option<&DataObject>,
    ) -> BridgeResult<Self> {
        Self::create(
            ctx,
            OutputKind::Streaming,
            type_ids::STREAMING_OUTPUT,
            name,
            settings,
            OutputOptions::from_config(ctx.config()),
        )
    }

    pub fn handle(&self) -> BridgeResult<OutputHandle> {
        lock(&self.core).base.access()
    }

    pub fn name(&self) -> String {
        lock(&self.core).name.clone()
    }

    pub fn type_id(&self) -> String {
        lock(&self.core).type_id.clone()
    }

    pub fn kind(&self) -> OutputKind {
        lock(&self.core).kind
    }

    pub fn options(&self) -> OutputOptions {
        lock(&self.core).options
    }

    pub fn update(&self, settings: &DataObject) -> BridgeResult<()> {
        let core = lock(&self.core);
        let handle = core.base.access()?;
        core.api().output_update(handle, settings.handle()?);
        Ok(())
    }

    /// Attach `encoder` as the video encoder, detaching any previous one
    ///
    /// Setting the encoder that is already attached changes nothing.
    pub fn set_video_encoder(&self, encoder: &Encoder) -> BridgeResult<()> {
        let mut core = lock(&self.core);
        let handle = core.base.access()?;
        if core
            .video_encoder
            .as_ref()
            .is_some_and(|current| current.same_encoder(encoder))
        {
            return Ok(());
        }
        let encoder_handle = encoder.handle()?;
        core.detach_video_encoder(handle);
        encoder.attach()?;
        core.api().output_set_video_encoder(handle, encoder_handle);
        core.video_encoder = Some(encoder.clone());
        debug!(output = %core.name, encoder = %encoder.name(), "Video encoder set");
        Ok(())
    }

    pub fn clear_video_encoder(&self) -> BridgeResult<()> {
        let mut core = lock(&self.core);
        let handle = core.base.access()?;
        core.detach_video_encoder(handle);
        Ok(())
    }

    pub fn video_encoder(&self) -> Option<Encoder> {
        lock(&self.core).video_encoder.clone()
    }

    /// Attach `encoder` on audio `track` (`0..MAX_AUDIO_MIXES`)
    pub fn set_audio_encoder(&self, encoder: &Encoder, track: usize) -> BridgeResult<()> {
        check_track(track)?;
        let mut core = lock(&self.core);
        let handle = core.base.access()?;
        if core
            .audio_encoders
            .get(&track)
            .is_some_and(|current| current.same_encoder(encoder))
        {
            return Ok(());
        }
        let encoder_handle = encoder.handle()?;
        core.detach_audio_encoder(handle, track);
        encoder.attach()?;
        core.api()
            .output_set_audio_encoder(handle, encoder_handle, track);
        core.audio_encoders.insert(track, encoder.clone());
        debug!(output = %core.name, encoder = %encoder.name(), track, "Audio encoder set");
        Ok(())
    }

    pub fn clear_audio_encoder(&self, track: usize) -> BridgeResult<()> {
        check_track(track)?;
        let mut core = lock(&self.core);
        let handle = core.base.access()?;
        core.detach_audio_encoder(handle, track);
        Ok(())
    }

    pub fn audio_encoder(&self, track: usize) -> Option<Encoder> {
        lock(&self.core).audio_encoders.get(&track).cloned()
    }

    /// Use `service` as the destination; the caller keeps ownership
    pub fn set_service(&self, service: &Service) -> BridgeResult<()> {
        self.attach_service(service.clone(), false)
    }

    /// Use `service` as the destination and dispose it with the output
    pub fn set_owned_service(&self, service: Service) -> BridgeResult<()> {
        self.attach_service(service, true)
    }

    fn attach_service(&self, service: Service, owned: bool) -> BridgeResult<()> {
        let mut core = lock(&self.core);
        let handle = core.base.access()?;
        let service_handle = service.handle()?;
        core.api().output_set_service(handle, service_handle);
        let replaced = core.service.replace(ServiceSlot {
            service: service.clone(),
            owned,
        });
        if let Some(previous) = replaced
            && previous.owned
            && !previous.service.same_service(&service)
        {
            previous.service.dispose();
        }
        Ok(())
    }

    pub fn service(&self) -> Option<Service> {
        lock(&self.core).service.as_ref().map(|slot| slot.service.clone())
    }

    /// Start producing
    ///
    /// Dependency checks run before the engine is touched. A `false` return is
    /// the engine refusing; see [`Self::last_error`].
    pub fn start(&self) -> BridgeResult<bool> {
        let mut core = lock(&self.core);
        let handle = core.base.access()?;
        if core.video_encoder.is_none() {
            return Err(BridgeError::MissingDependency(Dependency::VideoEncoder));
        }
        if core.kind.requires_service() {
            let Some(slot) = core.service.as_ref() else {
                return Err(BridgeError::MissingDependency(Dependency::Service));
            };
            if !slot.service.can_try_to_connect()? {
                return Err(BridgeError::ServiceNotConfigurable(
                    slot.service.name().to_string(),
                ));
            }
        }

        let started = core.api().output_start(handle);
        if started {
            core.started_once = true;
            core.dispose_pending = false;
            info!(output = %core.name, kind = ?core.kind, "Output started");
        } else {
            warn!(
                output = %core.name,
                error = ?core.api().output_last_error(handle),
                "Output failed to start"
            );
        }
        Ok(started)
    }

    /// Request a stop and optionally wait for the engine to confirm it
    ///
    /// Returns whether the output reached inactive. With `wait`, polls until
    /// inactive or `timeout`. With auto-dispose on, encoders are then detached
    /// and the output disposed whatever the outcome; a non-waiting stop that
    /// has not finished defers that to the first [`Self::is_active`] query
    /// that sees the output inactive.
    pub fn stop(&self, wait: bool, timeout: Duration) -> bool {
        let mut core = lock(&self.core);
        let Ok(handle) = core.base.access() else {
            debug!(output = %core.name, "Stop on disposed output");
            return true;
        };
        let poll_interval = core.ctx.config().stop_poll_interval();

        let was_active = core.api().output_active(handle);
        if was_active {
            info!(output = %core.name, "Stopping output");
            core.api().output_stop(handle);
        }

        let stopped = if !was_active {
            true
        } else if wait {
            let started = Instant::now();
            loop {
                if !core.api().output_active(handle) {
                    break true;
                }
                if started.elapsed() >= timeout {
                    break false;
                }
                std::thread::sleep(poll_interval);
            }
        } else {
            !core.api().output_active(handle)
        };

        if wait && !stopped {
            warn!(output = %core.name, ?timeout, "Output did not stop in time");
        }

        if core.options.auto_dispose {
            if stopped || wait {
                core.dispose();
            } else {
                core.dispose_pending = true;
            }
        }
        stopped
    }

    /// [`Self::stop`] with the context's configured timeout
    pub fn stop_default(&self) -> bool {
        let timeout = lock(&self.core).ctx.config().stop_timeout();
        self.stop(true, timeout)
    }

    /// Waiting stop that reports a timeout as an error
    pub fn stop_checked(&self, timeout: Duration) -> BridgeResult<()> {
        if self.stop(true, timeout) {
            Ok(())
        } else {
            Err(BridgeError::OperationTimedOut { timeout })
        }
    }

    /// Stop immediately without flushing
    pub fn force_stop(&self) -> BridgeResult<()> {
        let core = lock(&self.core);
        let handle = core.base.access()?;
        core.api().output_force_stop(handle);
        info!(output = %core.name, "Output force-stopped");
        Ok(())
    }

    pub fn is_active(&self) -> BridgeResult<bool> {
        lock(&self.core).is_active()
    }

    pub fn is_reconnecting(&self) -> BridgeResult<bool> {
        let core = lock(&self.core);
        Ok(core.api().output_reconnecting(core.base.access()?))
    }

    pub fn last_error(&self) -> BridgeResult<Option<String>> {
        let core = lock(&self.core);
        Ok(core.api().output_last_error(core.base.access()?))
    }

    pub fn can_pause(&self) -> BridgeResult<bool> {
        let core = lock(&self.core);
        Ok(core.api().output_can_pause(core.base.access()?))
    }

    /// Pause or resume; returns the engine's answer
    pub fn pause(&self, pause: bool) -> BridgeResult<bool> {
        let core = lock(&self.core);
        let handle = core.base.access()?;
        if !core.api().output_can_pause(handle) {
            return Err(BridgeError::PauseUnsupported(core.name.clone()));
        }
        let done = core.api().output_pause(handle, pause);
        debug!(output = %core.name, pause, done, "Output pause toggled");
        Ok(done)
    }

    pub fn is_paused(&self) -> BridgeResult<bool> {
        let core = lock(&self.core);
        Ok(core.api().output_paused(core.base.access()?))
    }

    pub fn stats(&self) -> BridgeResult<OutputStats> {
        let core = lock(&self.core);
        let handle = core.base.access()?;
        let api = core.api();
        Ok(OutputStats {
            total_frames: api.output_total_frames(handle),
            dropped_frames: api.output_frames_dropped(handle),
            total_bytes: api.output_total_bytes(handle),
        })
    }

    pub fn state(&self) -> OutputState {
        let core = lock(&self.core);
        let Ok(handle) = core.base.access() else {
            return OutputState::Disposed;
        };
        let api = core.api();
        if api.output_active(handle) {
            if api.output_reconnecting(handle) {
                OutputState::Reconnecting
            } else if api.output_paused(handle) {
                OutputState::Paused
            } else {
                OutputState::Started
            }
        } else if core.started_once {
            OutputState::Stopped
        } else if core.video_encoder.is_some() {
            OutputState::Configured
        } else {
            OutputState::Created
        }
    }

    /// Subscribe to one of this output's signals (`start`, `stop`, ...)
    ///
    /// The engine may call back while an output method is running on the same
    /// thread, so callbacks must not call back into this output.
    pub fn connect_signal<F>(&self, signal: &str, callback: F) -> BridgeResult<SignalConnection>
    where
        F: Fn(&Calldata<'_>) + Send + Sync + 'static,
    {
        let core = lock(&self.core);
        let owner = SignalOwner::output(core.ctx.api(), core.base.access()?)?;
        SignalConnection::connect(core.ctx.api(), owner, signal, callback)
    }

    /// Force-stop if needed, detach encoders, release. Idempotent.
    pub fn dispose(&self) {
        lock(&self.core).dispose();
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.core).base.is_released()
    }

    /// Service handle currently set, if any
    pub fn service_handle(&self) -> Option<ServiceHandle> {
        lock(&self.core)
            .service
            .as_ref()
            .and_then(|slot| slot.service.handle().ok())
    }
}

fn check_track(track: usize) -> BridgeResult<()> {
    if track >= MAX_AUDIO_MIXES {
        return Err(BridgeError::InvalidTrack {
            track,
            max: MAX_AUDIO_MIXES,
        });
    }
    Ok(())
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = lock(&self.core);
        f.debug_struct("Output")
            .field("name", &core.name)
            .field("type_id", &core.type_id)
            .field("kind", &core.kind)
            .field("base", &core.base)
            .field("audio_tracks", &core.audio_encoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

// SPDX-License-Identifier: MPL-2.0

//! Process-wide bridge state
//!
//! A [`Context`] is created once the engine is initialised and shut down before
//! the engine is. It owns the two pieces of process-wide mutable state, the
//! output-channel registry and the list of managed outputs, behind a single
//! lock. Every wrapper keeps a clone, so the state outlives the objects that
//! refer to it.

mod channels;

pub(crate) use channels::validate_channel;

use crate::config::BridgeConfig;
use crate::errors::{BridgeError, BridgeResult};
use crate::managed::teardown_step;
use crate::native::{NativeApi, OutputHandle, SourceHandle};
use crate::outputs::output::OutputCore;
use crate::signals::{Calldata, SignalConnection, SignalOwner};
use crate::sources::Source;
use crate::utils::lock;
use channels::ChannelRegistry;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info};

struct ManagedOutput {
    handle: OutputHandle,
    core: Weak<Mutex<OutputCore>>,
}

#[derive(Default)]
struct ProcessState {
    channels: ChannelRegistry,
    outputs: Vec<ManagedOutput>,
    shut_down: bool,
}

struct ContextInner {
    api: Arc<dyn NativeApi>,
    config: BridgeConfig,
    state: Mutex<ProcessState>,
}

/// Handle to the process-wide bridge state
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new(api: Arc<dyn NativeApi>, config: BridgeConfig) -> Self {
        debug!(?config, "Creating bridge context");
        Self {
            inner: Arc::new(ContextInner {
                api,
                config,
                state: Mutex::new(ProcessState::default()),
            }),
        }
    }

    pub fn with_defaults(api: Arc<dyn NativeApi>) -> Self {
        Self::new(api, BridgeConfig::default())
    }

    pub fn api(&self) -> &Arc<dyn NativeApi> {
        &self.inner.api
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn is_shut_down(&self) -> bool {
        lock(&self.inner.state).shut_down
    }

    /// Fails with [`BridgeError::EngineShutDown`] once shutdown has begun
    pub(crate) fn ensure_live(&self) -> BridgeResult<()> {
        if self.is_shut_down() {
            return Err(BridgeError::EngineShutDown);
        }
        Ok(())
    }

    /// Put `source` on `channel`
    ///
    /// The previous occupant is not disposed; its handle is returned so the
    /// caller can decide what to do with it.
    pub fn set_output_source(
        &self,
        channel: u32,
        source: &Source,
    ) -> BridgeResult<Option<SourceHandle>> {
        self.assign_channel(channel, source.handle()?)
    }

    pub(crate) fn assign_channel(
        &self,
        channel: u32,
        source: SourceHandle,
    ) -> BridgeResult<Option<SourceHandle>> {
        validate_channel(channel)?;
        let mut state = lock(&self.inner.state);
        if state.shut_down {
            return Err(BridgeError::EngineShutDown);
        }
        self.inner.api.set_output_source(channel, source);
        let displaced = state.channels.assign(channel, source);
        match displaced {
            Some(previous) => info!(
                channel,
                %source,
                %previous,
                "Output channel reassigned; previous source left to its owner"
            ),
            None => info!(channel, %source, "Output channel assigned"),
        }
        Ok(displaced)
    }

    /// Empty `channel`, returning what was on it
    pub fn clear_output_channel(&self, channel: u32) -> BridgeResult<Option<SourceHandle>> {
        validate_channel(channel)?;
        let mut state = lock(&self.inner.state);
        let previous = state.channels.clear(channel);
        if previous.is_some() {
            self.inner.api.set_output_source(channel, SourceHandle::null());
            info!(channel, "Output channel cleared");
        }
        Ok(previous)
    }

    /// Empty `channel` only while it still holds `source`
    pub(crate) fn release_channel(&self, channel: u32, source: SourceHandle) -> bool {
        let mut state = lock(&self.inner.state);
        if !state.channels.clear_if_holds(channel, source) {
            debug!(channel, %source, "Channel no longer holds source; leaving it");
            return false;
        }
        self.inner.api.set_output_source(channel, SourceHandle::null());
        info!(channel, %source, "Output channel released");
        true
    }

    /// Identity of the source recorded on `channel`
    pub fn channel_source(&self, channel: u32) -> Option<SourceHandle> {
        lock(&self.inner.state).channels.get(channel)
    }

    /// The engine's source on `channel`, as a newly referenced wrapper
    pub fn output_source(&self, channel: u32) -> BridgeResult<Option<Source>> {
        validate_channel(channel)?;
        let handle = self.inner.api.get_output_source(channel);
        if handle.is_null() {
            return Ok(None);
        }
        Source::from_owned(self.clone(), handle).map(Some)
    }

    pub fn assigned_channels(&self) -> Vec<u32> {
        lock(&self.inner.state).channels.channels()
    }

    pub(crate) fn register_output(&self, handle: OutputHandle, core: Weak<Mutex<OutputCore>>) {
        let mut state = lock(&self.inner.state);
        state.outputs.retain(|o| o.core.strong_count() > 0);
        state.outputs.push(ManagedOutput { handle, core });
        debug!(%handle, managed = state.outputs.len(), "Registered managed output");
    }

    pub(crate) fn unregister_output(&self, handle: OutputHandle) {
        let mut state = lock(&self.inner.state);
        state.outputs.retain(|o| o.handle != handle);
    }

    /// Live outputs registered for shutdown teardown
    pub fn managed_output_count(&self) -> usize {
        lock(&self.inner.state)
            .outputs
            .iter()
            .filter(|o| o.core.strong_count() > 0)
            .count()
    }

    /// Subscribe to an engine-wide signal (`source_create`, `source_destroy`, ...)
    pub fn connect_signal<F>(&self, signal: &str, callback: F) -> BridgeResult<SignalConnection>
    where
        F: Fn(&Calldata<'_>) + Send + Sync + 'static,
    {
        self.ensure_live()?;
        SignalConnection::connect(&self.inner.api, SignalOwner::Global, signal, callback)
    }

    /// Tear down managed outputs and channel assignments. Idempotent.
    ///
    /// Also runs when the last clone is dropped.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl ContextInner {
    fn shutdown(&self) {
        let outputs = {
            let mut state = lock(&self.state);
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            std::mem::take(&mut state.outputs)
        };
        info!(outputs = outputs.len(), "Shutting down bridge context");

        // Output disposal takes the state lock itself, so it runs unlocked
        for output in outputs {
            let Some(core) = output.core.upgrade() else {
                continue;
            };
            teardown_step("dispose managed output", || {
                lock(&core).shutdown();
                Ok(())
            });
        }

        let mut state = lock(&self.state);
        for (channel, source) in state.channels.drain() {
            teardown_step("clear output channel", || {
                self.api.set_output_source(channel, SourceHandle::null());
                debug!(channel, %source, "Cleared output channel on shutdown");
                Ok(())
            });
        }
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Context")
            .field("channels", &state.channels)
            .field("managed_outputs", &state.outputs.len())
            .field("shut_down", &state.shut_down)
            .finish()
    }
}

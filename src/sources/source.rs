// SPDX-License-Identifier: MPL-2.0

use crate::context::Context;
use crate::data::DataObject;
use crate::errors::{BridgeError, BridgeResult, ObjectKind};
use crate::managed::{Managed, teardown_step};
use crate::native::{NativeApi, SourceHandle};
use crate::signals::{Calldata, SignalConnection, SignalOwner};
use crate::utils::cstring;
use tracing::{debug, info};

/// A capturable or renderable engine unit
///
/// Dropping the wrapper gives its reference back; the engine frees the source
/// once nothing else (scenes, channels, other wrappers) holds one.
pub struct Source {
    ctx: Context,
    base: Managed<SourceHandle>,
    type_id: String,
    assigned_channel: Option<u32>,
}

impl Source {
    /// Create a source of `type_id`
    ///
    /// `settings` is copied by the engine and can be dropped afterwards.
    pub fn create(
        ctx: &Context,
        type_id: &str,
        name: &str,
        settings: Option<&DataObject>,
    ) -> BridgeResult<Self> {
        ctx.ensure_live()?;
        let settings = settings.map(DataObject::handle).transpose()?.unwrap_or_default();
        let handle = ctx
            .api()
            .source_create(&cstring(type_id)?, &cstring(name)?, settings);
        if handle.is_null() {
            return Err(BridgeError::CreationFailed {
                kind: ObjectKind::Source,
                type_id: type_id.to_string(),
            });
        }
        debug!(type_id, name, %handle, "Created source");
        Self::wrap(ctx.clone(), handle, true, type_id.to_string())
    }

    /// Take ownership of a new reference handed out by the engine
    pub(crate) fn from_owned(ctx: Context, handle: SourceHandle) -> BridgeResult<Self> {
        let type_id = ctx.api().source_type_id(handle).unwrap_or_default();
        Self::wrap(ctx, handle, true, type_id)
    }

    fn wrap(ctx: Context, handle: SourceHandle, owns: bool, type_id: String) -> BridgeResult<Self> {
        let base = Managed::wrap(ctx.api().clone(), handle, owns)?;
        Ok(Self {
            ctx,
            base,
            type_id,
            assigned_channel: None,
        })
    }

    pub fn handle(&self) -> BridgeResult<SourceHandle> {
        self.base.access()
    }

    fn api(&self) -> &dyn NativeApi {
        self.ctx.api().as_ref()
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn name(&self) -> BridgeResult<String> {
        let handle = self.handle()?;
        Ok(self.api().source_name(handle).unwrap_or_default())
    }

    /// Independently owned wrapper holding a new reference to this source
    pub fn get_ref(&self) -> BridgeResult<Source> {
        let handle = self.handle()?;
        let acquired = self.api().source_get_ref(handle);
        if acquired.is_null() {
            return Err(BridgeError::AcquireFailed {
                kind: ObjectKind::Source,
            });
        }
        Self::wrap(self.ctx.clone(), acquired, true, self.type_id.clone())
    }

    pub fn update(&self, settings: &DataObject) -> BridgeResult<()> {
        let handle = self.handle()?;
        self.api().source_update(handle, settings.handle()?);
        Ok(())
    }

    /// Current settings as a new bag
    pub fn settings(&self) -> BridgeResult<DataObject> {
        let handle = self.handle()?;
        let data = self.api().source_settings(handle);
        if data.is_null() {
            return Err(BridgeError::AcquireFailed {
                kind: ObjectKind::Data,
            });
        }
        DataObject::from_owned(self.ctx.api().clone(), data)
    }

    /// Detach from every scene; the wrapper still has to be disposed
    pub fn remove(&self) -> BridgeResult<()> {
        let handle = self.handle()?;
        self.api().source_remove(handle);
        debug!(%handle, "Removed source");
        Ok(())
    }

    pub fn is_removed(&self) -> BridgeResult<bool> {
        let handle = self.handle()?;
        Ok(self.api().source_removed(handle))
    }

    pub fn add_filter(&self, filter: &Source) -> BridgeResult<()> {
        let handle = self.handle()?;
        self.api().source_filter_add(handle, filter.handle()?);
        Ok(())
    }

    pub fn remove_filter(&self, filter: &Source) -> BridgeResult<()> {
        let handle = self.handle()?;
        self.api().source_filter_remove(handle, filter.handle()?);
        Ok(())
    }

    pub fn set_enabled(&self, enabled: bool) -> BridgeResult<&Self> {
        self.api().source_set_enabled(self.handle()?, enabled);
        Ok(self)
    }

    pub fn enabled(&self) -> BridgeResult<bool> {
        Ok(self.api().source_enabled(self.handle()?))
    }

    pub fn set_muted(&self, muted: bool) -> BridgeResult<&Self> {
        self.api().source_set_muted(self.handle()?, muted);
        Ok(self)
    }

    pub fn muted(&self) -> BridgeResult<bool> {
        Ok(self.api().source_muted(self.handle()?))
    }

    /// Linear volume multiplier
    pub fn set_volume(&self, volume: f32) -> BridgeResult<&Self> {
        self.api().source_set_volume(self.handle()?, volume);
        Ok(self)
    }

    pub fn volume(&self) -> BridgeResult<f32> {
        Ok(self.api().source_volume(self.handle()?))
    }

    pub fn width(&self) -> BridgeResult<u32> {
        Ok(self.api().source_width(self.handle()?))
    }

    pub fn height(&self) -> BridgeResult<u32> {
        Ok(self.api().source_height(self.handle()?))
    }

    /// Put this source on `channel`, returning the displaced source if any
    ///
    /// The channel is cleared again when this wrapper is disposed, unless
    /// something else has taken it over in the meantime.
    pub fn set_as_program(&mut self, channel: u32) -> BridgeResult<Option<SourceHandle>> {
        let handle = self.handle()?;
        let displaced = self.ctx.assign_channel(channel, handle)?;
        if let Some(previous) = self.assigned_channel.replace(channel) {
            if previous != channel {
                self.ctx.release_channel(previous, handle);
            }
        }
        Ok(displaced)
    }

    pub fn assigned_channel(&self) -> Option<u32> {
        self.assigned_channel
    }

    /// Subscribe to one of this source's signals
    pub fn connect_signal<F>(&self, signal: &str, callback: F) -> BridgeResult<SignalConnection>
    where
        F: Fn(&Calldata<'_>) + Send + Sync + 'static,
    {
        let owner = SignalOwner::source(self.ctx.api(), self.handle()?)?;
        SignalConnection::connect(self.ctx.api(), owner, signal, callback)
    }

    pub(crate) fn context(&self) -> &Context {
        &self.ctx
    }

    /// Clear the assigned channel if it still holds this source
    pub(crate) fn release_assigned_channel(&mut self) {
        if let Some(channel) = self.assigned_channel.take() {
            self.ctx.release_channel(channel, self.base.identity());
        }
    }

    pub(crate) fn base_identity(&self) -> SourceHandle {
        self.base.identity()
    }

    pub(crate) fn release_handle(&mut self) -> bool {
        self.base.release()
    }

    /// Clear the channel slot, then give the reference back. Idempotent.
    pub fn dispose(&mut self) {
        if self.base.is_released() {
            return;
        }
        if self.assigned_channel.is_some() {
            info!(handle = %self.base.identity(), "Disposing program source");
        }
        teardown_step("release source channel", || {
            self.release_assigned_channel();
            Ok(())
        });
        teardown_step("release source", || {
            self.release_handle();
            Ok(())
        });
    }

    pub fn is_disposed(&self) -> bool {
        self.base.is_released()
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("base", &self.base)
            .field("type_id", &self.type_id)
            .field("assigned_channel", &self.assigned_channel)
            .finish()
    }
}

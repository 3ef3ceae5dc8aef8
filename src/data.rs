// SPDX-License-Identifier: MPL-2.0

//! Settings bags
//!
//! A [`DataObject`] is the engine's reference-counted key/value store, used as
//! the configuration payload for every other object. Creation calls take their
//! own reference to a bag, so a bag may be dropped right after it was passed in.

use crate::context::Context;
use crate::errors::{BridgeError, BridgeResult, ObjectKind};
use crate::managed::Managed;
use crate::native::{DataHandle, NativeApi};
use crate::utils::cstring;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Owned reference to a native settings bag
#[derive(Debug)]
pub struct DataObject {
    base: Managed<DataHandle>,
}

impl DataObject {
    /// New empty bag
    pub fn create(ctx: &Context) -> BridgeResult<Self> {
        ctx.ensure_live()?;
        let handle = ctx.api().data_create();
        Self::from_new_handle(ctx.api().clone(), handle, "data")
    }

    /// Bag holding the fields of a JSON object
    pub fn from_json(ctx: &Context, json: &str) -> BridgeResult<Self> {
        ctx.ensure_live()?;
        let json = cstring(json)?;
        let handle = ctx.api().data_create_from_json(&json);
        Self::from_new_handle(ctx.api().clone(), handle, "json")
    }

    /// Bag holding the serialised fields of `value`, which must serialise to a map
    pub fn from_serialize<T: Serialize>(ctx: &Context, value: &T) -> BridgeResult<Self> {
        let json = serde_json::to_string(value)?;
        Self::from_json(ctx, &json)
    }

    /// Take ownership of a reference returned by the engine
    pub(crate) fn from_owned(api: Arc<dyn NativeApi>, handle: DataHandle) -> BridgeResult<Self> {
        Ok(Self {
            base: Managed::wrap(api, handle, true)?,
        })
    }

    fn from_new_handle(
        api: Arc<dyn NativeApi>,
        handle: DataHandle,
        type_id: &str,
    ) -> BridgeResult<Self> {
        if handle.is_null() {
            return Err(BridgeError::CreationFailed {
                kind: ObjectKind::Data,
                type_id: type_id.to_string(),
            });
        }
        Self::from_owned(api, handle)
    }

    pub fn handle(&self) -> BridgeResult<DataHandle> {
        self.base.access()
    }

    fn api(&self) -> &dyn NativeApi {
        self.base.api().as_ref()
    }

    /// Independently owned reference to the same bag
    pub fn get_ref(&self) -> BridgeResult<DataObject> {
        let handle = self.handle()?;
        self.api().data_addref(handle);
        Self::from_owned(self.base.api().clone(), handle)
    }

    pub fn to_json(&self) -> BridgeResult<String> {
        let handle = self.handle()?;
        Ok(self
            .api()
            .data_json(handle)
            .unwrap_or_else(|| "{}".to_string()))
    }

    pub fn to_value(&self) -> BridgeResult<serde_json::Value> {
        Ok(serde_json::from_str(&self.to_json()?)?)
    }

    /// Read the whole bag back into a typed value
    pub fn deserialize<T: DeserializeOwned>(&self) -> BridgeResult<T> {
        Ok(serde_json::from_str(&self.to_json()?)?)
    }

    pub fn set_string(&self, name: &str, value: &str) -> BridgeResult<&Self> {
        let handle = self.handle()?;
        self.api()
            .data_set_string(handle, &cstring(name)?, &cstring(value)?);
        Ok(self)
    }

    pub fn set_int(&self, name: &str, value: i64) -> BridgeResult<&Self> {
        let handle = self.handle()?;
        self.api().data_set_int(handle, &cstring(name)?, value);
        Ok(self)
    }

    pub fn set_double(&self, name: &str, value: f64) -> BridgeResult<&Self> {
        let handle = self.handle()?;
        self.api().data_set_double(handle, &cstring(name)?, value);
        Ok(self)
    }

    pub fn set_bool(&self, name: &str, value: bool) -> BridgeResult<&Self> {
        let handle = self.handle()?;
        self.api().data_set_bool(handle, &cstring(name)?, value);
        Ok(self)
    }

    /// Store a copy of `value` as a nested bag
    pub fn set_obj(&self, name: &str, value: &DataObject) -> BridgeResult<&Self> {
        let handle = self.handle()?;
        let child = value.handle()?;
        self.api().data_set_obj(handle, &cstring(name)?, child);
        Ok(self)
    }

    pub fn get_string(&self, name: &str) -> BridgeResult<Option<String>> {
        let handle = self.handle()?;
        Ok(self.api().data_get_string(handle, &cstring(name)?))
    }

    pub fn get_int(&self, name: &str) -> BridgeResult<Option<i64>> {
        let handle = self.handle()?;
        Ok(self.api().data_get_int(handle, &cstring(name)?))
    }

    pub fn get_double(&self, name: &str) -> BridgeResult<Option<f64>> {
        let handle = self.handle()?;
        Ok(self.api().data_get_double(handle, &cstring(name)?))
    }

    pub fn get_bool(&self, name: &str) -> BridgeResult<Option<bool>> {
        let handle = self.handle()?;
        Ok(self.api().data_get_bool(handle, &cstring(name)?))
    }

    pub fn get_obj(&self, name: &str) -> BridgeResult<Option<DataObject>> {
        let handle = self.handle()?;
        let child = self.api().data_get_obj(handle, &cstring(name)?);
        if child.is_null() {
            return Ok(None);
        }
        Self::from_owned(self.base.api().clone(), child).map(Some)
    }

    pub fn has_value(&self, name: &str) -> BridgeResult<bool> {
        let handle = self.handle()?;
        Ok(self.api().data_has_value(handle, &cstring(name)?))
    }

    pub fn erase(&self, name: &str) -> BridgeResult<()> {
        let handle = self.handle()?;
        self.api().data_erase(handle, &cstring(name)?);
        Ok(())
    }

    pub fn dispose(&mut self) {
        self.base.release();
    }

    pub fn is_disposed(&self) -> bool {
        self.base.is_released()
    }
}

// SPDX-License-Identifier: MPL-2.0

//! Placements of a source inside a scene

use super::source::Source;
use super::transform::{BoundsType, Crop, OrderMovement, Transform, Vec2};
use crate::context::Context;
use crate::errors::{BridgeError, BridgeResult, ObjectKind};
use crate::managed::Managed;
use crate::native::{NativeApi, SceneItemHandle};
use crate::utils::lock;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug)]
struct ItemState {
    base: Managed<SceneItemHandle>,
    /// Set once the item was taken out of its scene; the native remove also
    /// released the reference
    removed: bool,
}

/// One (scene, source) placement with its transform
///
/// Clones share the same native reference. Items returned by
/// [`Scene::add_source`](super::Scene::add_source) are also tracked by their
/// scene and released in its disposal cascade.
#[derive(Clone)]
pub struct SceneItem {
    ctx: Context,
    state: Arc<Mutex<ItemState>>,
}

impl SceneItem {
    /// Take ownership of a new reference to an item
    pub(crate) fn from_owned(ctx: Context, handle: SceneItemHandle) -> BridgeResult<Self> {
        let base = Managed::wrap(ctx.api().clone(), handle, true)?;
        Ok(Self {
            ctx,
            state: Arc::new(Mutex::new(ItemState {
                base,
                removed: false,
            })),
        })
    }

    pub fn handle(&self) -> BridgeResult<SceneItemHandle> {
        lock(&self.state).base.access()
    }

    fn api(&self) -> &dyn NativeApi {
        self.ctx.api().as_ref()
    }

    /// Whether two wrappers share the same state (not just the same native item)
    pub fn same_wrapper(&self, other: &SceneItem) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// New owned wrapper for the source shown by this item
    pub fn source(&self) -> BridgeResult<Source> {
        let handle = self.handle()?;
        let source = self.api().sceneitem_source(handle);
        if source.is_null() {
            return Err(BridgeError::AcquireFailed {
                kind: ObjectKind::Source,
            });
        }
        let acquired = self.api().source_get_ref(source);
        if acquired.is_null() {
            return Err(BridgeError::AcquireFailed {
                kind: ObjectKind::Source,
            });
        }
        Source::from_owned(self.ctx.clone(), acquired)
    }

    /// Take the item out of its scene. Idempotent.
    ///
    /// The native remove consumes this wrapper's reference, so the item counts
    /// as disposed afterwards.
    pub fn remove(&self) {
        let mut state = lock(&self.state);
        if state.removed || state.base.is_released() {
            return;
        }
        state.removed = true;
        let handle = state.base.identity();
        state.base.forget();
        self.api().sceneitem_remove(handle);
        debug!(%handle, "Removed scene item");
    }

    /// Whether the item left its scene, through this wrapper or any other
    /// reference to the same native item
    pub fn is_removed(&self) -> bool {
        let state = lock(&self.state);
        if state.removed {
            return true;
        }
        !state.base.is_released() && !self.api().sceneitem_in_scene(state.base.identity())
    }

    /// Give this wrapper's reference back without touching the scene
    ///
    /// Returns whether a native release ran.
    pub fn dispose(&self) -> bool {
        let mut state = lock(&self.state);
        if state.removed {
            return false;
        }
        state.base.release()
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.state).base.is_released()
    }

    pub fn position(&self) -> BridgeResult<Vec2> {
        Ok(self.api().sceneitem_pos(self.handle()?))
    }

    pub fn set_position(&self, pos: Vec2) -> BridgeResult<&Self> {
        self.api().sceneitem_set_pos(self.handle()?, pos);
        Ok(self)
    }

    /// Degrees, clockwise
    pub fn rotation(&self) -> BridgeResult<f32> {
        Ok(self.api().sceneitem_rot(self.handle()?))
    }

    pub fn set_rotation(&self, degrees: f32) -> BridgeResult<&Self> {
        self.api().sceneitem_set_rot(self.handle()?, degrees);
        Ok(self)
    }

    pub fn scale(&self) -> BridgeResult<Vec2> {
        Ok(self.api().sceneitem_scale(self.handle()?))
    }

    pub fn set_scale(&self, scale: Vec2) -> BridgeResult<&Self> {
        self.api().sceneitem_set_scale(self.handle()?, scale);
        Ok(self)
    }

    pub fn bounds(&self) -> BridgeResult<Vec2> {
        Ok(self.api().sceneitem_bounds(self.handle()?))
    }

    pub fn set_bounds(&self, bounds: Vec2) -> BridgeResult<&Self> {
        self.api().sceneitem_set_bounds(self.handle()?, bounds);
        Ok(self)
    }

    pub fn bounds_type(&self) -> BridgeResult<BoundsType> {
        Ok(self.api().sceneitem_bounds_type(self.handle()?))
    }

    pub fn set_bounds_type(&self, bounds_type: BoundsType) -> BridgeResult<&Self> {
        self.api().sceneitem_set_bounds_type(self.handle()?, bounds_type);
        Ok(self)
    }

    pub fn crop(&self) -> BridgeResult<Crop> {
        Ok(self.api().sceneitem_crop(self.handle()?))
    }

    pub fn set_crop(&self, crop: Crop) -> BridgeResult<&Self> {
        self.api().sceneitem_set_crop(self.handle()?, crop);
        Ok(self)
    }

    pub fn set_order(&self, movement: OrderMovement) -> BridgeResult<&Self> {
        self.api().sceneitem_set_order(self.handle()?, movement);
        Ok(self)
    }

    /// Index in the scene's draw order, bottom first
    pub fn order_position(&self) -> BridgeResult<i32> {
        Ok(self.api().sceneitem_order_position(self.handle()?))
    }

    pub fn set_order_position(&self, position: i32) -> BridgeResult<&Self> {
        self.api().sceneitem_set_order_position(self.handle()?, position);
        Ok(self)
    }

    pub fn visible(&self) -> BridgeResult<bool> {
        Ok(self.api().sceneitem_visible(self.handle()?))
    }

    pub fn set_visible(&self, visible: bool) -> BridgeResult<&Self> {
        self.api().sceneitem_set_visible(self.handle()?, visible);
        Ok(self)
    }

    pub fn locked(&self) -> BridgeResult<bool> {
        Ok(self.api().sceneitem_locked(self.handle()?))
    }

    pub fn set_locked(&self, locked: bool) -> BridgeResult<&Self> {
        self.api().sceneitem_set_locked(self.handle()?, locked);
        Ok(self)
    }

    pub fn transform(&self) -> BridgeResult<Transform> {
        let handle = self.handle()?;
        let api = self.api();
        Ok(Transform {
            position: api.sceneitem_pos(handle),
            rotation: api.sceneitem_rot(handle),
            scale: api.sceneitem_scale(handle),
            bounds: api.sceneitem_bounds(handle),
            bounds_type: api.sceneitem_bounds_type(handle),
            crop: api.sceneitem_crop(handle),
        })
    }

    pub fn set_transform(&self, transform: &Transform) -> BridgeResult<&Self> {
        let handle = self.handle()?;
        let api = self.api();
        api.sceneitem_set_pos(handle, transform.position);
        api.sceneitem_set_rot(handle, transform.rotation);
        api.sceneitem_set_scale(handle, transform.scale);
        api.sceneitem_set_bounds(handle, transform.bounds);
        api.sceneitem_set_bounds_type(handle, transform.bounds_type);
        api.sceneitem_set_crop(handle, transform.crop);
        Ok(self)
    }
}

impl std::fmt::Debug for SceneItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("SceneItem")
            .field("base", &state.base)
            .field("removed", &state.removed)
            .finish()
    }
}

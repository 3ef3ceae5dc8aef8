// SPDX-License-Identifier: MPL-2.0

//! Scenes and their disposal cascade
//!
//! A scene is a source that draws an ordered list of items. The wrapper owns
//! the scene's underlying source reference and every item created through it;
//! disposal tears them down in a fixed order:
//!
//! 1. Clear the scene's program channel (only while it still holds the scene)
//! 2. Release every tracked item not already removed
//! 3. Detach the scene's source from any container
//! 4. Release the scene's own reference
//!
//! Each step runs even if an earlier one failed or panicked.

use super::scene_item::SceneItem;
use super::source::Source;
use crate::constants::type_ids;
use crate::context::Context;
use crate::errors::{BridgeError, BridgeResult, ObjectKind};
use crate::managed::teardown_step;
use crate::native::{SceneHandle, SourceHandle};
use crate::utils::cstring;
use tracing::{debug, info};

/// A scene and the items placed in it
pub struct Scene {
    source: Source,
    scene: SceneHandle,
    name: String,
    items: Vec<SceneItem>,
}

impl Scene {
    pub fn create(ctx: &Context, name: &str) -> BridgeResult<Self> {
        ctx.ensure_live()?;
        let scene = ctx.api().scene_create(&cstring(name)?);
        if scene.is_null() {
            return Err(BridgeError::CreationFailed {
                kind: ObjectKind::Scene,
                type_id: type_ids::SCENE.to_string(),
            });
        }
        // The scene's reference is held through its source
        let handle = ctx.api().scene_source(scene);
        let source = match Source::from_owned(ctx.clone(), handle) {
            Ok(source) => source,
            Err(_) => {
                return Err(BridgeError::CreationFailed {
                    kind: ObjectKind::Scene,
                    type_id: type_ids::SCENE.to_string(),
                });
            }
        };
        debug!(name, %scene, "Created scene");
        Ok(Self {
            source,
            scene,
            name: name.to_string(),
            items: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> BridgeResult<SceneHandle> {
        self.source.handle()?;
        Ok(self.scene)
    }

    /// The scene's underlying source, for nesting or channel assignment
    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn source_handle(&self) -> BridgeResult<SourceHandle> {
        self.source.handle()
    }

    /// Place `source` in this scene
    ///
    /// The returned item is also tracked by the scene and released with it.
    pub fn add_source(&mut self, source: &Source) -> BridgeResult<SceneItem> {
        let scene = self.handle()?;
        let source_handle = source.handle()?;
        let item = self.source.context().api().scene_add(scene, source_handle);
        if item.is_null() {
            return Err(BridgeError::AddFailed {
                scene: self.name.clone(),
                source_name: source.name().unwrap_or_default(),
            });
        }
        let item = SceneItem::from_owned(self.source.context().clone(), item)?;
        debug!(scene = %self.name, source = %source_handle, items = self.items.len() + 1, "Added source to scene");
        self.items.push(item.clone());
        Ok(item)
    }

    /// First item showing a source called `name`
    ///
    /// Each call returns a fresh wrapper with its own reference; it is not
    /// tracked by the scene.
    pub fn find_source(&self, name: &str) -> BridgeResult<Option<SceneItem>> {
        let scene = self.handle()?;
        let item = self
            .source
            .context()
            .api()
            .scene_find_source(scene, &cstring(name)?);
        if item.is_null() {
            return Ok(None);
        }
        SceneItem::from_owned(self.source.context().clone(), item).map(Some)
    }

    /// Items added through this scene that are still in it
    ///
    /// Removal through a [`Scene::find_source`] wrapper counts too.
    pub fn items(&self) -> Vec<SceneItem> {
        self.items
            .iter()
            .filter(|item| !item.is_removed())
            .cloned()
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_removed()).count()
    }

    /// Make this scene the live source on `channel`
    ///
    /// Replaces whatever was on the channel without disposing it; the displaced
    /// handle is returned.
    pub fn set_as_program(&mut self, channel: u32) -> BridgeResult<Option<SourceHandle>> {
        let displaced = self.source.set_as_program(channel)?;
        info!(scene = %self.name, channel, "Scene set as program");
        Ok(displaced)
    }

    pub fn assigned_channel(&self) -> Option<u32> {
        self.source.assigned_channel()
    }

    /// Run the disposal cascade. Idempotent.
    pub fn dispose(&mut self) {
        if self.source.is_disposed() {
            return;
        }
        let handle = self.source.base_identity();
        debug!(scene = %self.name, items = self.items.len(), "Disposing scene");

        teardown_step("clear scene channel", || {
            self.source.release_assigned_channel();
            Ok(())
        });

        for item in self.items.drain(..) {
            teardown_step("release scene item", || {
                item.dispose();
                Ok(())
            });
        }

        let api = self.source.context().api().clone();
        teardown_step("remove scene source", || {
            api.source_remove(handle);
            Ok(())
        });

        teardown_step("release scene", || {
            self.source.release_handle();
            Ok(())
        });
    }

    pub fn is_disposed(&self) -> bool {
        self.source.is_disposed()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("scene", &self.scene)
            .field("source", &self.source)
            .field("items", &self.items.len())
            .finish()
    }
}

// SPDX-License-Identifier: MPL-2.0

//! Sources, scenes and scene items

pub mod scene;
pub mod scene_item;
pub mod source;
pub mod transform;

pub use scene::Scene;
pub use scene_item::SceneItem;
pub use source::Source;
pub use transform::{BoundsType, Crop, OrderMovement, Transform, Vec2};

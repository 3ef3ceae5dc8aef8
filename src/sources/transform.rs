// SPDX-License-Identifier: MPL-2.0

//! Scene item transform values
//!
//! Layouts match the engine's C structs so the libobs backend can pass them by
//! pointer.

use serde::{Deserialize, Serialize};

/// 2D vector (position, scale, bounds)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Pixels cut from each edge of the source
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Crop {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Crop {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Whether nothing is cropped
    pub fn is_empty(&self) -> bool {
        *self == Crop::default()
    }
}

/// How a scene item is fitted into its bounding box
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundsType {
    /// No bounding box
    #[default]
    None = 0,
    /// Stretch to the bounds, ignoring aspect ratio
    Stretch = 1,
    /// Fit inside the bounds, keeping aspect ratio
    ScaleInner = 2,
    /// Cover the bounds, keeping aspect ratio
    ScaleOuter = 3,
    /// Match the bounds width
    ScaleToWidth = 4,
    /// Match the bounds height
    ScaleToHeight = 5,
    /// Scale down only when larger than the bounds
    MaxOnly = 6,
}

impl BoundsType {
    /// Map a raw engine value; unknown values fall back to `None`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => BoundsType::Stretch,
            2 => BoundsType::ScaleInner,
            3 => BoundsType::ScaleOuter,
            4 => BoundsType::ScaleToWidth,
            5 => BoundsType::ScaleToHeight,
            6 => BoundsType::MaxOnly,
            _ => BoundsType::None,
        }
    }
}

/// Relative reordering of an item inside its scene
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderMovement {
    MoveUp = 0,
    MoveDown = 1,
    MoveTop = 2,
    MoveBottom = 3,
}

/// Snapshot of every transform property of a scene item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    /// Degrees, clockwise
    pub rotation: f32,
    pub scale: Vec2,
    pub bounds: Vec2,
    pub bounds_type: BoundsType,
    pub crop: Crop,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            bounds: Vec2::ZERO,
            bounds_type: BoundsType::None,
            crop: Crop::default(),
        }
    }
}

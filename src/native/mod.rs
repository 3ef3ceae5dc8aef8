// SPDX-License-Identifier: MPL-2.0

//! The native engine seam
//!
//! Everything the bridge needs from the engine goes through [`NativeApi`]. The
//! engine is reference counted and aliasable: a method documented as returning a
//! *new reference* hands the caller one reference it must give back through the
//! matching release call, while a *borrowed* handle is only valid as long as its
//! owner keeps it alive. Every create/get-ref call returns the null handle on
//! failure instead of an error.
//!
//! Two backends ship with the crate:
//!
//! - [`mock::MockEngine`]: in-process reference-counted engine with a call log
//!   and fault injection, used by the test suites
//! - `libobs::LibObs` (feature `libobs`): the real engine through its C API

pub mod handles;
#[cfg(feature = "libobs")]
pub mod libobs;
pub mod mock;

pub use handles::*;

use crate::sources::transform::{BoundsType, Crop, OrderMovement, Vec2};
use libc::c_void;
use std::ffi::CStr;

/// Capability groups consumed from the native engine
///
/// Implementations must be callable from any thread; the engine's own threading
/// contract still applies to the objects behind the handles.
pub trait NativeApi: Send + Sync {
    // --- settings bags ---

    /// Create an empty bag. New reference.
    fn data_create(&self) -> DataHandle;
    /// Parse a JSON object into a bag. New reference, null on parse failure.
    fn data_create_from_json(&self, json: &CStr) -> DataHandle;
    fn data_addref(&self, data: DataHandle);
    fn data_release(&self, data: DataHandle);
    /// Serialise the bag's user values as JSON
    fn data_json(&self, data: DataHandle) -> Option<String>;
    fn data_set_string(&self, data: DataHandle, name: &CStr, value: &CStr);
    fn data_set_int(&self, data: DataHandle, name: &CStr, value: i64);
    fn data_set_double(&self, data: DataHandle, name: &CStr, value: f64);
    fn data_set_bool(&self, data: DataHandle, name: &CStr, value: bool);
    /// Store `value` as a nested bag under `name`
    fn data_set_obj(&self, data: DataHandle, name: &CStr, value: DataHandle);
    fn data_get_string(&self, data: DataHandle, name: &CStr) -> Option<String>;
    fn data_get_int(&self, data: DataHandle, name: &CStr) -> Option<i64>;
    fn data_get_double(&self, data: DataHandle, name: &CStr) -> Option<f64>;
    fn data_get_bool(&self, data: DataHandle, name: &CStr) -> Option<bool>;
    /// Nested bag under `name`. New reference, null when absent.
    fn data_get_obj(&self, data: DataHandle, name: &CStr) -> DataHandle;
    fn data_has_value(&self, data: DataHandle, name: &CStr) -> bool;
    fn data_erase(&self, data: DataHandle, name: &CStr);

    // --- sources ---

    /// New reference. `settings` may be null.
    fn source_create(
        &self,
        type_id: &CStr,
        name: &CStr,
        settings: DataHandle,
    ) -> SourceHandle;
    /// New reference to the same source, null if it is being destroyed
    fn source_get_ref(&self, source: SourceHandle) -> SourceHandle;
    fn source_release(&self, source: SourceHandle);
    fn source_update(&self, source: SourceHandle, settings: DataHandle);
    /// Detach the source from every container; does not release it
    fn source_remove(&self, source: SourceHandle);
    fn source_removed(&self, source: SourceHandle) -> bool;
    /// Current settings. New reference.
    fn source_settings(&self, source: SourceHandle) -> DataHandle;
    fn source_name(&self, source: SourceHandle) -> Option<String>;
    fn source_type_id(&self, source: SourceHandle) -> Option<String>;
    fn source_filter_add(&self, source: SourceHandle, filter: SourceHandle);
    fn source_filter_remove(&self, source: SourceHandle, filter: SourceHandle);
    fn source_set_enabled(&self, source: SourceHandle, enabled: bool);
    fn source_enabled(&self, source: SourceHandle) -> bool;
    fn source_set_muted(&self, source: SourceHandle, muted: bool);
    fn source_muted(&self, source: SourceHandle) -> bool;
    fn source_set_volume(&self, source: SourceHandle, volume: f32);
    fn source_volume(&self, source: SourceHandle) -> f32;
    fn source_width(&self, source: SourceHandle) -> u32;
    fn source_height(&self, source: SourceHandle) -> u32;
    /// Borrowed
    fn source_signal_handler(&self, source: SourceHandle) -> SignalHandlerHandle;

    // --- scenes ---

    /// New reference, owned through the scene's source (see [`Self::scene_source`])
    fn scene_create(&self, name: &CStr) -> SceneHandle;
    /// The scene's underlying source. Borrowed.
    fn scene_source(&self, scene: SceneHandle) -> SourceHandle;
    /// Place `source` in `scene`. New reference to the item, null if rejected.
    fn scene_add(&self, scene: SceneHandle, source: SourceHandle) -> SceneItemHandle;
    /// First item showing a source named `name`. New reference, null when absent.
    fn scene_find_source(&self, scene: SceneHandle, name: &CStr) -> SceneItemHandle;
    fn sceneitem_addref(&self, item: SceneItemHandle);
    fn sceneitem_release(&self, item: SceneItemHandle);
    /// Remove the item from its scene and release the caller's reference
    fn sceneitem_remove(&self, item: SceneItemHandle);
    /// Borrowed
    fn sceneitem_source(&self, item: SceneItemHandle) -> SourceHandle;
    /// False once the item was removed from its scene, through any reference
    fn sceneitem_in_scene(&self, item: SceneItemHandle) -> bool;
    fn sceneitem_pos(&self, item: SceneItemHandle) -> Vec2;
    fn sceneitem_set_pos(&self, item: SceneItemHandle, pos: Vec2);
    fn sceneitem_rot(&self, item: SceneItemHandle) -> f32;
    fn sceneitem_set_rot(&self, item: SceneItemHandle, degrees: f32);
    fn sceneitem_scale(&self, item: SceneItemHandle) -> Vec2;
    fn sceneitem_set_scale(&self, item: SceneItemHandle, scale: Vec2);
    fn sceneitem_bounds(&self, item: SceneItemHandle) -> Vec2;
    fn sceneitem_set_bounds(&self, item: SceneItemHandle, bounds: Vec2);
    fn sceneitem_bounds_type(&self, item: SceneItemHandle) -> BoundsType;
    fn sceneitem_set_bounds_type(&self, item: SceneItemHandle, bounds_type: BoundsType);
    fn sceneitem_crop(&self, item: SceneItemHandle) -> Crop;
    fn sceneitem_set_crop(&self, item: SceneItemHandle, crop: Crop);
    fn sceneitem_set_order(&self, item: SceneItemHandle, movement: OrderMovement);
    fn sceneitem_order_position(&self, item: SceneItemHandle) -> i32;
    fn sceneitem_set_order_position(&self, item: SceneItemHandle, position: i32);
    fn sceneitem_visible(&self, item: SceneItemHandle) -> bool;
    fn sceneitem_set_visible(&self, item: SceneItemHandle, visible: bool);
    fn sceneitem_locked(&self, item: SceneItemHandle) -> bool;
    fn sceneitem_set_locked(&self, item: SceneItemHandle, locked: bool);

    // --- output channels ---

    /// Put `source` on `channel`; null clears the channel
    fn set_output_source(&self, channel: u32, source: SourceHandle);
    /// New reference, null when the channel is empty
    fn get_output_source(&self, channel: u32) -> SourceHandle;

    // --- encoders ---

    /// New reference
    fn video_encoder_create(
        &self,
        type_id: &CStr,
        name: &CStr,
        settings: DataHandle,
    ) -> EncoderHandle;
    /// New reference
    fn audio_encoder_create(
        &self,
        type_id: &CStr,
        name: &CStr,
        settings: DataHandle,
        mixer: usize,
    ) -> EncoderHandle;
    /// New reference, null if the encoder is being destroyed
    fn encoder_get_ref(&self, encoder: EncoderHandle) -> EncoderHandle;
    fn encoder_release(&self, encoder: EncoderHandle);
    fn encoder_update(&self, encoder: EncoderHandle, settings: DataHandle);
    fn encoder_active(&self, encoder: EncoderHandle) -> bool;
    fn encoder_codec(&self, encoder: EncoderHandle) -> Option<String>;
    /// Feed the encoder from the engine's default video or audio pipeline
    fn encoder_bind_default_media(&self, encoder: EncoderHandle);

    // --- outputs ---

    /// New reference
    fn output_create(&self, type_id: &CStr, name: &CStr, settings: DataHandle) -> OutputHandle;
    /// New reference, null once the output is destroyed
    fn output_get_ref(&self, output: OutputHandle) -> OutputHandle;
    fn output_release(&self, output: OutputHandle);
    fn output_update(&self, output: OutputHandle, settings: DataHandle);
    /// Null detaches. The output does not keep a reference of its own.
    fn output_set_video_encoder(&self, output: OutputHandle, encoder: EncoderHandle);
    /// Null detaches. The output does not keep a reference of its own.
    fn output_set_audio_encoder(&self, output: OutputHandle, encoder: EncoderHandle, track: usize);
    fn output_set_service(&self, output: OutputHandle, service: ServiceHandle);
    fn output_start(&self, output: OutputHandle) -> bool;
    /// Request an asynchronous stop; poll [`Self::output_active`] for completion
    fn output_stop(&self, output: OutputHandle);
    fn output_force_stop(&self, output: OutputHandle);
    fn output_active(&self, output: OutputHandle) -> bool;
    fn output_reconnecting(&self, output: OutputHandle) -> bool;
    fn output_last_error(&self, output: OutputHandle) -> Option<String>;
    fn output_can_pause(&self, output: OutputHandle) -> bool;
    fn output_pause(&self, output: OutputHandle, pause: bool) -> bool;
    fn output_paused(&self, output: OutputHandle) -> bool;
    fn output_total_frames(&self, output: OutputHandle) -> u64;
    fn output_frames_dropped(&self, output: OutputHandle) -> u64;
    fn output_total_bytes(&self, output: OutputHandle) -> u64;
    /// Borrowed
    fn output_signal_handler(&self, output: OutputHandle) -> SignalHandlerHandle;

    // --- services ---

    /// New reference
    fn service_create(&self, type_id: &CStr, name: &CStr, settings: DataHandle) -> ServiceHandle;
    fn service_release(&self, service: ServiceHandle);
    fn service_update(&self, service: ServiceHandle, settings: DataHandle);
    fn service_can_try_to_connect(&self, service: ServiceHandle) -> bool;

    // --- signals ---

    /// The engine-wide signal table. Borrowed.
    fn global_signal_handler(&self) -> SignalHandlerHandle;
    /// Register `callback(data, calldata)` for `signal`. `data` must stay valid
    /// until the matching [`Self::signal_disconnect`], and so must the object
    /// owning `handler`.
    fn signal_connect(
        &self,
        handler: SignalHandlerHandle,
        signal: &CStr,
        callback: SignalCallback,
        data: *mut c_void,
    );
    /// After this returns the callback is never invoked again for this `data`.
    /// The object owning `handler` must still be alive.
    fn signal_disconnect(
        &self,
        handler: SignalHandlerHandle,
        signal: &CStr,
        callback: SignalCallback,
        data: *mut c_void,
    );

    /// # Safety
    /// `calldata` must be the blob of a signal invocation that is still running.
    unsafe fn calldata_int(&self, calldata: CalldataPtr, name: &CStr) -> Option<i64>;
    /// # Safety
    /// See [`Self::calldata_int`].
    unsafe fn calldata_float(&self, calldata: CalldataPtr, name: &CStr) -> Option<f64>;
    /// # Safety
    /// See [`Self::calldata_int`].
    unsafe fn calldata_bool(&self, calldata: CalldataPtr, name: &CStr) -> Option<bool>;
    /// # Safety
    /// See [`Self::calldata_int`].
    unsafe fn calldata_ptr(&self, calldata: CalldataPtr, name: &CStr) -> Option<*mut c_void>;
    /// # Safety
    /// See [`Self::calldata_int`].
    unsafe fn calldata_string(&self, calldata: CalldataPtr, name: &CStr) -> Option<String>;
}

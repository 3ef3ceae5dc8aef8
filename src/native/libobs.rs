// SPDX-License-Identifier: MPL-2.0

//! Production backend over the libobs C API
//!
//! libobs returns a few handles borrowed where [`NativeApi`] promises a new
//! reference (`obs_scene_add`, `obs_scene_find_source`); those take an extra
//! reference here so every wrapper releases uniformly. Engine startup and
//! module loading stay with the host application: [`LibObs::connect`] only
//! succeeds once `obs_startup` has run.

use super::handles::*;
use super::NativeApi;
use crate::sources::transform::{BoundsType, Crop, OrderMovement, Vec2};
use libc::{c_char, c_double, c_int, c_longlong, c_void, size_t};
use std::ffi::CStr;
use std::sync::Arc;
use tracing::{info, warn};

type Obj = *mut c_void;

const OBS_ENCODER_VIDEO: c_int = 1;

#[link(name = "obs")]
unsafe extern "C" {
    fn obs_initialized() -> bool;
    fn obs_get_video() -> Obj;
    fn obs_get_audio() -> Obj;
    fn obs_get_signal_handler() -> Obj;

    fn obs_data_create() -> Obj;
    fn obs_data_create_from_json(json: *const c_char) -> Obj;
    fn obs_data_addref(data: Obj);
    fn obs_data_release(data: Obj);
    fn obs_data_get_json(data: Obj) -> *const c_char;
    fn obs_data_set_string(data: Obj, name: *const c_char, val: *const c_char);
    fn obs_data_set_int(data: Obj, name: *const c_char, val: c_longlong);
    fn obs_data_set_double(data: Obj, name: *const c_char, val: c_double);
    fn obs_data_set_bool(data: Obj, name: *const c_char, val: bool);
    fn obs_data_set_obj(data: Obj, name: *const c_char, obj: Obj);
    fn obs_data_get_string(data: Obj, name: *const c_char) -> *const c_char;
    fn obs_data_get_int(data: Obj, name: *const c_char) -> c_longlong;
    fn obs_data_get_double(data: Obj, name: *const c_char) -> c_double;
    fn obs_data_get_bool(data: Obj, name: *const c_char) -> bool;
    fn obs_data_get_obj(data: Obj, name: *const c_char) -> Obj;
    fn obs_data_has_user_value(data: Obj, name: *const c_char) -> bool;
    fn obs_data_erase(data: Obj, name: *const c_char);

    fn obs_source_create(id: *const c_char, name: *const c_char, settings: Obj, hotkeys: Obj)
    -> Obj;
    fn obs_source_get_ref(source: Obj) -> Obj;
    fn obs_source_release(source: Obj);
    fn obs_source_update(source: Obj, settings: Obj);
    fn obs_source_remove(source: Obj);
    fn obs_source_removed(source: Obj) -> bool;
    fn obs_source_get_settings(source: Obj) -> Obj;
    fn obs_source_get_name(source: Obj) -> *const c_char;
    fn obs_source_get_id(source: Obj) -> *const c_char;
    fn obs_source_filter_add(source: Obj, filter: Obj);
    fn obs_source_filter_remove(source: Obj, filter: Obj);
    fn obs_source_set_enabled(source: Obj, enabled: bool);
    fn obs_source_enabled(source: Obj) -> bool;
    fn obs_source_set_muted(source: Obj, muted: bool);
    fn obs_source_muted(source: Obj) -> bool;
    fn obs_source_set_volume(source: Obj, volume: f32);
    fn obs_source_get_volume(source: Obj) -> f32;
    fn obs_source_get_width(source: Obj) -> u32;
    fn obs_source_get_height(source: Obj) -> u32;
    fn obs_source_get_signal_handler(source: Obj) -> Obj;

    fn obs_scene_create(name: *const c_char) -> Obj;
    fn obs_scene_get_source(scene: Obj) -> Obj;
    fn obs_scene_add(scene: Obj, source: Obj) -> Obj;
    fn obs_scene_find_source(scene: Obj, name: *const c_char) -> Obj;
    fn obs_sceneitem_addref(item: Obj);
    fn obs_sceneitem_release(item: Obj);
    fn obs_sceneitem_remove(item: Obj);
    fn obs_sceneitem_get_source(item: Obj) -> Obj;
    fn obs_sceneitem_get_scene(item: Obj) -> Obj;
    fn obs_sceneitem_get_pos(item: Obj, pos: *mut Vec2);
    fn obs_sceneitem_set_pos(item: Obj, pos: *const Vec2);
    fn obs_sceneitem_get_rot(item: Obj) -> f32;
    fn obs_sceneitem_set_rot(item: Obj, rot: f32);
    fn obs_sceneitem_get_scale(item: Obj, scale: *mut Vec2);
    fn obs_sceneitem_set_scale(item: Obj, scale: *const Vec2);
    fn obs_sceneitem_get_bounds(item: Obj, bounds: *mut Vec2);
    fn obs_sceneitem_set_bounds(item: Obj, bounds: *const Vec2);
    fn obs_sceneitem_get_bounds_type(item: Obj) -> c_int;
    fn obs_sceneitem_set_bounds_type(item: Obj, bounds_type: c_int);
    fn obs_sceneitem_get_crop(item: Obj, crop: *mut Crop);
    fn obs_sceneitem_set_crop(item: Obj, crop: *const Crop);
    fn obs_sceneitem_set_order(item: Obj, movement: c_int);
    fn obs_sceneitem_get_order_position(item: Obj) -> c_int;
    fn obs_sceneitem_set_order_position(item: Obj, position: c_int);
    fn obs_sceneitem_visible(item: Obj) -> bool;
    fn obs_sceneitem_set_visible(item: Obj, visible: bool) -> bool;
    fn obs_sceneitem_locked(item: Obj) -> bool;
    fn obs_sceneitem_set_locked(item: Obj, locked: bool) -> bool;

    fn obs_set_output_source(channel: u32, source: Obj);
    fn obs_get_output_source(channel: u32) -> Obj;

    fn obs_video_encoder_create(
        id: *const c_char,
        name: *const c_char,
        settings: Obj,
        hotkeys: Obj,
    ) -> Obj;
    fn obs_audio_encoder_create(
        id: *const c_char,
        name: *const c_char,
        settings: Obj,
        mixer_idx: size_t,
        hotkeys: Obj,
    ) -> Obj;
    fn obs_encoder_get_ref(encoder: Obj) -> Obj;
    fn obs_encoder_release(encoder: Obj);
    fn obs_encoder_update(encoder: Obj, settings: Obj);
    fn obs_encoder_active(encoder: Obj) -> bool;
    fn obs_encoder_get_codec(encoder: Obj) -> *const c_char;
    fn obs_encoder_get_type(encoder: Obj) -> c_int;
    fn obs_encoder_set_video(encoder: Obj, video: Obj);
    fn obs_encoder_set_audio(encoder: Obj, audio: Obj);

    fn obs_output_create(id: *const c_char, name: *const c_char, settings: Obj, hotkeys: Obj)
    -> Obj;
    fn obs_output_get_ref(output: Obj) -> Obj;
    fn obs_output_release(output: Obj);
    fn obs_output_update(output: Obj, settings: Obj);
    fn obs_output_set_video_encoder(output: Obj, encoder: Obj);
    fn obs_output_set_audio_encoder(output: Obj, encoder: Obj, idx: size_t);
    fn obs_output_set_service(output: Obj, service: Obj);
    fn obs_output_start(output: Obj) -> bool;
    fn obs_output_stop(output: Obj);
    fn obs_output_force_stop(output: Obj);
    fn obs_output_active(output: Obj) -> bool;
    fn obs_output_reconnecting(output: Obj) -> bool;
    fn obs_output_get_last_error(output: Obj) -> *const c_char;
    fn obs_output_can_pause(output: Obj) -> bool;
    fn obs_output_pause(output: Obj, pause: bool) -> bool;
    fn obs_output_paused(output: Obj) -> bool;
    fn obs_output_get_total_frames(output: Obj) -> c_int;
    fn obs_output_get_frames_dropped(output: Obj) -> c_int;
    fn obs_output_get_total_bytes(output: Obj) -> u64;
    fn obs_output_get_signal_handler(output: Obj) -> Obj;

    fn obs_service_create(id: *const c_char, name: *const c_char, settings: Obj, hotkeys: Obj)
    -> Obj;
    fn obs_service_release(service: Obj);
    fn obs_service_update(service: Obj, settings: Obj);
    fn obs_service_can_try_to_connect(service: Obj) -> bool;

    fn signal_handler_connect(handler: Obj, signal: *const c_char, callback: SignalCallback, data: Obj);
    fn signal_handler_disconnect(
        handler: Obj,
        signal: *const c_char,
        callback: SignalCallback,
        data: Obj,
    );
    fn calldata_get_data(data: Obj, name: *const c_char, out: *mut c_void, size: size_t) -> bool;
    fn calldata_get_string(data: Obj, name: *const c_char, out: *mut *const c_char) -> bool;
}

/// Copy a C string owned by the engine
///
/// # Safety
/// `ptr` must be null or point to a nul-terminated string that stays valid for
/// the duration of the call.
unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and nul-terminated per the caller's contract
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Fixed-size calldata field read
///
/// # Safety
/// `T` must match the field's native type and size.
unsafe fn calldata_value<T: Copy + Default>(calldata: CalldataPtr, name: &CStr) -> Option<T> {
    let mut value = T::default();
    // SAFETY: `value` is a valid, writable `T`; the engine copies at most `size` bytes
    let found = unsafe {
        calldata_get_data(
            calldata.as_ptr(),
            name.as_ptr(),
            (&mut value as *mut T).cast(),
            std::mem::size_of::<T>(),
        )
    };
    found.then_some(value)
}

/// The system libobs, already started by the host application
pub struct LibObs {
    _private: (),
}

impl LibObs {
    /// Attach to the running engine, or `None` before `obs_startup`
    pub fn connect() -> Option<Arc<dyn NativeApi>> {
        // SAFETY: plain query with no preconditions
        if !unsafe { obs_initialized() } {
            warn!("libobs is not initialised; start the engine before creating a context");
            return None;
        }
        info!("Attached to libobs");
        Some(Arc::new(LibObs { _private: () }))
    }
}

// Every handle reaching these methods came from the engine and is kept alive by
// the wrapper passing it in, which is what makes the calls below sound.
impl NativeApi for LibObs {
    fn data_create(&self) -> DataHandle {
        DataHandle::from_ptr(unsafe { obs_data_create() })
    }

    fn data_create_from_json(&self, json: &CStr) -> DataHandle {
        DataHandle::from_ptr(unsafe { obs_data_create_from_json(json.as_ptr()) })
    }

    fn data_addref(&self, data: DataHandle) {
        unsafe { obs_data_addref(data.as_ptr()) }
    }

    fn data_release(&self, data: DataHandle) {
        unsafe { obs_data_release(data.as_ptr()) }
    }

    fn data_json(&self, data: DataHandle) -> Option<String> {
        unsafe { owned_string(obs_data_get_json(data.as_ptr())) }
    }

    fn data_set_string(&self, data: DataHandle, name: &CStr, value: &CStr) {
        unsafe { obs_data_set_string(data.as_ptr(), name.as_ptr(), value.as_ptr()) }
    }

    fn data_set_int(&self, data: DataHandle, name: &CStr, value: i64) {
        unsafe { obs_data_set_int(data.as_ptr(), name.as_ptr(), value) }
    }

    fn data_set_double(&self, data: DataHandle, name: &CStr, value: f64) {
        unsafe { obs_data_set_double(data.as_ptr(), name.as_ptr(), value) }
    }

    fn data_set_bool(&self, data: DataHandle, name: &CStr, value: bool) {
        unsafe { obs_data_set_bool(data.as_ptr(), name.as_ptr(), value) }
    }

    fn data_set_obj(&self, data: DataHandle, name: &CStr, value: DataHandle) {
        unsafe { obs_data_set_obj(data.as_ptr(), name.as_ptr(), value.as_ptr()) }
    }

    fn data_get_string(&self, data: DataHandle, name: &CStr) -> Option<String> {
        if !self.data_has_value(data, name) {
            return None;
        }
        unsafe { owned_string(obs_data_get_string(data.as_ptr(), name.as_ptr())) }
    }

    fn data_get_int(&self, data: DataHandle, name: &CStr) -> Option<i64> {
        self.data_has_value(data, name)
            .then(|| unsafe { obs_data_get_int(data.as_ptr(), name.as_ptr()) })
    }

    fn data_get_double(&self, data: DataHandle, name: &CStr) -> Option<f64> {
        self.data_has_value(data, name)
            .then(|| unsafe { obs_data_get_double(data.as_ptr(), name.as_ptr()) })
    }

    fn data_get_bool(&self, data: DataHandle, name: &CStr) -> Option<bool> {
        self.data_has_value(data, name)
            .then(|| unsafe { obs_data_get_bool(data.as_ptr(), name.as_ptr()) })
    }

    fn data_get_obj(&self, data: DataHandle, name: &CStr) -> DataHandle {
        DataHandle::from_ptr(unsafe { obs_data_get_obj(data.as_ptr(), name.as_ptr()) })
    }

    fn data_has_value(&self, data: DataHandle, name: &CStr) -> bool {
        unsafe { obs_data_has_user_value(data.as_ptr(), name.as_ptr()) }
    }

    fn data_erase(&self, data: DataHandle, name: &CStr) {
        unsafe { obs_data_erase(data.as_ptr(), name.as_ptr()) }
    }

    fn source_create(&self, type_id: &CStr, name: &CStr, settings: DataHandle) -> SourceHandle {
        SourceHandle::from_ptr(unsafe {
            obs_source_create(
                type_id.as_ptr(),
                name.as_ptr(),
                settings.as_ptr(),
                std::ptr::null_mut(),
            )
        })
    }

    fn source_get_ref(&self, source: SourceHandle) -> SourceHandle {
        SourceHandle::from_ptr(unsafe { obs_source_get_ref(source.as_ptr()) })
    }

    fn source_release(&self, source: SourceHandle) {
        unsafe { obs_source_release(source.as_ptr()) }
    }

    fn source_update(&self, source: SourceHandle, settings: DataHandle) {
        unsafe { obs_source_update(source.as_ptr(), settings.as_ptr()) }
    }

    fn source_remove(&self, source: SourceHandle) {
        unsafe { obs_source_remove(source.as_ptr()) }
    }

    fn source_removed(&self, source: SourceHandle) -> bool {
        unsafe { obs_source_removed(source.as_ptr()) }
    }

    fn source_settings(&self, source: SourceHandle) -> DataHandle {
        DataHandle::from_ptr(unsafe { obs_source_get_settings(source.as_ptr()) })
    }

    fn source_name(&self, source: SourceHandle) -> Option<String> {
        unsafe { owned_string(obs_source_get_name(source.as_ptr())) }
    }

    fn source_type_id(&self, source: SourceHandle) -> Option<String> {
        unsafe { owned_string(obs_source_get_id(source.as_ptr())) }
    }

    fn source_filter_add(&self, source: SourceHandle, filter: SourceHandle) {
        unsafe { obs_source_filter_add(source.as_ptr(), filter.as_ptr()) }
    }

    fn source_filter_remove(&self, source: SourceHandle, filter: SourceHandle) {
        unsafe { obs_source_filter_remove(source.as_ptr(), filter.as_ptr()) }
    }

    fn source_set_enabled(&self, source: SourceHandle, enabled: bool) {
        unsafe { obs_source_set_enabled(source.as_ptr(), enabled) }
    }

    fn source_enabled(&self, source: SourceHandle) -> bool {
        unsafe { obs_source_enabled(source.as_ptr()) }
    }

    fn source_set_muted(&self, source: SourceHandle, muted: bool) {
        unsafe { obs_source_set_muted(source.as_ptr(), muted) }
    }

    fn source_muted(&self, source: SourceHandle) -> bool {
        unsafe { obs_source_muted(source.as_ptr()) }
    }

    fn source_set_volume(&self, source: SourceHandle, volume: f32) {
        unsafe { obs_source_set_volume(source.as_ptr(), volume) }
    }

    fn source_volume(&self, source: SourceHandle) -> f32 {
        unsafe { obs_source_get_volume(source.as_ptr()) }
    }

    fn source_width(&self, source: SourceHandle) -> u32 {
        unsafe { obs_source_get_width(source.as_ptr()) }
    }

    fn source_height(&self, source: SourceHandle) -> u32 {
        unsafe { obs_source_get_height(source.as_ptr()) }
    }

    fn source_signal_handler(&self, source: SourceHandle) -> SignalHandlerHandle {
        SignalHandlerHandle::from_ptr(unsafe { obs_source_get_signal_handler(source.as_ptr()) })
    }

    fn scene_create(&self, name: &CStr) -> SceneHandle {
        SceneHandle::from_ptr(unsafe { obs_scene_create(name.as_ptr()) })
    }

    fn scene_source(&self, scene: SceneHandle) -> SourceHandle {
        SourceHandle::from_ptr(unsafe { obs_scene_get_source(scene.as_ptr()) })
    }

    fn scene_add(&self, scene: SceneHandle, source: SourceHandle) -> SceneItemHandle {
        let item = unsafe { obs_scene_add(scene.as_ptr(), source.as_ptr()) };
        if !item.is_null() {
            // borrowed from the scene; take the caller's reference
            unsafe { obs_sceneitem_addref(item) };
        }
        SceneItemHandle::from_ptr(item)
    }

    fn scene_find_source(&self, scene: SceneHandle, name: &CStr) -> SceneItemHandle {
        let item = unsafe { obs_scene_find_source(scene.as_ptr(), name.as_ptr()) };
        if !item.is_null() {
            unsafe { obs_sceneitem_addref(item) };
        }
        SceneItemHandle::from_ptr(item)
    }

    fn sceneitem_addref(&self, item: SceneItemHandle) {
        unsafe { obs_sceneitem_addref(item.as_ptr()) }
    }

    fn sceneitem_release(&self, item: SceneItemHandle) {
        unsafe { obs_sceneitem_release(item.as_ptr()) }
    }

    fn sceneitem_remove(&self, item: SceneItemHandle) {
        // remove drops the scene's reference, release drops ours
        unsafe {
            obs_sceneitem_remove(item.as_ptr());
            obs_sceneitem_release(item.as_ptr());
        }
    }

    fn sceneitem_source(&self, item: SceneItemHandle) -> SourceHandle {
        SourceHandle::from_ptr(unsafe { obs_sceneitem_get_source(item.as_ptr()) })
    }

    fn sceneitem_in_scene(&self, item: SceneItemHandle) -> bool {
        // removal detaches the item from its parent scene
        !unsafe { obs_sceneitem_get_scene(item.as_ptr()) }.is_null()
    }

    fn sceneitem_pos(&self, item: SceneItemHandle) -> Vec2 {
        let mut pos = Vec2::ZERO;
        unsafe { obs_sceneitem_get_pos(item.as_ptr(), &mut pos) };
        pos
    }

    fn sceneitem_set_pos(&self, item: SceneItemHandle, pos: Vec2) {
        unsafe { obs_sceneitem_set_pos(item.as_ptr(), &pos) }
    }

    fn sceneitem_rot(&self, item: SceneItemHandle) -> f32 {
        unsafe { obs_sceneitem_get_rot(item.as_ptr()) }
    }

    fn sceneitem_set_rot(&self, item: SceneItemHandle, degrees: f32) {
        unsafe { obs_sceneitem_set_rot(item.as_ptr(), degrees) }
    }

    fn sceneitem_scale(&self, item: SceneItemHandle) -> Vec2 {
        let mut scale = Vec2::ONE;
        unsafe { obs_sceneitem_get_scale(item.as_ptr(), &mut scale) };
        scale
    }

    fn sceneitem_set_scale(&self, item: SceneItemHandle, scale: Vec2) {
        unsafe { obs_sceneitem_set_scale(item.as_ptr(), &scale) }
    }

    fn sceneitem_bounds(&self, item: SceneItemHandle) -> Vec2 {
        let mut bounds = Vec2::ZERO;
        unsafe { obs_sceneitem_get_bounds(item.as_ptr(), &mut bounds) };
        bounds
    }

    fn sceneitem_set_bounds(&self, item: SceneItemHandle, bounds: Vec2) {
        unsafe { obs_sceneitem_set_bounds(item.as_ptr(), &bounds) }
    }

    fn sceneitem_bounds_type(&self, item: SceneItemHandle) -> BoundsType {
        BoundsType::from_raw(unsafe { obs_sceneitem_get_bounds_type(item.as_ptr()) })
    }

    fn sceneitem_set_bounds_type(&self, item: SceneItemHandle, bounds_type: BoundsType) {
        unsafe { obs_sceneitem_set_bounds_type(item.as_ptr(), bounds_type as c_int) }
    }

    fn sceneitem_crop(&self, item: SceneItemHandle) -> Crop {
        let mut crop = Crop::default();
        unsafe { obs_sceneitem_get_crop(item.as_ptr(), &mut crop) };
        crop
    }

    fn sceneitem_set_crop(&self, item: SceneItemHandle, crop: Crop) {
        unsafe { obs_sceneitem_set_crop(item.as_ptr(), &crop) }
    }

    fn sceneitem_set_order(&self, item: SceneItemHandle, movement: OrderMovement) {
        unsafe { obs_sceneitem_set_order(item.as_ptr(), movement as c_int) }
    }

    fn sceneitem_order_position(&self, item: SceneItemHandle) -> i32 {
        unsafe { obs_sceneitem_get_order_position(item.as_ptr()) }
    }

    fn sceneitem_set_order_position(&self, item: SceneItemHandle, position: i32) {
        unsafe { obs_sceneitem_set_order_position(item.as_ptr(), position) }
    }

    fn sceneitem_visible(&self, item: SceneItemHandle) -> bool {
        unsafe { obs_sceneitem_visible(item.as_ptr()) }
    }

    fn sceneitem_set_visible(&self, item: SceneItemHandle, visible: bool) {
        unsafe { obs_sceneitem_set_visible(item.as_ptr(), visible) };
    }

    fn sceneitem_locked(&self, item: SceneItemHandle) -> bool {
        unsafe { obs_sceneitem_locked(item.as_ptr()) }
    }

    fn sceneitem_set_locked(&self, item: SceneItemHandle, locked: bool) {
        unsafe { obs_sceneitem_set_locked(item.as_ptr(), locked) };
    }

    fn set_output_source(&self, channel: u32, source: SourceHandle) {
        unsafe { obs_set_output_source(channel, source.as_ptr()) }
    }

    fn get_output_source(&self, channel: u32) -> SourceHandle {
        SourceHandle::from_ptr(unsafe { obs_get_output_source(channel) })
    }

    fn video_encoder_create(
        &self,
        type_id: &CStr,
        name: &CStr,
        settings: DataHandle,
    ) -> EncoderHandle {
        EncoderHandle::from_ptr(unsafe {
            obs_video_encoder_create(
                type_id.as_ptr(),
                name.as_ptr(),
                settings.as_ptr(),
                std::ptr::null_mut(),
            )
        })
    }

    fn audio_encoder_create(
        &self,
        type_id: &CStr,
        name: &CStr,
        settings: DataHandle,
        mixer: usize,
    ) -> EncoderHandle {
        EncoderHandle::from_ptr(unsafe {
            obs_audio_encoder_create(
                type_id.as_ptr(),
                name.as_ptr(),
                settings.as_ptr(),
                mixer,
                std::ptr::null_mut(),
            )
        })
    }

    fn encoder_get_ref(&self, encoder: EncoderHandle) -> EncoderHandle {
        EncoderHandle::from_ptr(unsafe { obs_encoder_get_ref(encoder.as_ptr()) })
    }

    fn encoder_release(&self, encoder: EncoderHandle) {
        unsafe { obs_encoder_release(encoder.as_ptr()) }
    }

    fn encoder_update(&self, encoder: EncoderHandle, settings: DataHandle) {
        unsafe { obs_encoder_update(encoder.as_ptr(), settings.as_ptr()) }
    }

    fn encoder_active(&self, encoder: EncoderHandle) -> bool {
        unsafe { obs_encoder_active(encoder.as_ptr()) }
    }

    fn encoder_codec(&self, encoder: EncoderHandle) -> Option<String> {
        unsafe { owned_string(obs_encoder_get_codec(encoder.as_ptr())) }
    }

    fn encoder_bind_default_media(&self, encoder: EncoderHandle) {
        unsafe {
            if obs_encoder_get_type(encoder.as_ptr()) == OBS_ENCODER_VIDEO {
                obs_encoder_set_video(encoder.as_ptr(), obs_get_video());
            } else {
                obs_encoder_set_audio(encoder.as_ptr(), obs_get_audio());
            }
        }
    }

    fn output_create(&self, type_id: &CStr, name: &CStr, settings: DataHandle) -> OutputHandle {
        OutputHandle::from_ptr(unsafe {
            obs_output_create(
                type_id.as_ptr(),
                name.as_ptr(),
                settings.as_ptr(),
                std::ptr::null_mut(),
            )
        })
    }

    fn output_get_ref(&self, output: OutputHandle) -> OutputHandle {
        OutputHandle::from_ptr(unsafe { obs_output_get_ref(output.as_ptr()) })
    }

    fn output_release(&self, output: OutputHandle) {
        unsafe { obs_output_release(output.as_ptr()) }
    }

    fn output_update(&self, output: OutputHandle, settings: DataHandle) {
        unsafe { obs_output_update(output.as_ptr(), settings.as_ptr()) }
    }

    fn output_set_video_encoder(&self, output: OutputHandle, encoder: EncoderHandle) {
        unsafe { obs_output_set_video_encoder(output.as_ptr(), encoder.as_ptr()) }
    }

    fn output_set_audio_encoder(&self, output: OutputHandle, encoder: EncoderHandle, track: usize) {
        unsafe { obs_output_set_audio_encoder(output.as_ptr(), encoder.as_ptr(), track) }
    }

    fn output_set_service(&self, output: OutputHandle, service: ServiceHandle) {
        unsafe { obs_output_set_service(output.as_ptr(), service.as_ptr()) }
    }

    fn output_start(&self, output: OutputHandle) -> bool {
        unsafe { obs_output_start(output.as_ptr()) }
    }

    fn output_stop(&self, output: OutputHandle) {
        unsafe { obs_output_stop(output.as_ptr()) }
    }

    fn output_force_stop(&self, output: OutputHandle) {
        unsafe { obs_output_force_stop(output.as_ptr()) }
    }

    fn output_active(&self, output: OutputHandle) -> bool {
        unsafe { obs_output_active(output.as_ptr()) }
    }

    fn output_reconnecting(&self, output: OutputHandle) -> bool {
        unsafe { obs_output_reconnecting(output.as_ptr()) }
    }

    fn output_last_error(&self, output: OutputHandle) -> Option<String> {
        unsafe { owned_string(obs_output_get_last_error(output.as_ptr())) }
    }

    fn output_can_pause(&self, output: OutputHandle) -> bool {
        unsafe { obs_output_can_pause(output.as_ptr()) }
    }

    fn output_pause(&self, output: OutputHandle, pause: bool) -> bool {
        unsafe { obs_output_pause(output.as_ptr(), pause) }
    }

    fn output_paused(&self, output: OutputHandle) -> bool {
        unsafe { obs_output_paused(output.as_ptr()) }
    }

    fn output_total_frames(&self, output: OutputHandle) -> u64 {
        let frames = unsafe { obs_output_get_total_frames(output.as_ptr()) };
        u64::try_from(frames).unwrap_or(0)
    }

    fn output_frames_dropped(&self, output: OutputHandle) -> u64 {
        let frames = unsafe { obs_output_get_frames_dropped(output.as_ptr()) };
        u64::try_from(frames).unwrap_or(0)
    }

    fn output_total_bytes(&self, output: OutputHandle) -> u64 {
        unsafe { obs_output_get_total_bytes(output.as_ptr()) }
    }

    fn output_signal_handler(&self, output: OutputHandle) -> SignalHandlerHandle {
        SignalHandlerHandle::from_ptr(unsafe { obs_output_get_signal_handler(output.as_ptr()) })
    }

    fn service_create(&self, type_id: &CStr, name: &CStr, settings: DataHandle) -> ServiceHandle {
        ServiceHandle::from_ptr(unsafe {
            obs_service_create(
                type_id.as_ptr(),
                name.as_ptr(),
                settings.as_ptr(),
                std::ptr::null_mut(),
            )
        })
    }

    fn service_release(&self, service: ServiceHandle) {
        unsafe { obs_service_release(service.as_ptr()) }
    }

    fn service_update(&self, service: ServiceHandle, settings: DataHandle) {
        unsafe { obs_service_update(service.as_ptr(), settings.as_ptr()) }
    }

    fn service_can_try_to_connect(&self, service: ServiceHandle) -> bool {
        unsafe { obs_service_can_try_to_connect(service.as_ptr()) }
    }

    fn global_signal_handler(&self) -> SignalHandlerHandle {
        SignalHandlerHandle::from_ptr(unsafe { obs_get_signal_handler() })
    }

    fn signal_connect(
        &self,
        handler: SignalHandlerHandle,
        signal: &CStr,
        callback: SignalCallback,
        data: *mut c_void,
    ) {
        unsafe { signal_handler_connect(handler.as_ptr(), signal.as_ptr(), callback, data) }
    }

    fn signal_disconnect(
        &self,
        handler: SignalHandlerHandle,
        signal: &CStr,
        callback: SignalCallback,
        data: *mut c_void,
    ) {
        unsafe { signal_handler_disconnect(handler.as_ptr(), signal.as_ptr(), callback, data) }
    }

    unsafe fn calldata_int(&self, calldata: CalldataPtr, name: &CStr) -> Option<i64> {
        unsafe { calldata_value::<c_longlong>(calldata, name) }
    }

    unsafe fn calldata_float(&self, calldata: CalldataPtr, name: &CStr) -> Option<f64> {
        unsafe { calldata_value::<c_double>(calldata, name) }
    }

    unsafe fn calldata_bool(&self, calldata: CalldataPtr, name: &CStr) -> Option<bool> {
        unsafe { calldata_value::<bool>(calldata, name) }
    }

    unsafe fn calldata_ptr(&self, calldata: CalldataPtr, name: &CStr) -> Option<*mut c_void> {
        unsafe { calldata_value::<usize>(calldata, name) }.map(|raw| raw as *mut c_void)
    }

    unsafe fn calldata_string(&self, calldata: CalldataPtr, name: &CStr) -> Option<String> {
        let mut value: *const c_char = std::ptr::null();
        let found =
            unsafe { calldata_get_string(calldata.as_ptr(), name.as_ptr(), &mut value) };
        if !found {
            return None;
        }
        unsafe { owned_string(value) }
    }
}

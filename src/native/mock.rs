// SPDX-License-Identifier: MPL-2.0

//! In-process reference-counted engine
//!
//! [`MockEngine`] implements [`NativeApi`] without any media pipeline behind it.
//! It keeps per-object reference counts with the same ownership rules the trait
//! documents, records every call in a chronological log, and lets tests inject
//! faults: factories that reject a type id, releases that panic, outputs whose
//! stop never completes.
//!
//! Touching a destroyed or unknown handle never crashes; it is recorded as a
//! [`MockCall::UseAfterFree`] so suites can assert the bridge stayed clean.

use super::handles::*;
use super::NativeApi;
use crate::errors::ObjectKind;
use crate::sources::transform::{BoundsType, Crop, OrderMovement, Vec2};
use crate::utils::lock;
use libc::c_void;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::{CStr, CString};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// One observable engine call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Create {
        kind: ObjectKind,
        handle: usize,
        type_id: String,
    },
    AddRef {
        kind: ObjectKind,
        handle: usize,
    },
    Release {
        kind: ObjectKind,
        handle: usize,
    },
    /// Reference count reached zero
    Destroy {
        kind: ObjectKind,
        handle: usize,
    },
    Update {
        kind: ObjectKind,
        handle: usize,
    },
    SourceRemove {
        handle: usize,
    },
    SceneItemRemove {
        handle: usize,
    },
    FilterAdd {
        source: usize,
        filter: usize,
    },
    FilterRemove {
        source: usize,
        filter: usize,
    },
    SetOutputSource {
        channel: u32,
        source: usize,
    },
    SetVideoEncoder {
        output: usize,
        encoder: usize,
    },
    SetAudioEncoder {
        output: usize,
        encoder: usize,
        track: usize,
    },
    SetService {
        output: usize,
        service: usize,
    },
    OutputStart {
        handle: usize,
    },
    OutputStop {
        handle: usize,
    },
    OutputForceStop {
        handle: usize,
    },
    OutputPause {
        handle: usize,
        pause: bool,
    },
    SignalConnect {
        handler: usize,
        signal: String,
    },
    SignalDisconnect {
        handler: usize,
        signal: String,
    },
    /// A destroyed or never-created handle was passed in
    UseAfterFree {
        handle: usize,
        operation: &'static str,
    },
}

/// How an output reacts to a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBehavior {
    /// Inactive as soon as stop is requested
    #[default]
    Immediate,
    /// Stays active until force-stopped
    Never,
    /// Becomes inactive after this many activity queries
    AfterPolls(u32),
}

/// A value carried in a [`MockCalldata`] blob
#[derive(Debug, Clone, PartialEq)]
pub enum CalldataValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Ptr(usize),
    String(CString),
}

/// Event parameter blob handed to signal callbacks by the mock
#[derive(Debug, Clone, Default)]
pub struct MockCalldata {
    fields: HashMap<String, CalldataValue>,
}

impl MockCalldata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_int(mut self, name: &str, value: i64) -> Self {
        self.fields.insert(name.to_string(), CalldataValue::Int(value));
        self
    }

    pub fn with_float(mut self, name: &str, value: f64) -> Self {
        self.fields
            .insert(name.to_string(), CalldataValue::Float(value));
        self
    }

    pub fn with_bool(mut self, name: &str, value: bool) -> Self {
        self.fields.insert(name.to_string(), CalldataValue::Bool(value));
        self
    }

    pub fn with_ptr(mut self, name: &str, value: usize) -> Self {
        self.fields.insert(name.to_string(), CalldataValue::Ptr(value));
        self
    }

    pub fn with_string(mut self, name: &str, value: &str) -> Self {
        let value = CString::new(value).unwrap_or_default();
        self.fields
            .insert(name.to_string(), CalldataValue::String(value));
        self
    }

    fn get(&self, name: &CStr) -> Option<&CalldataValue> {
        self.fields.get(name.to_str().ok()?)
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    callback: SignalCallback,
    data: usize,
}

#[derive(Debug, Default)]
struct SourceBody {
    type_id: String,
    name: String,
    settings: usize,
    removed: bool,
    enabled: bool,
    muted: bool,
    volume: f32,
    filters: Vec<usize>,
    signals: usize,
    /// Items placed in this source when it is a scene
    items: Option<Vec<usize>>,
}

#[derive(Debug)]
struct ItemBody {
    scene: usize,
    source: usize,
    /// Whether the scene still holds its own reference
    in_scene: bool,
    pos: Vec2,
    rot: f32,
    scale: Vec2,
    bounds: Vec2,
    bounds_type: BoundsType,
    crop: Crop,
    visible: bool,
    locked: bool,
}

#[derive(Debug)]
struct EncoderBody {
    type_id: String,
    settings: Map<String, Value>,
    bound: bool,
}

#[derive(Debug)]
struct OutputBody {
    settings: Map<String, Value>,
    video_encoder: usize,
    audio_encoders: BTreeMap<usize, usize>,
    service: usize,
    active: bool,
    stopping: bool,
    paused: bool,
    can_pause: bool,
    reconnecting: bool,
    stop_behavior: StopBehavior,
    polls_left: u32,
    stop_code: i64,
    start_error: Option<String>,
    last_error: Option<String>,
    total_frames: u64,
    dropped_frames: u64,
    total_bytes: u64,
    signals: usize,
}

#[derive(Debug)]
struct ServiceBody {
    settings: Map<String, Value>,
    connectable: bool,
}

#[derive(Debug)]
enum Body {
    Data(Map<String, Value>),
    Source(SourceBody),
    SceneItem(ItemBody),
    Encoder(EncoderBody),
    Output(OutputBody),
    Service(ServiceBody),
}

#[derive(Debug)]
struct MockObject {
    kind: ObjectKind,
    refs: u32,
    alive: bool,
    body: Body,
}

struct MockState {
    next_handle: usize,
    objects: HashMap<usize, MockObject>,
    calls: Vec<MockCall>,
    channels: BTreeMap<u32, usize>,
    slots: HashMap<(usize, String), Vec<Slot>>,
    global_signals: usize,
    rejected_types: HashSet<String>,
    panic_on_release: HashSet<usize>,
    default_stop_behavior: StopBehavior,
}

/// A signal emission collected under the lock and delivered after it is dropped
struct Emission {
    handler: usize,
    signal: &'static str,
    calldata: MockCalldata,
}

impl MockState {
    fn new() -> Self {
        let mut state = Self {
            next_handle: 1,
            objects: HashMap::new(),
            calls: Vec::new(),
            channels: BTreeMap::new(),
            slots: HashMap::new(),
            global_signals: 0,
            rejected_types: HashSet::new(),
            panic_on_release: HashSet::new(),
            default_stop_behavior: StopBehavior::Immediate,
        };
        state.global_signals = state.next_id();
        state
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn alloc(&mut self, kind: ObjectKind, body: Body) -> usize {
        let handle = self.next_id();
        self.objects.insert(
            handle,
            MockObject {
                kind,
                refs: 1,
                alive: true,
                body,
            },
        );
        handle
    }

    fn alloc_data(&mut self, map: Map<String, Value>) -> usize {
        self.alloc(ObjectKind::Data, Body::Data(map))
    }

    fn log(&mut self, call: MockCall) {
        trace!(?call, "mock engine call");
        self.calls.push(call);
    }

    fn live(&mut self, handle: usize, operation: &'static str) -> Option<&mut MockObject> {
        let alive = self.objects.get(&handle).is_some_and(|o| o.alive);
        if !alive {
            self.log(MockCall::UseAfterFree { handle, operation });
            return None;
        }
        self.objects.get_mut(&handle)
    }

    fn kind_of(&self, handle: usize) -> Option<ObjectKind> {
        self.objects.get(&handle).map(|o| o.kind)
    }

    fn addref(&mut self, handle: usize, operation: &'static str) -> bool {
        match self.live(handle, operation) {
            Some(object) => {
                object.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one reference; destroys objects (and what they hold) at zero
    fn unref(&mut self, handle: usize) {
        let mut pending = vec![handle];
        while let Some(handle) = pending.pop() {
            let Some(object) = self.objects.get_mut(&handle) else {
                continue;
            };
            if !object.alive {
                continue;
            }
            object.refs = object.refs.saturating_sub(1);
            if object.refs > 0 {
                continue;
            }
            object.alive = false;
            let kind = object.kind;
            match &mut object.body {
                Body::Source(source) => {
                    pending.push(source.settings);
                    pending.extend(source.filters.drain(..));
                    if let Some(items) = source.items.take() {
                        pending.extend(items);
                    }
                }
                Body::SceneItem(item) => pending.push(item.source),
                _ => {}
            }
            self.log(MockCall::Destroy { kind, handle });
        }
    }

    fn data_map(&mut self, handle: usize, operation: &'static str) -> Option<&mut Map<String, Value>> {
        match &mut self.live(handle, operation)?.body {
            Body::Data(map) => Some(map),
            _ => None,
        }
    }

    fn data_value(&mut self, handle: usize, name: &CStr) -> Option<Value> {
        let key = name.to_str().ok()?;
        self.data_map(handle, "data_get")?.get(key).cloned()
    }

    fn copy_settings(&mut self, settings: usize) -> Map<String, Value> {
        if settings == 0 {
            return Map::new();
        }
        self.data_map(settings, "copy_settings")
            .cloned()
            .unwrap_or_default()
    }

    fn source(&mut self, handle: usize, operation: &'static str) -> Option<&mut SourceBody> {
        match &mut self.live(handle, operation)?.body {
            Body::Source(source) => Some(source),
            _ => None,
        }
    }

    fn item(&mut self, handle: usize, operation: &'static str) -> Option<&mut ItemBody> {
        match &mut self.live(handle, operation)?.body {
            Body::SceneItem(item) => Some(item),
            _ => None,
        }
    }

    fn encoder(&mut self, handle: usize, operation: &'static str) -> Option<&mut EncoderBody> {
        match &mut self.live(handle, operation)?.body {
            Body::Encoder(encoder) => Some(encoder),
            _ => None,
        }
    }

    fn output(&mut self, handle: usize, operation: &'static str) -> Option<&mut OutputBody> {
        match &mut self.live(handle, operation)?.body {
            Body::Output(output) => Some(output),
            _ => None,
        }
    }

    fn service(&mut self, handle: usize, operation: &'static str) -> Option<&mut ServiceBody> {
        match &mut self.live(handle, operation)?.body {
            Body::Service(service) => Some(service),
            _ => None,
        }
    }

    fn rejects(&self, type_id: &CStr) -> bool {
        self.rejected_types
            .contains(type_id.to_string_lossy().as_ref())
    }

    /// Whether `handler` is the global table or belongs to a live object
    fn handler_live(&self, handler: usize) -> bool {
        handler == self.global_signals
            || self.objects.values().any(|o| {
                o.alive
                    && match &o.body {
                        Body::Source(source) => source.signals == handler,
                        Body::Output(output) => output.signals == handler,
                        _ => false,
                    }
            })
    }

    fn slots_for(&self, handler: usize, signal: &str) -> Vec<Slot> {
        self.slots
            .get(&(handler, signal.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn finish_stop(&mut self, handle: usize) -> Option<Emission> {
        let output = self.output(handle, "finish_stop")?;
        output.active = false;
        output.stopping = false;
        output.paused = false;
        Some(Emission {
            handler: output.signals,
            signal: "stop",
            calldata: MockCalldata::new()
                .with_ptr("output", handle)
                .with_int("code", output.stop_code),
        })
    }
}

/// In-process engine for tests and headless runs
pub struct MockEngine {
    state: Mutex<MockState>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::new()),
        })
    }

    /// This engine as the trait object the wrappers consume
    pub fn api(self: &Arc<Self>) -> Arc<dyn NativeApi> {
        self.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    fn deliver(&self, emission: Emission) {
        self.emit(
            SignalHandlerHandle::from_raw(emission.handler),
            emission.signal,
            &emission.calldata,
        );
    }

    /// Invoke every callback connected to `signal` on `handler`
    ///
    /// Returns how many callbacks ran.
    pub fn emit(
        &self,
        handler: SignalHandlerHandle,
        signal: &str,
        calldata: &MockCalldata,
    ) -> usize {
        let slots = self.state().slots_for(handler.raw(), signal);
        let blob = calldata as *const MockCalldata as *mut c_void;
        for slot in &slots {
            // SAFETY: `slot.data` was registered through `signal_connect`, whose
            // contract keeps it valid until disconnect, and `blob` outlives the call.
            unsafe { (slot.callback)(slot.data as *mut c_void, blob) };
        }
        slots.len()
    }

    // --- inspection ---

    /// Snapshot of the call log
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Use-after-free and unknown-handle accesses seen so far
    pub fn violations(&self) -> Vec<MockCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::UseAfterFree { .. }))
            .cloned()
            .collect()
    }

    pub fn is_alive(&self, handle: usize) -> bool {
        self.state()
            .objects
            .get(&handle)
            .is_some_and(|o| o.alive)
    }

    pub fn ref_count(&self, handle: usize) -> u32 {
        self.state()
            .objects
            .get(&handle)
            .filter(|o| o.alive)
            .map_or(0, |o| o.refs)
    }

    /// Number of objects of `kind` still alive
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.state()
            .objects
            .values()
            .filter(|o| o.alive && o.kind == kind)
            .count()
    }

    /// Total objects still alive
    pub fn live_objects(&self) -> usize {
        self.state().objects.values().filter(|o| o.alive).count()
    }

    /// Raw source handle currently on `channel`
    pub fn channel(&self, channel: u32) -> Option<usize> {
        self.state().channels.get(&channel).copied()
    }

    /// Number of callbacks connected to `signal` on `handler`
    pub fn connected(&self, handler: SignalHandlerHandle, signal: &str) -> usize {
        self.state().slots_for(handler.raw(), signal).len()
    }

    // --- fault injection ---

    /// Make every factory return null for `type_id`
    pub fn reject_type(&self, type_id: &str) {
        self.state().rejected_types.insert(type_id.to_string());
    }

    /// Panic (after logging the call) whenever `handle` is released
    pub fn panic_on_release(&self, handle: usize) {
        self.state().panic_on_release.insert(handle);
    }

    /// Stop behaviour for outputs created from now on
    pub fn set_default_stop_behavior(&self, behavior: StopBehavior) {
        self.state().default_stop_behavior = behavior;
    }

    pub fn set_stop_behavior(&self, output: OutputHandle, behavior: StopBehavior) {
        if let Some(body) = self.state().output(output.raw(), "set_stop_behavior") {
            body.stop_behavior = behavior;
        }
    }

    /// Value of the `code` field carried by the output's `stop` signal
    pub fn set_stop_code(&self, output: OutputHandle, code: i64) {
        if let Some(body) = self.state().output(output.raw(), "set_stop_code") {
            body.stop_code = code;
        }
    }

    /// Make the next starts of `output` fail with `error`
    pub fn fail_start(&self, output: OutputHandle, error: &str) {
        if let Some(body) = self.state().output(output.raw(), "fail_start") {
            body.start_error = Some(error.to_string());
        }
    }

    pub fn set_can_pause(&self, output: OutputHandle, can_pause: bool) {
        if let Some(body) = self.state().output(output.raw(), "set_can_pause") {
            body.can_pause = can_pause;
        }
    }

    pub fn set_reconnecting(&self, output: OutputHandle, reconnecting: bool) {
        if let Some(body) = self.state().output(output.raw(), "set_reconnecting") {
            body.reconnecting = reconnecting;
        }
    }

    pub fn set_output_stats(&self, output: OutputHandle, frames: u64, dropped: u64, bytes: u64) {
        if let Some(body) = self.state().output(output.raw(), "set_output_stats") {
            body.total_frames = frames;
            body.dropped_frames = dropped;
            body.total_bytes = bytes;
        }
    }

    pub fn set_service_connectable(&self, service: ServiceHandle, connectable: bool) {
        if let Some(body) = self.state().service(service.raw(), "set_service_connectable") {
            body.connectable = connectable;
        }
    }

    /// Scene items currently placed in the scene behind `source`
    pub fn scene_items(&self, source: SourceHandle) -> Vec<usize> {
        self.state()
            .source(source.raw(), "scene_items")
            .and_then(|s| s.items.clone())
            .unwrap_or_default()
    }

    /// Settings held by a source, encoder, output or service, as JSON
    pub fn settings_of(&self, handle: usize) -> Option<Value> {
        let st = self.state();
        let object = st.objects.get(&handle).filter(|o| o.alive)?;
        let map = match &object.body {
            Body::Source(source) => match &st.objects.get(&source.settings)?.body {
                Body::Data(map) => map.clone(),
                _ => return None,
            },
            Body::Encoder(encoder) => encoder.settings.clone(),
            Body::Output(output) => output.settings.clone(),
            Body::Service(service) => service.settings.clone(),
            Body::Data(map) => map.clone(),
            Body::SceneItem(_) => return None,
        };
        Some(Value::Object(map))
    }

    /// Whether the encoder was bound to the default media pipeline
    pub fn is_bound(&self, encoder: EncoderHandle) -> bool {
        self.state()
            .encoder(encoder.raw(), "is_bound")
            .is_some_and(|e| e.bound)
    }

    /// Video encoder currently set on `output`
    pub fn output_video_encoder(&self, output: OutputHandle) -> Option<usize> {
        self.state()
            .output(output.raw(), "output_video_encoder")
            .map(|o| o.video_encoder)
            .filter(|&e| e != 0)
    }

    fn create_source(&self, type_id: &CStr, name: &CStr, settings: DataHandle, scene: bool) -> usize {
        let mut st = self.state();
        if st.rejects(type_id) {
            return 0;
        }
        let map = st.copy_settings(settings.raw());
        let settings = st.alloc_data(map);
        let signals = st.next_id();
        let kind = if scene {
            ObjectKind::Scene
        } else {
            ObjectKind::Source
        };
        let handle = st.alloc(
            kind,
            Body::Source(SourceBody {
                type_id: type_id.to_string_lossy().into_owned(),
                name: name.to_string_lossy().into_owned(),
                settings,
                enabled: true,
                volume: 1.0,
                signals,
                items: scene.then(Vec::new),
                ..SourceBody::default()
            }),
        );
        st.log(MockCall::Create {
            kind,
            handle,
            type_id: type_id.to_string_lossy().into_owned(),
        });
        handle
    }

    fn release(&self, handle: usize, operation: &'static str) {
        let mut st = self.state();
        let Some(kind) = st.live(handle, operation).map(|o| o.kind) else {
            return;
        };
        st.log(MockCall::Release { kind, handle });
        if st.panic_on_release.contains(&handle) {
            drop(st);
            panic!("injected release failure for {kind} {handle}");
        }
        st.unref(handle);
    }

    fn get_ref(&self, handle: usize, operation: &'static str) -> usize {
        let mut st = self.state();
        if !st.addref(handle, operation) {
            return 0;
        }
        let kind = st.kind_of(handle).unwrap_or(ObjectKind::Data);
        st.log(MockCall::AddRef { kind, handle });
        handle
    }

    fn output_map<T>(&self, output: OutputHandle, operation: &'static str, f: impl FnOnce(&mut OutputBody) -> T) -> Option<T> {
        self.state().output(output.raw(), operation).map(f)
    }

    fn item_map<T>(&self, item: SceneItemHandle, operation: &'static str, f: impl FnOnce(&mut ItemBody) -> T) -> Option<T> {
        self.state().item(item.raw(), operation).map(f)
    }

    fn source_map<T>(&self, source: SourceHandle, operation: &'static str, f: impl FnOnce(&mut SourceBody) -> T) -> Option<T> {
        self.state().source(source.raw(), operation).map(f)
    }

    fn set_data(&self, data: DataHandle, name: &CStr, value: Value) {
        let mut st = self.state();
        if let Some(map) = st.data_map(data.raw(), "data_set") {
            map.insert(name.to_string_lossy().into_owned(), value);
        }
    }
}

fn codec_for(type_id: &str) -> &'static str {
    let lower = type_id.to_ascii_lowercase();
    if lower.contains("aac") {
        "aac"
    } else if lower.contains("opus") {
        "opus"
    } else if lower.contains("hevc") || lower.contains("265") {
        "hevc"
    } else if lower.contains("av1") {
        "av1"
    } else {
        "h264"
    }
}

impl NativeApi for MockEngine {
    fn data_create(&self) -> DataHandle {
        let mut st = self.state();
        let handle = st.alloc_data(Map::new());
        st.log(MockCall::Create {
            kind: ObjectKind::Data,
            handle,
            type_id: String::new(),
        });
        DataHandle::from_raw(handle)
    }

    fn data_create_from_json(&self, json: &CStr) -> DataHandle {
        let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(json.to_bytes()) else {
            return DataHandle::null();
        };
        let mut st = self.state();
        let handle = st.alloc_data(map);
        st.log(MockCall::Create {
            kind: ObjectKind::Data,
            handle,
            type_id: String::new(),
        });
        DataHandle::from_raw(handle)
    }

    fn data_addref(&self, data: DataHandle) {
        self.get_ref(data.raw(), "data_addref");
    }

    fn data_release(&self, data: DataHandle) {
        self.release(data.raw(), "data_release");
    }

    fn data_json(&self, data: DataHandle) -> Option<String> {
        let mut st = self.state();
        let map = st.data_map(data.raw(), "data_json")?;
        serde_json::to_string(map).ok()
    }

    fn data_set_string(&self, data: DataHandle, name: &CStr, value: &CStr) {
        self.set_data(data, name, Value::from(value.to_string_lossy().into_owned()));
    }

    fn data_set_int(&self, data: DataHandle, name: &CStr, value: i64) {
        self.set_data(data, name, Value::from(value));
    }

    fn data_set_double(&self, data: DataHandle, name: &CStr, value: f64) {
        self.set_data(data, name, Value::from(value));
    }

    fn data_set_bool(&self, data: DataHandle, name: &CStr, value: bool) {
        self.set_data(data, name, Value::from(value));
    }

    fn data_set_obj(&self, data: DataHandle, name: &CStr, value: DataHandle) {
        let child = {
            let mut st = self.state();
            st.data_map(value.raw(), "data_set_obj").cloned()
        };
        if let Some(child) = child {
            self.set_data(data, name, Value::Object(child));
        }
    }

    fn data_get_string(&self, data: DataHandle, name: &CStr) -> Option<String> {
        match self.state().data_value(data.raw(), name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn data_get_int(&self, data: DataHandle, name: &CStr) -> Option<i64> {
        self.state().data_value(data.raw(), name)?.as_i64()
    }

    fn data_get_double(&self, data: DataHandle, name: &CStr) -> Option<f64> {
        self.state().data_value(data.raw(), name)?.as_f64()
    }

    fn data_get_bool(&self, data: DataHandle, name: &CStr) -> Option<bool> {
        self.state().data_value(data.raw(), name)?.as_bool()
    }

    fn data_get_obj(&self, data: DataHandle, name: &CStr) -> DataHandle {
        let mut st = self.state();
        match st.data_value(data.raw(), name) {
            Some(Value::Object(map)) => DataHandle::from_raw(st.alloc_data(map)),
            _ => DataHandle::null(),
        }
    }

    fn data_has_value(&self, data: DataHandle, name: &CStr) -> bool {
        self.state().data_value(data.raw(), name).is_some()
    }

    fn data_erase(&self, data: DataHandle, name: &CStr) {
        let mut st = self.state();
        if let Some(map) = st.data_map(data.raw(), "data_erase") {
            map.remove(name.to_string_lossy().as_ref());
        }
    }

    fn source_create(&self, type_id: &CStr, name: &CStr, settings: DataHandle) -> SourceHandle {
        SourceHandle::from_raw(self.create_source(type_id, name, settings, false))
    }

    fn source_get_ref(&self, source: SourceHandle) -> SourceHandle {
        SourceHandle::from_raw(self.get_ref(source.raw(), "source_get_ref"))
    }

    fn source_release(&self, source: SourceHandle) {
        self.release(source.raw(), "source_release");
    }

    fn source_update(&self, source: SourceHandle, settings: DataHandle) {
        let mut st = self.state();
        let incoming = st.copy_settings(settings.raw());
        let Some(target) = st.source(source.raw(), "source_update").map(|s| s.settings) else {
            return;
        };
        if let Some(map) = st.data_map(target, "source_update") {
            map.extend(incoming);
        }
        let kind = st.kind_of(source.raw()).unwrap_or(ObjectKind::Source);
        st.log(MockCall::Update {
            kind,
            handle: source.raw(),
        });
    }

    fn source_remove(&self, source: SourceHandle) {
        let mut st = self.state();
        let Some(body) = st.source(source.raw(), "source_remove") else {
            return;
        };
        body.removed = true;
        st.log(MockCall::SourceRemove {
            handle: source.raw(),
        });

        // Pull every item showing this source out of its scene
        let placements: Vec<(usize, usize)> = st
            .objects
            .iter()
            .filter_map(|(&h, o)| match &o.body {
                Body::SceneItem(item) if o.alive && item.in_scene && item.source == source.raw() => {
                    Some((h, item.scene))
                }
                _ => None,
            })
            .collect();
        for (item, scene) in placements {
            if let Some(body) = st.item(item, "source_remove") {
                body.in_scene = false;
            }
            if let Some(items) = st.source(scene, "source_remove").and_then(|s| s.items.as_mut()) {
                items.retain(|&i| i != item);
            }
            st.unref(item);
        }
    }

    fn source_removed(&self, source: SourceHandle) -> bool {
        self.source_map(source, "source_removed", |s| s.removed)
            .unwrap_or(true)
    }

    fn source_settings(&self, source: SourceHandle) -> DataHandle {
        let mut st = self.state();
        let Some(settings) = st.source(source.raw(), "source_settings").map(|s| s.settings) else {
            return DataHandle::null();
        };
        st.addref(settings, "source_settings");
        DataHandle::from_raw(settings)
    }

    fn source_name(&self, source: SourceHandle) -> Option<String> {
        self.source_map(source, "source_name", |s| s.name.clone())
    }

    fn source_type_id(&self, source: SourceHandle) -> Option<String> {
        self.source_map(source, "source_type_id", |s| s.type_id.clone())
    }

    fn source_filter_add(&self, source: SourceHandle, filter: SourceHandle) {
        let mut st = self.state();
        if !st.addref(filter.raw(), "source_filter_add") {
            return;
        }
        match st.source(source.raw(), "source_filter_add") {
            Some(body) => body.filters.push(filter.raw()),
            None => {
                st.unref(filter.raw());
                return;
            }
        }
        st.log(MockCall::FilterAdd {
            source: source.raw(),
            filter: filter.raw(),
        });
    }

    fn source_filter_remove(&self, source: SourceHandle, filter: SourceHandle) {
        let mut st = self.state();
        let Some(body) = st.source(source.raw(), "source_filter_remove") else {
            return;
        };
        let before = body.filters.len();
        body.filters.retain(|&f| f != filter.raw());
        let removed = body.filters.len() != before;
        st.log(MockCall::FilterRemove {
            source: source.raw(),
            filter: filter.raw(),
        });
        if removed {
            st.unref(filter.raw());
        }
    }

    fn source_set_enabled(&self, source: SourceHandle, enabled: bool) {
        self.source_map(source, "source_set_enabled", |s| s.enabled = enabled);
    }

    fn source_enabled(&self, source: SourceHandle) -> bool {
        self.source_map(source, "source_enabled", |s| s.enabled)
            .unwrap_or(false)
    }

    fn source_set_muted(&self, source: SourceHandle, muted: bool) {
        self.source_map(source, "source_set_muted", |s| s.muted = muted);
    }

    fn source_muted(&self, source: SourceHandle) -> bool {
        self.source_map(source, "source_muted", |s| s.muted)
            .unwrap_or(false)
    }

    fn source_set_volume(&self, source: SourceHandle, volume: f32) {
        self.source_map(source, "source_set_volume", |s| s.volume = volume);
    }

    fn source_volume(&self, source: SourceHandle) -> f32 {
        self.source_map(source, "source_volume", |s| s.volume)
            .unwrap_or(0.0)
    }

    fn source_width(&self, source: SourceHandle) -> u32 {
        let mut st = self.state();
        let Some(settings) = st.source(source.raw(), "source_width").map(|s| s.settings) else {
            return 0;
        };
        st.data_value(settings, c"width")
            .and_then(|v| v.as_u64())
            .map_or(0, |w| w as u32)
    }

    fn source_height(&self, source: SourceHandle) -> u32 {
        let mut st = self.state();
        let Some(settings) = st.source(source.raw(), "source_height").map(|s| s.settings) else {
            return 0;
        };
        st.data_value(settings, c"height")
            .and_then(|v| v.as_u64())
            .map_or(0, |h| h as u32)
    }

    fn source_signal_handler(&self, source: SourceHandle) -> SignalHandlerHandle {
        SignalHandlerHandle::from_raw(
            self.source_map(source, "source_signal_handler", |s| s.signals)
                .unwrap_or(0),
        )
    }

    fn scene_create(&self, name: &CStr) -> SceneHandle {
        SceneHandle::from_raw(self.create_source(c"scene", name, DataHandle::null(), true))
    }

    fn scene_source(&self, scene: SceneHandle) -> SourceHandle {
        let mut st = self.state();
        match st.source(scene.raw(), "scene_source") {
            Some(body) if body.items.is_some() => SourceHandle::from_raw(scene.raw()),
            _ => SourceHandle::null(),
        }
    }

    fn scene_add(&self, scene: SceneHandle, source: SourceHandle) -> SceneItemHandle {
        let mut st = self.state();
        if scene.raw() == source.raw() {
            return SceneItemHandle::null();
        }
        let is_scene = st
            .source(scene.raw(), "scene_add")
            .is_some_and(|s| s.items.is_some());
        if !is_scene || !st.addref(source.raw(), "scene_add") {
            return SceneItemHandle::null();
        }
        let item = st.alloc(
            ObjectKind::SceneItem,
            Body::SceneItem(ItemBody {
                scene: scene.raw(),
                source: source.raw(),
                in_scene: true,
                pos: Vec2::ZERO,
                rot: 0.0,
                scale: Vec2::ONE,
                bounds: Vec2::ZERO,
                bounds_type: BoundsType::None,
                crop: Crop::default(),
                visible: true,
                locked: false,
            }),
        );
        // One reference for the scene, one for the caller
        st.addref(item, "scene_add");
        if let Some(items) = st.source(scene.raw(), "scene_add").and_then(|s| s.items.as_mut()) {
            items.push(item);
        }
        st.log(MockCall::Create {
            kind: ObjectKind::SceneItem,
            handle: item,
            type_id: String::new(),
        });
        SceneItemHandle::from_raw(item)
    }

    fn scene_find_source(&self, scene: SceneHandle, name: &CStr) -> SceneItemHandle {
        let mut st = self.state();
        let items = st
            .source(scene.raw(), "scene_find_source")
            .and_then(|s| s.items.clone())
            .unwrap_or_default();
        let wanted = name.to_string_lossy();
        for item in items {
            let Some(source) = st.item(item, "scene_find_source").map(|i| i.source) else {
                continue;
            };
            let matches = st
                .source(source, "scene_find_source")
                .is_some_and(|s| s.name == wanted);
            if matches {
                st.addref(item, "scene_find_source");
                return SceneItemHandle::from_raw(item);
            }
        }
        SceneItemHandle::null()
    }

    fn sceneitem_addref(&self, item: SceneItemHandle) {
        self.get_ref(item.raw(), "sceneitem_addref");
    }

    fn sceneitem_release(&self, item: SceneItemHandle) {
        self.release(item.raw(), "sceneitem_release");
    }

    fn sceneitem_remove(&self, item: SceneItemHandle) {
        let mut st = self.state();
        let Some(body) = st.item(item.raw(), "sceneitem_remove") else {
            return;
        };
        let scene = body.scene;
        let was_in_scene = std::mem::replace(&mut body.in_scene, false);
        st.log(MockCall::SceneItemRemove { handle: item.raw() });
        if was_in_scene {
            if let Some(items) = st
                .source(scene, "sceneitem_remove")
                .and_then(|s| s.items.as_mut())
            {
                items.retain(|&i| i != item.raw());
            }
            st.unref(item.raw());
        }
        // The caller's reference
        st.unref(item.raw());
    }

    fn sceneitem_source(&self, item: SceneItemHandle) -> SourceHandle {
        SourceHandle::from_raw(
            self.item_map(item, "sceneitem_source", |i| i.source)
                .unwrap_or(0),
        )
    }

    fn sceneitem_in_scene(&self, item: SceneItemHandle) -> bool {
        self.item_map(item, "sceneitem_in_scene", |i| i.in_scene)
            .unwrap_or(false)
    }

    fn sceneitem_pos(&self, item: SceneItemHandle) -> Vec2 {
        self.item_map(item, "sceneitem_pos", |i| i.pos)
            .unwrap_or_default()
    }

    fn sceneitem_set_pos(&self, item: SceneItemHandle, pos: Vec2) {
        self.item_map(item, "sceneitem_set_pos", |i| i.pos = pos);
    }

    fn sceneitem_rot(&self, item: SceneItemHandle) -> f32 {
        self.item_map(item, "sceneitem_rot", |i| i.rot)
            .unwrap_or_default()
    }

    fn sceneitem_set_rot(&self, item: SceneItemHandle, degrees: f32) {
        self.item_map(item, "sceneitem_set_rot", |i| i.rot = degrees);
    }

    fn sceneitem_scale(&self, item: SceneItemHandle) -> Vec2 {
        self.item_map(item, "sceneitem_scale", |i| i.scale)
            .unwrap_or_default()
    }

    fn sceneitem_set_scale(&self, item: SceneItemHandle, scale: Vec2) {
        self.item_map(item, "sceneitem_set_scale", |i| i.scale = scale);
    }

    fn sceneitem_bounds(&self, item: SceneItemHandle) -> Vec2 {
        self.item_map(item, "sceneitem_bounds", |i| i.bounds)
            .unwrap_or_default()
    }

    fn sceneitem_set_bounds(&self, item: SceneItemHandle, bounds: Vec2) {
        self.item_map(item, "sceneitem_set_bounds", |i| i.bounds = bounds);
    }

    fn sceneitem_bounds_type(&self, item: SceneItemHandle) -> BoundsType {
        self.item_map(item, "sceneitem_bounds_type", |i| i.bounds_type)
            .unwrap_or_default()
    }

    fn sceneitem_set_bounds_type(&self, item: SceneItemHandle, bounds_type: BoundsType) {
        self.item_map(item, "sceneitem_set_bounds_type", |i| {
            i.bounds_type = bounds_type
        });
    }

    fn sceneitem_crop(&self, item: SceneItemHandle) -> Crop {
        self.item_map(item, "sceneitem_crop", |i| i.crop)
            .unwrap_or_default()
    }

    fn sceneitem_set_crop(&self, item: SceneItemHandle, crop: Crop) {
        self.item_map(item, "sceneitem_set_crop", |i| i.crop = crop);
    }

    fn sceneitem_set_order(&self, item: SceneItemHandle, movement: OrderMovement) {
        let mut st = self.state();
        let Some(scene) = st.item(item.raw(), "sceneitem_set_order").map(|i| i.scene) else {
            return;
        };
        let Some(items) = st
            .source(scene, "sceneitem_set_order")
            .and_then(|s| s.items.as_mut())
        else {
            return;
        };
        let Some(index) = items.iter().position(|&i| i == item.raw()) else {
            return;
        };
        let entry = items.remove(index);
        let target = match movement {
            OrderMovement::MoveUp => (index + 1).min(items.len()),
            OrderMovement::MoveDown => index.saturating_sub(1),
            OrderMovement::MoveTop => items.len(),
            OrderMovement::MoveBottom => 0,
        };
        items.insert(target, entry);
    }

    fn sceneitem_order_position(&self, item: SceneItemHandle) -> i32 {
        let mut st = self.state();
        let Some(scene) = st.item(item.raw(), "sceneitem_order_position").map(|i| i.scene) else {
            return -1;
        };
        st.source(scene, "sceneitem_order_position")
            .and_then(|s| s.items.as_ref())
            .and_then(|items| items.iter().position(|&i| i == item.raw()))
            .map_or(-1, |p| p as i32)
    }

    fn sceneitem_set_order_position(&self, item: SceneItemHandle, position: i32) {
        let mut st = self.state();
        let Some(scene) = st
            .item(item.raw(), "sceneitem_set_order_position")
            .map(|i| i.scene)
        else {
            return;
        };
        let Some(items) = st
            .source(scene, "sceneitem_set_order_position")
            .and_then(|s| s.items.as_mut())
        else {
            return;
        };
        let Some(index) = items.iter().position(|&i| i == item.raw()) else {
            return;
        };
        let entry = items.remove(index);
        let target = (position.max(0) as usize).min(items.len());
        items.insert(target, entry);
    }

    fn sceneitem_visible(&self, item: SceneItemHandle) -> bool {
        self.item_map(item, "sceneitem_visible", |i| i.visible)
            .unwrap_or(false)
    }

    fn sceneitem_set_visible(&self, item: SceneItemHandle, visible: bool) {
        self.item_map(item, "sceneitem_set_visible", |i| i.visible = visible);
    }

    fn sceneitem_locked(&self, item: SceneItemHandle) -> bool {
        self.item_map(item, "sceneitem_locked", |i| i.locked)
            .unwrap_or(false)
    }

    fn sceneitem_set_locked(&self, item: SceneItemHandle, locked: bool) {
        self.item_map(item, "sceneitem_set_locked", |i| i.locked = locked);
    }

    fn set_output_source(&self, channel: u32, source: SourceHandle) {
        let mut st = self.state();
        st.log(MockCall::SetOutputSource {
            channel,
            source: source.raw(),
        });
        if !source.is_null() && !st.addref(source.raw(), "set_output_source") {
            return;
        }
        let previous = if source.is_null() {
            st.channels.remove(&channel)
        } else {
            st.channels.insert(channel, source.raw())
        };
        if let Some(previous) = previous {
            st.unref(previous);
        }
    }

    fn get_output_source(&self, channel: u32) -> SourceHandle {
        let mut st = self.state();
        let Some(&source) = st.channels.get(&channel) else {
            return SourceHandle::null();
        };
        if !st.addref(source, "get_output_source") {
            return SourceHandle::null();
        }
        SourceHandle::from_raw(source)
    }

    fn video_encoder_create(&self, type_id: &CStr, name: &CStr, settings: DataHandle) -> EncoderHandle {
        self.audio_encoder_create(type_id, name, settings, 0)
    }

    fn audio_encoder_create(
        &self,
        type_id: &CStr,
        _name: &CStr,
        settings: DataHandle,
        _mixer: usize,
    ) -> EncoderHandle {
        let mut st = self.state();
        if st.rejects(type_id) {
            return EncoderHandle::null();
        }
        let settings = st.copy_settings(settings.raw());
        let type_id = type_id.to_string_lossy().into_owned();
        let handle = st.alloc(
            ObjectKind::Encoder,
            Body::Encoder(EncoderBody {
                type_id: type_id.clone(),
                settings,
                bound: false,
            }),
        );
        st.log(MockCall::Create {
            kind: ObjectKind::Encoder,
            handle,
            type_id,
        });
        EncoderHandle::from_raw(handle)
    }

    fn encoder_get_ref(&self, encoder: EncoderHandle) -> EncoderHandle {
        EncoderHandle::from_raw(self.get_ref(encoder.raw(), "encoder_get_ref"))
    }

    fn encoder_release(&self, encoder: EncoderHandle) {
        self.release(encoder.raw(), "encoder_release");
    }

    fn encoder_update(&self, encoder: EncoderHandle, settings: DataHandle) {
        let mut st = self.state();
        let incoming = st.copy_settings(settings.raw());
        if let Some(body) = st.encoder(encoder.raw(), "encoder_update") {
            body.settings.extend(incoming);
            st.log(MockCall::Update {
                kind: ObjectKind::Encoder,
                handle: encoder.raw(),
            });
        }
    }

    fn encoder_active(&self, encoder: EncoderHandle) -> bool {
        let st = self.state();
        st.objects.values().any(|o| match &o.body {
            Body::Output(out) if o.alive && out.active => {
                out.video_encoder == encoder.raw()
                    || out.audio_encoders.values().any(|&e| e == encoder.raw())
            }
            _ => false,
        })
    }

    fn encoder_codec(&self, encoder: EncoderHandle) -> Option<String> {
        let mut st = self.state();
        let body = st.encoder(encoder.raw(), "encoder_codec")?;
        Some(codec_for(&body.type_id).to_string())
    }

    fn encoder_bind_default_media(&self, encoder: EncoderHandle) {
        if let Some(body) = self.state().encoder(encoder.raw(), "encoder_bind_default_media") {
            body.bound = true;
        }
    }

    fn output_create(&self, type_id: &CStr, _name: &CStr, settings: DataHandle) -> OutputHandle {
        let mut st = self.state();
        if st.rejects(type_id) {
            return OutputHandle::null();
        }
        let settings = st.copy_settings(settings.raw());
        let signals = st.next_id();
        let stop_behavior = st.default_stop_behavior;
        let type_id = type_id.to_string_lossy().into_owned();
        let handle = st.alloc(
            ObjectKind::Output,
            Body::Output(OutputBody {
                settings,
                video_encoder: 0,
                audio_encoders: BTreeMap::new(),
                service: 0,
                active: false,
                stopping: false,
                paused: false,
                can_pause: false,
                reconnecting: false,
                stop_behavior,
                polls_left: 0,
                stop_code: 0,
                start_error: None,
                last_error: None,
                total_frames: 0,
                dropped_frames: 0,
                total_bytes: 0,
                signals,
            }),
        );
        st.log(MockCall::Create {
            kind: ObjectKind::Output,
            handle,
            type_id,
        });
        OutputHandle::from_raw(handle)
    }

    fn output_get_ref(&self, output: OutputHandle) -> OutputHandle {
        OutputHandle::from_raw(self.get_ref(output.raw(), "output_get_ref"))
    }

    fn output_release(&self, output: OutputHandle) {
        self.release(output.raw(), "output_release");
    }

    fn output_update(&self, output: OutputHandle, settings: DataHandle) {
        let mut st = self.state();
        let incoming = st.copy_settings(settings.raw());
        if let Some(body) = st.output(output.raw(), "output_update") {
            body.settings.extend(incoming);
            st.log(MockCall::Update {
                kind: ObjectKind::Output,
                handle: output.raw(),
            });
        }
    }

    fn output_set_video_encoder(&self, output: OutputHandle, encoder: EncoderHandle) {
        let mut st = self.state();
        if !encoder.is_null() && st.live(encoder.raw(), "output_set_video_encoder").is_none() {
            return;
        }
        if let Some(body) = st.output(output.raw(), "output_set_video_encoder") {
            body.video_encoder = encoder.raw();
            st.log(MockCall::SetVideoEncoder {
                output: output.raw(),
                encoder: encoder.raw(),
            });
        }
    }

    fn output_set_audio_encoder(&self, output: OutputHandle, encoder: EncoderHandle, track: usize) {
        let mut st = self.state();
        if !encoder.is_null() && st.live(encoder.raw(), "output_set_audio_encoder").is_none() {
            return;
        }
        if let Some(body) = st.output(output.raw(), "output_set_audio_encoder") {
            if encoder.is_null() {
                body.audio_encoders.remove(&track);
            } else {
                body.audio_encoders.insert(track, encoder.raw());
            }
            st.log(MockCall::SetAudioEncoder {
                output: output.raw(),
                encoder: encoder.raw(),
                track,
            });
        }
    }

    fn output_set_service(&self, output: OutputHandle, service: ServiceHandle) {
        let mut st = self.state();
        if let Some(body) = st.output(output.raw(), "output_set_service") {
            body.service = service.raw();
            st.log(MockCall::SetService {
                output: output.raw(),
                service: service.raw(),
            });
        }
    }

    fn output_start(&self, output: OutputHandle) -> bool {
        let emission = {
            let mut st = self.state();
            st.log(MockCall::OutputStart {
                handle: output.raw(),
            });
            let Some(body) = st.output(output.raw(), "output_start") else {
                return false;
            };
            if let Some(error) = body.start_error.clone() {
                body.last_error = Some(error);
                return false;
            }
            if body.video_encoder == 0 {
                body.last_error = Some("no video encoder".to_string());
                return false;
            }
            body.active = true;
            body.stopping = false;
            body.last_error = None;
            Emission {
                handler: body.signals,
                signal: "start",
                calldata: MockCalldata::new().with_ptr("output", output.raw()),
            }
        };
        self.deliver(emission);
        true
    }

    fn output_stop(&self, output: OutputHandle) {
        let emission = {
            let mut st = self.state();
            st.log(MockCall::OutputStop {
                handle: output.raw(),
            });
            let Some(body) = st.output(output.raw(), "output_stop") else {
                return;
            };
            if !body.active {
                return;
            }
            let behavior = body.stop_behavior;
            body.stopping = true;
            if let StopBehavior::AfterPolls(polls) = behavior {
                body.polls_left = polls;
            }
            if behavior == StopBehavior::Immediate {
                st.finish_stop(output.raw())
            } else {
                None
            }
        };
        if let Some(emission) = emission {
            self.deliver(emission);
        }
    }

    fn output_force_stop(&self, output: OutputHandle) {
        let emission = {
            let mut st = self.state();
            st.log(MockCall::OutputForceStop {
                handle: output.raw(),
            });
            let active = st
                .output(output.raw(), "output_force_stop")
                .is_some_and(|body| body.active);
            if active {
                st.finish_stop(output.raw())
            } else {
                None
            }
        };
        if let Some(emission) = emission {
            self.deliver(emission);
        }
    }

    fn output_active(&self, output: OutputHandle) -> bool {
        let (active, emission) = {
            let mut st = self.state();
            let Some(body) = st.output(output.raw(), "output_active") else {
                return false;
            };
            let active = body.active;
            let completes = match body.stop_behavior {
                StopBehavior::AfterPolls(_) if body.stopping => {
                    body.polls_left = body.polls_left.saturating_sub(1);
                    body.polls_left == 0
                }
                _ => false,
            };
            if completes {
                (false, st.finish_stop(output.raw()))
            } else {
                (active, None)
            }
        };
        if let Some(emission) = emission {
            self.deliver(emission);
        }
        active
    }

    fn output_reconnecting(&self, output: OutputHandle) -> bool {
        self.output_map(output, "output_reconnecting", |o| o.reconnecting)
            .unwrap_or(false)
    }

    fn output_last_error(&self, output: OutputHandle) -> Option<String> {
        self.output_map(output, "output_last_error", |o| o.last_error.clone())
            .flatten()
    }

    fn output_can_pause(&self, output: OutputHandle) -> bool {
        self.output_map(output, "output_can_pause", |o| o.can_pause)
            .unwrap_or(false)
    }

    fn output_pause(&self, output: OutputHandle, pause: bool) -> bool {
        let mut st = self.state();
        st.log(MockCall::OutputPause {
            handle: output.raw(),
            pause,
        });
        let Some(body) = st.output(output.raw(), "output_pause") else {
            return false;
        };
        if !body.can_pause || !body.active {
            return false;
        }
        body.paused = pause;
        true
    }

    fn output_paused(&self, output: OutputHandle) -> bool {
        self.output_map(output, "output_paused", |o| o.paused)
            .unwrap_or(false)
    }

    fn output_total_frames(&self, output: OutputHandle) -> u64 {
        self.output_map(output, "output_total_frames", |o| o.total_frames)
            .unwrap_or(0)
    }

    fn output_frames_dropped(&self, output: OutputHandle) -> u64 {
        self.output_map(output, "output_frames_dropped", |o| o.dropped_frames)
            .unwrap_or(0)
    }

    fn output_total_bytes(&self, output: OutputHandle) -> u64 {
        self.output_map(output, "output_total_bytes", |o| o.total_bytes)
            .unwrap_or(0)
    }

    fn output_signal_handler(&self, output: OutputHandle) -> SignalHandlerHandle {
        SignalHandlerHandle::from_raw(
            self.output_map(output, "output_signal_handler", |o| o.signals)
                .unwrap_or(0),
        )
    }

    fn service_create(&self, type_id: &CStr, _name: &CStr, settings: DataHandle) -> ServiceHandle {
        let mut st = self.state();
        if st.rejects(type_id) {
            return ServiceHandle::null();
        }
        let settings = st.copy_settings(settings.raw());
        let handle = st.alloc(
            ObjectKind::Service,
            Body::Service(ServiceBody {
                settings,
                connectable: true,
            }),
        );
        st.log(MockCall::Create {
            kind: ObjectKind::Service,
            handle,
            type_id: type_id.to_string_lossy().into_owned(),
        });
        ServiceHandle::from_raw(handle)
    }

    fn service_release(&self, service: ServiceHandle) {
        self.release(service.raw(), "service_release");
    }

    fn service_update(&self, service: ServiceHandle, settings: DataHandle) {
        let mut st = self.state();
        let incoming = st.copy_settings(settings.raw());
        if let Some(body) = st.service(service.raw(), "service_update") {
            body.settings.extend(incoming);
            st.log(MockCall::Update {
                kind: ObjectKind::Service,
                handle: service.raw(),
            });
        }
    }

    fn service_can_try_to_connect(&self, service: ServiceHandle) -> bool {
        self.state()
            .service(service.raw(), "service_can_try_to_connect")
            .is_some_and(|s| s.connectable)
    }

    fn global_signal_handler(&self) -> SignalHandlerHandle {
        SignalHandlerHandle::from_raw(self.state().global_signals)
    }

    fn signal_connect(
        &self,
        handler: SignalHandlerHandle,
        signal: &CStr,
        callback: SignalCallback,
        data: *mut c_void,
    ) {
        let mut st = self.state();
        if !st.handler_live(handler.raw()) {
            st.log(MockCall::UseAfterFree {
                handle: handler.raw(),
                operation: "signal_connect",
            });
            return;
        }
        let signal = signal.to_string_lossy().into_owned();
        st.slots
            .entry((handler.raw(), signal.clone()))
            .or_default()
            .push(Slot {
                callback,
                data: data as usize,
            });
        st.log(MockCall::SignalConnect {
            handler: handler.raw(),
            signal,
        });
    }

    fn signal_disconnect(
        &self,
        handler: SignalHandlerHandle,
        signal: &CStr,
        callback: SignalCallback,
        data: *mut c_void,
    ) {
        let mut st = self.state();
        if !st.handler_live(handler.raw()) {
            st.log(MockCall::UseAfterFree {
                handle: handler.raw(),
                operation: "signal_disconnect",
            });
        }
        let signal = signal.to_string_lossy().into_owned();
        if let Some(slots) = st.slots.get_mut(&(handler.raw(), signal.clone())) {
            slots.retain(|s| !(std::ptr::fn_addr_eq(s.callback, callback) && s.data == data as usize));
        }
        st.log(MockCall::SignalDisconnect {
            handler: handler.raw(),
            signal,
        });
    }

    unsafe fn calldata_int(&self, calldata: CalldataPtr, name: &CStr) -> Option<i64> {
        // SAFETY: the mock only emits `MockCalldata` blobs, alive for the callback.
        let blob = unsafe { &*calldata.as_ptr::<MockCalldata>() };
        match blob.get(name)? {
            CalldataValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    unsafe fn calldata_float(&self, calldata: CalldataPtr, name: &CStr) -> Option<f64> {
        // SAFETY: see `calldata_int`.
        let blob = unsafe { &*calldata.as_ptr::<MockCalldata>() };
        match blob.get(name)? {
            CalldataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    unsafe fn calldata_bool(&self, calldata: CalldataPtr, name: &CStr) -> Option<bool> {
        // SAFETY: see `calldata_int`.
        let blob = unsafe { &*calldata.as_ptr::<MockCalldata>() };
        match blob.get(name)? {
            CalldataValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    unsafe fn calldata_ptr(&self, calldata: CalldataPtr, name: &CStr) -> Option<*mut c_void> {
        // SAFETY: see `calldata_int`.
        let blob = unsafe { &*calldata.as_ptr::<MockCalldata>() };
        match blob.get(name)? {
            CalldataValue::Ptr(v) => Some(*v as *mut c_void),
            _ => None,
        }
    }

    unsafe fn calldata_string(&self, calldata: CalldataPtr, name: &CStr) -> Option<String> {
        // SAFETY: see `calldata_int`.
        let blob = unsafe { &*calldata.as_ptr::<MockCalldata>() };
        match blob.get(name)? {
            CalldataValue::String(v) => Some(v.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

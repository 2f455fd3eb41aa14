// In-process mock of the foreign runtime, for tests.
//
// Implements just enough of the platform surface that every binding in
// this crate can run against it: class and member lookup with optional
// members gated by config flags, a key/value format object, a codec
// simulator with instant input consumption and scripted output events,
// and exception raising with class/message reflection.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::Mutex;

use crate::error::BridgeError;
use crate::runtime::{CallEnv, Handle, Value, VmRuntime};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Clone)]
pub struct MockCodecInfo {
    pub name: String,
    pub types: Vec<String>,
    pub encoder: bool,
}

#[derive(Clone)]
pub struct MockConfig {
    pub has_direct_buffer_api: bool,
    pub has_find_decoder_for_format: bool,
    pub decoder_name: String,
    pub codec_infos: Vec<MockCodecInfo>,
    pub input_buffer_capacity: usize,
    pub input_slots: usize,
    pub output_format: HashMap<String, i32>,
    pub fail_create: bool,
    pub missing_members: Vec<&'static str>,
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig {
            has_direct_buffer_api: true,
            has_find_decoder_for_format: true,
            decoder_name: "OMX.fake.video.decoder.avc".into(),
            codec_infos: Vec::new(),
            input_buffer_capacity: 4096,
            input_slots: 4,
            output_format: HashMap::new(),
            fail_create: false,
            missing_members: Vec::new(),
        }
    }
}

// ============================================================================
// Object model
// ============================================================================

#[derive(Clone)]
enum FormatValue {
    I(i32),
    J(i64),
    F(f32),
    S(String),
    B(Handle),
}

enum MockObject {
    Class(String),
    Str(String),
    Format(HashMap<String, FormatValue>),
    Codec,
    CodecList,
    CodecInfo(usize),
    BufferInfo {
        flags: i32,
        offset: i32,
        size: i32,
        pts: i64,
    },
    ByteBuffer(Box<[u8]>),
    Array(Vec<Handle>),
    Throwable {
        class: String,
        message: Option<String>,
    },
    Loader {
        classes: Vec<String>,
    },
}

struct MemberDesc {
    class: String,
    name: String,
}

enum OutputEvent {
    Output { index: i32, size: i32, pts: i64 },
    FormatChanged(HashMap<String, i32>),
    BuffersChanged,
    RawStatus(i32),
}

#[derive(Default)]
struct CodecSim {
    inputs: Vec<Handle>,
    free_inputs: VecDeque<i32>,
    input_statuses: VecDeque<i32>,
    outputs: HashMap<i32, Handle>,
    events: VecDeque<OutputEvent>,
    queue_ops: u64,
    flushed: u64,
    stopped: u64,
    released: u64,
    released_outputs: Vec<(i32, bool)>,
}

#[derive(Default)]
struct VmState {
    next: Handle,
    objects: HashMap<Handle, MockObject>,
    members: HashMap<Handle, MemberDesc>,
    globals: HashMap<Handle, u32>,
    pending: Option<Handle>,
    attached: HashSet<ThreadId>,
    attaches: u64,
    detaches: u64,
    codec: Option<CodecSim>,
    output_format: HashMap<String, i32>,
    deleted_locals: Vec<Handle>,
}

impl VmState {
    fn alloc(&mut self, object: MockObject) -> Handle {
        self.next += 1;
        self.objects.insert(self.next, object);
        self.next
    }

    fn alloc_member(&mut self, class: String, name: String) -> Handle {
        self.next += 1;
        self.members.insert(self.next, MemberDesc { class, name });
        self.next
    }

    fn raise(&mut self, class: &str, message: Option<&str>) {
        let throwable = self.alloc(MockObject::Throwable {
            class: class.to_string(),
            message: message.map(str::to_string),
        });
        self.pending = Some(throwable);
    }

    fn string(&self, handle: Handle) -> Option<String> {
        match self.objects.get(&handle) {
            Some(MockObject::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn class_name(&self, handle: Handle) -> Option<String> {
        match self.objects.get(&handle) {
            Some(MockObject::Class(name)) => Some(name.clone()),
            _ => None,
        }
    }

    fn format_from_map(&mut self, map: &HashMap<String, i32>) -> Handle {
        let values = map
            .iter()
            .map(|(k, v)| (k.clone(), FormatValue::I(*v)))
            .collect();
        self.alloc(MockObject::Format(values))
    }
}

// ============================================================================
// Mock VM
// ============================================================================

pub struct MockVm {
    state: Arc<Mutex<VmState>>,
    config: Arc<MockConfig>,
}

impl MockVm {
    pub fn new(config: MockConfig) -> Arc<Self> {
        let mut state = VmState::default();
        state.output_format = config.output_format.clone();
        Arc::new(MockVm {
            state: Arc::new(Mutex::new(state)),
            config: Arc::new(config),
        })
    }

    fn env(&self) -> Arc<dyn CallEnv> {
        Arc::new(MockEnv {
            state: self.state.clone(),
            config: self.config.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    pub fn raise(&self, class: &str, message: Option<&str>) {
        self.state.lock().raise(class, message);
    }

    pub fn balanced_attach(&self) -> bool {
        let state = self.state.lock();
        state.attaches == state.detaches
    }

    pub fn thread_attached(&self) -> bool {
        self.state
            .lock()
            .attached
            .contains(&std::thread::current().id())
    }

    pub fn live_global_refs(&self) -> u64 {
        self.state.lock().globals.values().map(|c| *c as u64).sum()
    }

    pub fn new_loader(&self, classes: &[&str]) -> Handle {
        self.state.lock().alloc(MockObject::Loader {
            classes: classes.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Overwrites the contents of every live byte buffer.
    pub fn corrupt_byte_buffers(&self) {
        let mut state = self.state.lock();
        for object in state.objects.values_mut() {
            if let MockObject::ByteBuffer(data) = object {
                data.fill(0xaa);
            }
        }
    }

    pub fn push_output(&self, index: i32, data: &[u8], pts: i64) {
        let mut state = self.state.lock();
        let buffer = state.alloc(MockObject::ByteBuffer(data.to_vec().into_boxed_slice()));
        let codec = state.codec.as_mut().expect("no codec created");
        codec.outputs.insert(index, buffer);
        codec.events.push_back(OutputEvent::Output {
            index,
            size: data.len() as i32,
            pts,
        });
    }

    pub fn push_format_change(&self, entries: &[(&str, i32)]) {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        self.push_format_change_map(map);
    }

    pub fn push_format_change_map(&self, map: HashMap<String, i32>) {
        let mut state = self.state.lock();
        let codec = state.codec.as_mut().expect("no codec created");
        codec.events.push_back(OutputEvent::FormatChanged(map));
    }

    pub fn push_buffers_changed(&self) {
        let mut state = self.state.lock();
        let codec = state.codec.as_mut().expect("no codec created");
        codec.events.push_back(OutputEvent::BuffersChanged);
    }

    /// Hands out a fresh local format object, as a foreign call would.
    pub fn new_format_object(&self, entries: &[(&str, i32)]) -> Handle {
        let map: HashMap<String, i32> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        self.state.lock().format_from_map(&map)
    }

    pub fn deleted_locals(&self) -> Vec<Handle> {
        self.state.lock().deleted_locals.clone()
    }

    /// Announces an output slot without registering a backing buffer, so
    /// the per-index getter hands back null for it.
    pub fn push_orphan_output(&self, index: i32, pts: i64) {
        let mut state = self.state.lock();
        let codec = state.codec.as_mut().expect("no codec created");
        codec.events.push_back(OutputEvent::Output { index, size: 0, pts });
    }

    pub fn push_output_status(&self, status: i32) {
        let mut state = self.state.lock();
        let codec = state.codec.as_mut().expect("no codec created");
        codec.events.push_back(OutputEvent::RawStatus(status));
    }

    pub fn push_input_status(&self, status: i32) {
        let mut state = self.state.lock();
        let codec = state.codec.as_mut().expect("no codec created");
        codec.input_statuses.push_back(status);
    }

    pub fn codec_queue_ops(&self) -> u64 {
        self.state.lock().codec.as_ref().map_or(0, |c| c.queue_ops)
    }

    pub fn codec_flushed(&self) -> u64 {
        self.state.lock().codec.as_ref().map_or(0, |c| c.flushed)
    }

    pub fn codec_stopped(&self) -> u64 {
        self.state.lock().codec.as_ref().map_or(0, |c| c.stopped)
    }

    pub fn codec_released(&self) -> u64 {
        self.state.lock().codec.as_ref().map_or(0, |c| c.released)
    }

    pub fn released_outputs(&self) -> Vec<(i32, bool)> {
        self.state
            .lock()
            .codec
            .as_ref()
            .map_or_else(Vec::new, |c| c.released_outputs.clone())
    }
}

impl VmRuntime for MockVm {
    fn current_env(&self) -> Option<Arc<dyn CallEnv>> {
        let attached = self
            .state
            .lock()
            .attached
            .contains(&std::thread::current().id());
        if attached {
            Some(self.env())
        } else {
            None
        }
    }

    fn attach_current_thread(&self) -> Result<Arc<dyn CallEnv>, BridgeError> {
        let mut state = self.state.lock();
        state.attached.insert(std::thread::current().id());
        state.attaches += 1;
        drop(state);
        Ok(self.env())
    }

    fn detach_current_thread(&self) {
        let mut state = self.state.lock();
        state.attached.remove(&std::thread::current().id());
        state.detaches += 1;
    }
}

// ============================================================================
// Call environment
// ============================================================================

struct MockEnv {
    state: Arc<Mutex<VmState>>,
    config: Arc<MockConfig>,
}

const KNOWN_CLASSES: &[&str] = &[
    "android/media/MediaFormat",
    "android/media/MediaCodec",
    "android/media/MediaCodec$BufferInfo",
    "android/media/MediaCodecList",
    "android/media/MediaCodecInfo",
];

impl MockEnv {
    fn state(&self) -> parking_lot::MutexGuard<'_, VmState> {
        self.state.lock()
    }

    fn member_available(&self, class: &str, name: &str) -> bool {
        if name == "noSuchMember" || self.config.missing_members.iter().any(|m| *m == name) {
            return false;
        }
        match (class, name) {
            ("android/media/MediaCodec", "getInputBuffer")
            | ("android/media/MediaCodec", "getOutputBuffer") => {
                self.config.has_direct_buffer_api
            }
            ("android/media/MediaCodecList", "<init>")
            | ("android/media/MediaCodecList", "findDecoderForFormat") => {
                self.config.has_find_decoder_for_format
            }
            _ => true,
        }
    }

    fn lookup_member(&self, class: Handle, name: &str) -> Handle {
        let mut state = self.state();
        let class_name = match state.class_name(class) {
            Some(name) => name,
            None => {
                state.raise("java.lang.NoClassDefFoundError", None);
                return 0;
            }
        };
        drop(state);
        if !self.member_available(&class_name, name) {
            self.state()
                .raise("java.lang.NoSuchMethodError", Some(name));
            return 0;
        }
        self.state().alloc_member(class_name, name.to_string())
    }

    fn format_call(
        &self,
        state: &mut VmState,
        object: Handle,
        member: &str,
        args: &[Value],
    ) -> Value {
        let key = args
            .first()
            .and_then(|v| v.as_object())
            .and_then(|h| state.string(h))
            .unwrap_or_default();

        // Reads fail the platform way on an absent key.
        macro_rules! fetch {
            ($variant:ident, $wrap:expr) => {{
                let value = match state.objects.get(&object) {
                    Some(MockObject::Format(map)) => map.get(&key).cloned(),
                    _ => None,
                };
                match value {
                    Some(FormatValue::$variant(v)) => return $wrap(v),
                    _ => {
                        state.raise(
                            "java.lang.NullPointerException",
                            Some(&format!("no entry for key {}", key)),
                        );
                        return Value::Int(0);
                    }
                }
            }};
        }

        match member {
            "getInteger" => fetch!(I, Value::Int),
            "getLong" => fetch!(J, Value::Long),
            "getFloat" => fetch!(F, Value::Float),
            "getString" => {
                let value = match state.objects.get(&object) {
                    Some(MockObject::Format(map)) => map.get(&key).cloned(),
                    _ => None,
                };
                match value {
                    Some(FormatValue::S(s)) => {
                        let handle = state.alloc(MockObject::Str(s));
                        Value::Object(handle)
                    }
                    _ => {
                        state.raise(
                            "java.lang.NullPointerException",
                            Some(&format!("no entry for key {}", key)),
                        );
                        Value::Int(0)
                    }
                }
            }
            "getByteBuffer" => {
                let value = match state.objects.get(&object) {
                    Some(MockObject::Format(map)) => map.get(&key).cloned(),
                    _ => None,
                };
                match value {
                    Some(FormatValue::B(handle)) => Value::Object(handle),
                    _ => {
                        state.raise(
                            "java.lang.NullPointerException",
                            Some(&format!("no entry for key {}", key)),
                        );
                        Value::Int(0)
                    }
                }
            }
            "setInteger" | "setLong" | "setFloat" | "setString" | "setByteBuffer" => {
                let stored = match (member, args.get(1)) {
                    ("setInteger", Some(Value::Int(v))) => Some(FormatValue::I(*v)),
                    ("setLong", Some(Value::Long(v))) => Some(FormatValue::J(*v)),
                    ("setFloat", Some(Value::Float(v))) => Some(FormatValue::F(*v)),
                    ("setString", Some(Value::Object(h))) => state.string(*h).map(FormatValue::S),
                    ("setByteBuffer", Some(Value::Object(h))) => {
                        match state.objects.get(h) {
                            Some(MockObject::ByteBuffer(data)) => {
                                let copy = data.clone();
                                let handle = state.alloc(MockObject::ByteBuffer(copy));
                                Some(FormatValue::B(handle))
                            }
                            _ => None,
                        }
                    }
                    _ => None,
                };
                if let (Some(value), Some(MockObject::Format(map))) =
                    (stored, state.objects.get_mut(&object))
                {
                    map.insert(key, value);
                }
                Value::Void
            }
            "toString" => {
                let text = match state.objects.get(&object) {
                    Some(MockObject::Format(map)) => {
                        let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
                        keys.sort_unstable();
                        format!("{{{}}}", keys.join(", "))
                    }
                    _ => String::new(),
                };
                let handle = state.alloc(MockObject::Str(text));
                Value::Object(handle)
            }
            _ => Value::Void,
        }
    }

    fn codec_call(&self, state: &mut VmState, member: &str, args: &[Value]) -> Value {
        match member {
            "configure" | "start" => Value::Void,
            "flush" => {
                if let Some(codec) = state.codec.as_mut() {
                    codec.flushed += 1;
                }
                Value::Void
            }
            "stop" => {
                if let Some(codec) = state.codec.as_mut() {
                    codec.stopped += 1;
                }
                Value::Void
            }
            "release" => {
                if let Some(codec) = state.codec.as_mut() {
                    codec.released += 1;
                }
                Value::Void
            }
            "dequeueInputBuffer" => {
                let slot = state.codec.as_mut().and_then(|codec| {
                    codec
                        .input_statuses
                        .pop_front()
                        .or_else(|| codec.free_inputs.pop_front())
                });
                Value::Int(slot.unwrap_or(-1))
            }
            "queueInputBuffer" => {
                let index = args.first().and_then(|v| v.as_int()).unwrap_or(-1);
                if let Some(codec) = state.codec.as_mut() {
                    codec.queue_ops += 1;
                    // Instant consumption: the slot frees right back up.
                    codec.free_inputs.push_back(index);
                }
                Value::Void
            }
            "getInputBuffer" => {
                let index = args.first().and_then(|v| v.as_int()).unwrap_or(-1);
                let handle = state
                    .codec
                    .as_ref()
                    .and_then(|codec| codec.inputs.get(index as usize).copied())
                    .unwrap_or(0);
                Value::Object(handle)
            }
            "getInputBuffers" => {
                let handles = state
                    .codec
                    .as_ref()
                    .map(|codec| codec.inputs.clone())
                    .unwrap_or_default();
                let array = state.alloc(MockObject::Array(handles));
                Value::Object(array)
            }
            "getOutputBuffer" => {
                let index = args.first().and_then(|v| v.as_int()).unwrap_or(-1);
                let handle = state
                    .codec
                    .as_ref()
                    .and_then(|codec| codec.outputs.get(&index).copied())
                    .unwrap_or(0);
                Value::Object(handle)
            }
            "getOutputBuffers" => {
                let handles = state
                    .codec
                    .as_ref()
                    .map(|codec| {
                        let max = codec.outputs.keys().max().copied().unwrap_or(-1);
                        (0..=max)
                            .map(|i| codec.outputs.get(&i).copied().unwrap_or(0))
                            .collect()
                    })
                    .unwrap_or_default();
                let array = state.alloc(MockObject::Array(handles));
                Value::Object(array)
            }
            "dequeueOutputBuffer" => {
                let info_obj = args.first().and_then(|v| v.as_object()).unwrap_or(0);
                let event = state.codec.as_mut().and_then(|codec| codec.events.pop_front());
                match event {
                    Some(OutputEvent::Output { index, size, pts }) => {
                        if let Some(MockObject::BufferInfo {
                            flags,
                            offset,
                            size: info_size,
                            pts: info_pts,
                        }) = state.objects.get_mut(&info_obj)
                        {
                            *flags = 0;
                            *offset = 0;
                            *info_size = size;
                            *info_pts = pts;
                        }
                        Value::Int(index)
                    }
                    Some(OutputEvent::FormatChanged(map)) => {
                        state.output_format = map;
                        Value::Int(-2)
                    }
                    Some(OutputEvent::BuffersChanged) => Value::Int(-3),
                    Some(OutputEvent::RawStatus(status)) => Value::Int(status),
                    None => Value::Int(-1),
                }
            }
            "releaseOutputBuffer" => {
                let index = args.first().and_then(|v| v.as_int()).unwrap_or(-1);
                let render = match args.get(1) {
                    Some(Value::Bool(render)) => *render,
                    // The timed variant always renders.
                    Some(Value::Long(_)) => true,
                    _ => false,
                };
                if let Some(codec) = state.codec.as_mut() {
                    codec.outputs.remove(&index);
                    codec.released_outputs.push((index, render));
                }
                Value::Void
            }
            "getOutputFormat" => {
                let map = state.output_format.clone();
                let handle = state.format_from_map(&map);
                Value::Object(handle)
            }
            _ => Value::Void,
        }
    }
}

impl CallEnv for MockEnv {
    fn find_class(&self, name: &str) -> Handle {
        let mut state = self.state();
        if KNOWN_CLASSES.contains(&name) {
            state.alloc(MockObject::Class(name.to_string()))
        } else {
            state.raise("java.lang.NoClassDefFoundError", Some(name));
            0
        }
    }

    fn get_method(&self, class: Handle, name: &str, _signature: &str) -> Handle {
        self.lookup_member(class, name)
    }

    fn get_static_method(&self, class: Handle, name: &str, _signature: &str) -> Handle {
        self.lookup_member(class, name)
    }

    fn get_field(&self, class: Handle, name: &str, _signature: &str) -> Handle {
        self.lookup_member(class, name)
    }

    fn get_static_field(&self, class: Handle, name: &str, _signature: &str) -> Handle {
        self.lookup_member(class, name)
    }

    fn new_object(&self, class: Handle, _ctor: Handle, _args: &[Value]) -> Handle {
        let mut state = self.state();
        match state.class_name(class).as_deref() {
            Some("android/media/MediaFormat") => state.alloc(MockObject::Format(HashMap::new())),
            Some("android/media/MediaCodec$BufferInfo") => state.alloc(MockObject::BufferInfo {
                flags: 0,
                offset: 0,
                size: 0,
                pts: 0,
            }),
            Some("android/media/MediaCodecList") => state.alloc(MockObject::CodecList),
            _ => 0,
        }
    }

    fn call_method(&self, object: Handle, method: Handle, args: &[Value]) -> Value {
        let mut state = self.state();
        let member = match state.members.get(&method) {
            Some(desc) => desc.name.clone(),
            None => return Value::Void,
        };
        enum Receiver {
            Format,
            Codec,
            CodecList,
            CodecInfo(usize),
            Class(String),
            Throwable(Option<String>),
            Loader(Vec<String>),
        }
        let receiver = match state.objects.get(&object) {
            Some(MockObject::Format(_)) => Receiver::Format,
            Some(MockObject::Codec) => Receiver::Codec,
            Some(MockObject::CodecList) => Receiver::CodecList,
            Some(MockObject::CodecInfo(index)) => Receiver::CodecInfo(*index),
            Some(MockObject::Class(name)) => Receiver::Class(name.clone()),
            Some(MockObject::Throwable { message, .. }) => Receiver::Throwable(message.clone()),
            Some(MockObject::Loader { classes }) => Receiver::Loader(classes.clone()),
            _ => return Value::Void,
        };
        match receiver {
            Receiver::Format => self.format_call(&mut state, object, &member, args),
            Receiver::Codec => self.codec_call(&mut state, &member, args),
            Receiver::CodecList => {
                if member == "findDecoderForFormat" {
                    let handle = state.alloc(MockObject::Str(self.config.decoder_name.clone()));
                    Value::Object(handle)
                } else {
                    Value::Void
                }
            }
            Receiver::CodecInfo(index) => {
                let info = self.config.codec_infos.get(index).cloned();
                match (member.as_str(), info) {
                    ("getName", Some(info)) => {
                        let handle = state.alloc(MockObject::Str(info.name));
                        Value::Object(handle)
                    }
                    ("isEncoder", Some(info)) => Value::Bool(info.encoder),
                    ("getSupportedTypes", Some(info)) => {
                        let handles = info
                            .types
                            .into_iter()
                            .map(|t| state.alloc(MockObject::Str(t)))
                            .collect();
                        let array = state.alloc(MockObject::Array(handles));
                        Value::Object(array)
                    }
                    _ => Value::Void,
                }
            }
            Receiver::Class(name) => {
                if member == "getName" {
                    let handle = state.alloc(MockObject::Str(name));
                    Value::Object(handle)
                } else {
                    Value::Void
                }
            }
            Receiver::Throwable(message) => {
                if member == "getMessage" {
                    match message {
                        Some(message) => {
                            let handle = state.alloc(MockObject::Str(message));
                            Value::Object(handle)
                        }
                        None => Value::Object(0),
                    }
                } else {
                    Value::Void
                }
            }
            Receiver::Loader(classes) => {
                if member == "loadClass" {
                    let requested = args
                        .first()
                        .and_then(|v| v.as_object())
                        .and_then(|h| state.string(h))
                        .unwrap_or_default();
                    if classes.contains(&requested) {
                        let handle = state.alloc(MockObject::Class(requested));
                        Value::Object(handle)
                    } else {
                        state.raise("java.lang.ClassNotFoundException", Some(&requested));
                        Value::Object(0)
                    }
                } else {
                    Value::Void
                }
            }
        }
    }

    fn call_static_method(&self, class: Handle, method: Handle, args: &[Value]) -> Value {
        let mut state = self.state();
        let member = match state.members.get(&method) {
            Some(desc) => desc.name.clone(),
            None => return Value::Void,
        };
        let class_name = state.class_name(class).unwrap_or_default();
        match (class_name.as_str(), member.as_str()) {
            (
                "android/media/MediaCodec",
                "createByCodecName" | "createDecoderByType" | "createEncoderByType",
            ) => {
                if self.config.fail_create {
                    state.raise(
                        "java.lang.IllegalArgumentException",
                        Some("codec creation disabled"),
                    );
                    return Value::Object(0);
                }
                let capacity = self.config.input_buffer_capacity;
                let slots = self.config.input_slots;
                let inputs: Vec<Handle> = (0..slots)
                    .map(|_| {
                        state.alloc(MockObject::ByteBuffer(
                            vec![0u8; capacity].into_boxed_slice(),
                        ))
                    })
                    .collect();
                state.codec = Some(CodecSim {
                    inputs,
                    free_inputs: (0..slots as i32).collect(),
                    ..CodecSim::default()
                });
                let handle = state.alloc(MockObject::Codec);
                Value::Object(handle)
            }
            ("android/media/MediaCodecList", "getCodecCount") => {
                Value::Int(self.config.codec_infos.len() as i32)
            }
            ("android/media/MediaCodecList", "getCodecInfoAt") => {
                let index = args.first().and_then(|v| v.as_int()).unwrap_or(-1);
                if index >= 0 && (index as usize) < self.config.codec_infos.len() {
                    let handle = state.alloc(MockObject::CodecInfo(index as usize));
                    Value::Object(handle)
                } else {
                    Value::Object(0)
                }
            }
            ("android/media/MediaFormat", "createVideoFormat") => {
                let mime = args
                    .first()
                    .and_then(|v| v.as_object())
                    .and_then(|h| state.string(h))
                    .unwrap_or_default();
                let width = args.get(1).and_then(|v| v.as_int()).unwrap_or(0);
                let height = args.get(2).and_then(|v| v.as_int()).unwrap_or(0);
                let mut map = HashMap::new();
                map.insert("mime".to_string(), FormatValue::S(mime));
                map.insert("width".to_string(), FormatValue::I(width));
                map.insert("height".to_string(), FormatValue::I(height));
                let handle = state.alloc(MockObject::Format(map));
                Value::Object(handle)
            }
            _ => Value::Void,
        }
    }

    fn int_field(&self, object: Handle, field: Handle) -> i32 {
        let state = self.state();
        let name = match state.members.get(&field) {
            Some(desc) => desc.name.as_str(),
            None => return 0,
        };
        match (state.objects.get(&object), name) {
            (Some(MockObject::BufferInfo { flags, .. }), "flags") => *flags,
            (Some(MockObject::BufferInfo { offset, .. }), "offset") => *offset,
            (Some(MockObject::BufferInfo { size, .. }), "size") => *size,
            _ => 0,
        }
    }

    fn long_field(&self, object: Handle, field: Handle) -> i64 {
        let state = self.state();
        let name = match state.members.get(&field) {
            Some(desc) => desc.name.as_str(),
            None => return 0,
        };
        match (state.objects.get(&object), name) {
            (Some(MockObject::BufferInfo { pts, .. }), "presentationTimeUs") => *pts,
            _ => 0,
        }
    }

    fn static_int_field(&self, _class: Handle, field: Handle) -> i32 {
        let state = self.state();
        match state.members.get(&field).map(|d| d.name.as_str()) {
            Some("INFO_TRY_AGAIN_LATER") => -1,
            Some("INFO_OUTPUT_FORMAT_CHANGED") => -2,
            Some("INFO_OUTPUT_BUFFERS_CHANGED") => -3,
            _ => 0,
        }
    }

    fn new_string(&self, value: &str) -> Handle {
        self.state().alloc(MockObject::Str(value.to_string()))
    }

    fn string_value(&self, string: Handle) -> Option<String> {
        self.state().string(string)
    }

    fn array_length(&self, array: Handle) -> i32 {
        match self.state().objects.get(&array) {
            Some(MockObject::Array(items)) => items.len() as i32,
            _ => 0,
        }
    }

    fn array_element(&self, array: Handle, index: i32) -> Handle {
        match self.state().objects.get(&array) {
            Some(MockObject::Array(items)) => {
                items.get(index as usize).copied().unwrap_or(0)
            }
            _ => 0,
        }
    }

    fn direct_buffer(&self, buffer: Handle) -> Option<(*mut u8, usize)> {
        let mut state = self.state();
        match state.objects.get_mut(&buffer) {
            Some(MockObject::ByteBuffer(data)) => Some((data.as_mut_ptr(), data.len())),
            _ => None,
        }
    }

    fn new_direct_buffer(&self, data: &[u8]) -> Handle {
        self.state()
            .alloc(MockObject::ByteBuffer(data.to_vec().into_boxed_slice()))
    }

    fn object_class(&self, object: Handle) -> Handle {
        let mut state = self.state();
        let name = match state.objects.get(&object) {
            Some(MockObject::Throwable { class, .. }) => class.clone(),
            Some(MockObject::Class(_)) => "java.lang.Class".to_string(),
            Some(MockObject::Loader { .. }) => "java.lang.ClassLoader".to_string(),
            Some(MockObject::Format(_)) => "android/media/MediaFormat".to_string(),
            Some(_) => "java.lang.Object".to_string(),
            None => return 0,
        };
        state.alloc(MockObject::Class(name))
    }

    fn new_global_ref(&self, object: Handle) -> Handle {
        let mut state = self.state();
        *state.globals.entry(object).or_insert(0) += 1;
        object
    }

    fn delete_global_ref(&self, object: Handle) {
        let mut state = self.state();
        if let Some(count) = state.globals.get_mut(&object) {
            *count -= 1;
            if *count == 0 {
                state.globals.remove(&object);
            }
        }
    }

    fn delete_local_ref(&self, object: Handle) {
        if object != 0 {
            self.state().deleted_locals.push(object);
        }
    }

    fn exception_pending(&self) -> bool {
        self.state().pending.is_some()
    }

    fn take_exception(&self) -> Option<Handle> {
        self.state().pending.take()
    }
}

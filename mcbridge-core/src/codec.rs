// MediaCodec - buffer-queue codec binding
//
// Wraps the platform codec object behind its buffer-queue protocol:
// dequeue an input slot, fill it, queue it back, then drain output slots
// carrying metadata in a per-call BufferInfo object. Two generations of
// buffer access are supported and feature-detected at creation time: the
// per-index direct-buffer getters, and the legacy whole-array getters
// whose arrays are cached for the codec's lifetime.
//
// Teardown is flush, stop, release, run exactly once when the binding
// drops. Callers share the binding through `Arc<MediaCodec>` so an
// outstanding picture keeps the codec alive past session close.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::BridgeError;
use crate::format::MediaFormat;
use crate::reflect::{MemberKind, MemberSpec, ReflectionCache};
use crate::runtime::{exception_check, Bridge, CallEnv, Handle, Value};
use crate::surface::Surface;

// ============================================================================
// Member table
// ============================================================================

const SLOT_CLASS: usize = 0;
const SLOT_INFO_TRY_AGAIN_LATER: usize = 1;
const SLOT_INFO_OUTPUT_BUFFERS_CHANGED: usize = 2;
const SLOT_INFO_OUTPUT_FORMAT_CHANGED: usize = 3;
const SLOT_CREATE_BY_CODEC_NAME: usize = 4;
const SLOT_CREATE_DECODER_BY_TYPE: usize = 5;
const SLOT_CREATE_ENCODER_BY_TYPE: usize = 6;
const SLOT_CONFIGURE: usize = 7;
const SLOT_START: usize = 8;
const SLOT_FLUSH: usize = 9;
const SLOT_STOP: usize = 10;
const SLOT_RELEASE: usize = 11;
const SLOT_GET_OUTPUT_FORMAT: usize = 12;
const SLOT_DEQUEUE_INPUT_BUFFER: usize = 13;
const SLOT_QUEUE_INPUT_BUFFER: usize = 14;
const SLOT_GET_INPUT_BUFFER: usize = 15;
const SLOT_GET_INPUT_BUFFERS: usize = 16;
const SLOT_DEQUEUE_OUTPUT_BUFFER: usize = 17;
const SLOT_GET_OUTPUT_BUFFER: usize = 18;
const SLOT_GET_OUTPUT_BUFFERS: usize = 19;
const SLOT_RELEASE_OUTPUT_BUFFER: usize = 20;
const SLOT_RELEASE_OUTPUT_BUFFER_AT_TIME: usize = 21;
const SLOT_BUFFER_INFO_CLASS: usize = 22;
const SLOT_BUFFER_INFO_INIT: usize = 23;
const SLOT_BUFFER_INFO_FLAGS: usize = 24;
const SLOT_BUFFER_INFO_OFFSET: usize = 25;
const SLOT_BUFFER_INFO_PTS: usize = 26;
const SLOT_BUFFER_INFO_SIZE: usize = 27;

static MEDIA_CODEC_MEMBERS: &[MemberSpec] = &[
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "android/media/MediaCodec",
        signature: "",
        kind: MemberKind::Class,
        slot: SLOT_CLASS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "INFO_TRY_AGAIN_LATER",
        signature: "I",
        kind: MemberKind::StaticField,
        slot: SLOT_INFO_TRY_AGAIN_LATER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "INFO_OUTPUT_BUFFERS_CHANGED",
        signature: "I",
        kind: MemberKind::StaticField,
        slot: SLOT_INFO_OUTPUT_BUFFERS_CHANGED,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "INFO_OUTPUT_FORMAT_CHANGED",
        signature: "I",
        kind: MemberKind::StaticField,
        slot: SLOT_INFO_OUTPUT_FORMAT_CHANGED,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "createByCodecName",
        signature: "(Ljava/lang/String;)Landroid/media/MediaCodec;",
        kind: MemberKind::StaticMethod,
        slot: SLOT_CREATE_BY_CODEC_NAME,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "createDecoderByType",
        signature: "(Ljava/lang/String;)Landroid/media/MediaCodec;",
        kind: MemberKind::StaticMethod,
        slot: SLOT_CREATE_DECODER_BY_TYPE,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "createEncoderByType",
        signature: "(Ljava/lang/String;)Landroid/media/MediaCodec;",
        kind: MemberKind::StaticMethod,
        slot: SLOT_CREATE_ENCODER_BY_TYPE,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "configure",
        signature:
            "(Landroid/media/MediaFormat;Landroid/view/Surface;Landroid/media/MediaCrypto;I)V",
        kind: MemberKind::Method,
        slot: SLOT_CONFIGURE,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "start",
        signature: "()V",
        kind: MemberKind::Method,
        slot: SLOT_START,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "flush",
        signature: "()V",
        kind: MemberKind::Method,
        slot: SLOT_FLUSH,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "stop",
        signature: "()V",
        kind: MemberKind::Method,
        slot: SLOT_STOP,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "release",
        signature: "()V",
        kind: MemberKind::Method,
        slot: SLOT_RELEASE,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "getOutputFormat",
        signature: "()Landroid/media/MediaFormat;",
        kind: MemberKind::Method,
        slot: SLOT_GET_OUTPUT_FORMAT,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "dequeueInputBuffer",
        signature: "(J)I",
        kind: MemberKind::Method,
        slot: SLOT_DEQUEUE_INPUT_BUFFER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "queueInputBuffer",
        signature: "(IIIJI)V",
        kind: MemberKind::Method,
        slot: SLOT_QUEUE_INPUT_BUFFER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "getInputBuffer",
        signature: "(I)Ljava/nio/ByteBuffer;",
        kind: MemberKind::Method,
        slot: SLOT_GET_INPUT_BUFFER,
        mandatory: false,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "getInputBuffers",
        signature: "()[Ljava/nio/ByteBuffer;",
        kind: MemberKind::Method,
        slot: SLOT_GET_INPUT_BUFFERS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "dequeueOutputBuffer",
        signature: "(Landroid/media/MediaCodec$BufferInfo;J)I",
        kind: MemberKind::Method,
        slot: SLOT_DEQUEUE_OUTPUT_BUFFER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "getOutputBuffer",
        signature: "(I)Ljava/nio/ByteBuffer;",
        kind: MemberKind::Method,
        slot: SLOT_GET_OUTPUT_BUFFER,
        mandatory: false,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "getOutputBuffers",
        signature: "()[Ljava/nio/ByteBuffer;",
        kind: MemberKind::Method,
        slot: SLOT_GET_OUTPUT_BUFFERS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "releaseOutputBuffer",
        signature: "(IZ)V",
        kind: MemberKind::Method,
        slot: SLOT_RELEASE_OUTPUT_BUFFER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec",
        name: "releaseOutputBuffer",
        signature: "(IJ)V",
        kind: MemberKind::Method,
        slot: SLOT_RELEASE_OUTPUT_BUFFER_AT_TIME,
        mandatory: false,
    },
    MemberSpec {
        owner: "android/media/MediaCodec$BufferInfo",
        name: "android/media/MediaCodec$BufferInfo",
        signature: "",
        kind: MemberKind::Class,
        slot: SLOT_BUFFER_INFO_CLASS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec$BufferInfo",
        name: "<init>",
        signature: "()V",
        kind: MemberKind::Method,
        slot: SLOT_BUFFER_INFO_INIT,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec$BufferInfo",
        name: "flags",
        signature: "I",
        kind: MemberKind::Field,
        slot: SLOT_BUFFER_INFO_FLAGS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec$BufferInfo",
        name: "offset",
        signature: "I",
        kind: MemberKind::Field,
        slot: SLOT_BUFFER_INFO_OFFSET,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec$BufferInfo",
        name: "presentationTimeUs",
        signature: "J",
        kind: MemberKind::Field,
        slot: SLOT_BUFFER_INFO_PTS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodec$BufferInfo",
        name: "size",
        signature: "I",
        kind: MemberKind::Field,
        slot: SLOT_BUFFER_INFO_SIZE,
        mandatory: true,
    },
];

// ============================================================================
// Result types
// ============================================================================

/// Outcome of an input-slot dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DequeueInput {
    Buffer(i32),
    TryAgainLater,
}

/// Metadata of one output buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferInfo {
    pub offset: i32,
    pub size: i32,
    pub presentation_time_us: i64,
    pub flags: i32,
}

/// Outcome of an output-slot dequeue.
#[derive(Debug, Clone, Copy)]
pub enum DequeueOutput {
    Buffer { index: i32, info: BufferInfo },
    TryAgainLater,
    OutputFormatChanged,
    OutputBuffersChanged,
}

/// View of one codec-owned byte buffer. Valid until the slot is queued or
/// released back to the codec.
pub struct BufferSlice {
    ptr: *mut u8,
    len: usize,
}

impl BufferSlice {
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Copies as much of `data` as fits, returning the copied length.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.len);
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr, count);
        }
        count
    }

    pub fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

// ============================================================================
// Codec binding
// ============================================================================

/// Binding to one foreign codec instance.
pub struct MediaCodec {
    bridge: Arc<Bridge>,
    cache: ReflectionCache,
    object: Handle,
    info_try_again_later: i32,
    info_output_buffers_changed: i32,
    info_output_format_changed: i32,
    has_direct_buffer_api: bool,
    // Cached legacy buffer arrays, global refs; 0 until first use.
    input_buffers: AtomicU64,
    output_buffers: AtomicU64,
}

impl MediaCodec {
    pub fn create_by_name(bridge: Arc<Bridge>, name: &str) -> Result<Self, BridgeError> {
        Self::create(bridge, SLOT_CREATE_BY_CODEC_NAME, name)
    }

    pub fn create_decoder_by_type(bridge: Arc<Bridge>, mime: &str) -> Result<Self, BridgeError> {
        Self::create(bridge, SLOT_CREATE_DECODER_BY_TYPE, mime)
    }

    pub fn create_encoder_by_type(bridge: Arc<Bridge>, mime: &str) -> Result<Self, BridgeError> {
        Self::create(bridge, SLOT_CREATE_ENCODER_BY_TYPE, mime)
    }

    fn create(bridge: Arc<Bridge>, creator_slot: usize, argument: &str) -> Result<Self, BridgeError> {
        let guard = bridge.attach()?;
        let env = guard.env().as_ref();
        let mut cache = ReflectionCache::resolve(&bridge, env, MEDIA_CODEC_MEMBERS, true)?;

        let result = (|| {
            let arg_obj = env.new_string(argument);
            exception_check(env)?;
            let local = env
                .call_static_method(
                    cache.handle(SLOT_CLASS),
                    cache.handle(creator_slot),
                    &[Value::Object(arg_obj)],
                )
                .as_object()
                .unwrap_or(0);
            env.delete_local_ref(arg_obj);
            exception_check(env)?;
            if local == 0 {
                return Err(BridgeError::External(format!(
                    "codec creation returned null for {:?}",
                    argument
                )));
            }
            let object = env.new_global_ref(local);
            env.delete_local_ref(local);
            exception_check(env)?;

            let class = cache.handle(SLOT_CLASS);
            let try_again =
                env.static_int_field(class, cache.handle(SLOT_INFO_TRY_AGAIN_LATER));
            let buffers_changed =
                env.static_int_field(class, cache.handle(SLOT_INFO_OUTPUT_BUFFERS_CHANGED));
            let format_changed =
                env.static_int_field(class, cache.handle(SLOT_INFO_OUTPUT_FORMAT_CHANGED));
            exception_check(env)?;
            Ok((object, try_again, buffers_changed, format_changed))
        })();

        match result {
            Ok((object, try_again, buffers_changed, format_changed)) => {
                let has_direct_buffer_api = cache.handle(SLOT_GET_INPUT_BUFFER) != 0
                    && cache.handle(SLOT_GET_OUTPUT_BUFFER) != 0;
                debug!(
                    direct_buffer_api = has_direct_buffer_api,
                    "created codec for {:?}", argument
                );
                Ok(MediaCodec {
                    bridge,
                    cache,
                    object,
                    info_try_again_later: try_again,
                    info_output_buffers_changed: buffers_changed,
                    info_output_format_changed: format_changed,
                    has_direct_buffer_api,
                    input_buffers: AtomicU64::new(0),
                    output_buffers: AtomicU64::new(0),
                })
            }
            Err(e) => {
                cache.release(env, MEDIA_CODEC_MEMBERS);
                Err(e)
            }
        }
    }

    pub fn uses_direct_buffer_api(&self) -> bool {
        self.has_direct_buffer_api
    }

    fn void_call(&self, slot: usize, args: &[Value]) -> Result<(), BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        env.call_method(self.object, self.cache.handle(slot), args);
        exception_check(env)
    }

    /// Configures the codec. Rendering to a surface is wired up by the
    /// session driver, which keeps the window alive on its own; the
    /// foreign configure call always receives a null surface here.
    pub fn configure(
        &self,
        format: &MediaFormat,
        surface: Option<&Surface>,
        flags: i32,
    ) -> Result<(), BridgeError> {
        if surface.is_some() {
            return Err(BridgeError::InvalidArgument(
                "surface handles are managed by the session, not the codec binding".into(),
            ));
        }
        self.void_call(
            SLOT_CONFIGURE,
            &[
                Value::Object(format.object()),
                Value::Object(0),
                Value::Object(0),
                Value::Int(flags),
            ],
        )
    }

    pub fn start(&self) -> Result<(), BridgeError> {
        self.void_call(SLOT_START, &[])
    }

    pub fn flush(&self) -> Result<(), BridgeError> {
        self.void_call(SLOT_FLUSH, &[])
    }

    pub fn stop(&self) -> Result<(), BridgeError> {
        self.void_call(SLOT_STOP, &[])
    }

    pub fn dequeue_input_buffer(&self, timeout_us: i64) -> Result<DequeueInput, BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let index = env
            .call_method(
                self.object,
                self.cache.handle(SLOT_DEQUEUE_INPUT_BUFFER),
                &[Value::Long(timeout_us)],
            )
            .as_int()
            .unwrap_or(self.info_try_again_later);
        exception_check(env)?;
        if index >= 0 {
            Ok(DequeueInput::Buffer(index))
        } else if index == self.info_try_again_later {
            Ok(DequeueInput::TryAgainLater)
        } else {
            Err(BridgeError::External(format!(
                "dequeueInputBuffer returned status {}",
                index
            )))
        }
    }

    fn buffer(
        &self,
        index: i32,
        direct_slot: usize,
        array_slot: usize,
        cached: &AtomicU64,
    ) -> Result<BufferSlice, BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let buffer_obj;
        if self.has_direct_buffer_api {
            buffer_obj = env
                .call_method(
                    self.object,
                    self.cache.handle(direct_slot),
                    &[Value::Int(index)],
                )
                .as_object()
                .unwrap_or(0);
            exception_check(env)?;
        } else {
            let mut array = cached.load(Ordering::Acquire);
            if array == 0 {
                let local = env
                    .call_method(self.object, self.cache.handle(array_slot), &[])
                    .as_object()
                    .unwrap_or(0);
                exception_check(env)?;
                array = env.new_global_ref(local);
                env.delete_local_ref(local);
                exception_check(env)?;
                cached.store(array, Ordering::Release);
            }
            buffer_obj = env.array_element(array, index);
            exception_check(env)?;
        }
        if buffer_obj == 0 {
            return Err(BridgeError::External(format!(
                "codec returned no buffer for slot {}",
                index
            )));
        }
        let mapping = env.direct_buffer(buffer_obj);
        env.delete_local_ref(buffer_obj);
        match mapping {
            Some((ptr, len)) if !ptr.is_null() => Ok(BufferSlice { ptr, len }),
            _ => Err(BridgeError::External(format!(
                "buffer for slot {} is not directly addressable",
                index
            ))),
        }
    }

    pub fn input_buffer(&self, index: i32) -> Result<BufferSlice, BridgeError> {
        self.buffer(
            index,
            SLOT_GET_INPUT_BUFFER,
            SLOT_GET_INPUT_BUFFERS,
            &self.input_buffers,
        )
    }

    pub fn output_buffer(&self, index: i32) -> Result<BufferSlice, BridgeError> {
        self.buffer(
            index,
            SLOT_GET_OUTPUT_BUFFER,
            SLOT_GET_OUTPUT_BUFFERS,
            &self.output_buffers,
        )
    }

    pub fn queue_input_buffer(
        &self,
        index: i32,
        offset: i32,
        size: i32,
        presentation_time_us: i64,
        flags: i32,
    ) -> Result<(), BridgeError> {
        self.void_call(
            SLOT_QUEUE_INPUT_BUFFER,
            &[
                Value::Int(index),
                Value::Int(offset),
                Value::Int(size),
                Value::Long(presentation_time_us),
                Value::Int(flags),
            ],
        )
    }

    pub fn dequeue_output_buffer(&self, timeout_us: i64) -> Result<DequeueOutput, BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let info_obj = env.new_object(
            self.cache.handle(SLOT_BUFFER_INFO_CLASS),
            self.cache.handle(SLOT_BUFFER_INFO_INIT),
            &[],
        );
        exception_check(env)?;
        let index = env
            .call_method(
                self.object,
                self.cache.handle(SLOT_DEQUEUE_OUTPUT_BUFFER),
                &[Value::Object(info_obj), Value::Long(timeout_us)],
            )
            .as_int()
            .unwrap_or(self.info_try_again_later);
        if let Err(e) = exception_check(env) {
            env.delete_local_ref(info_obj);
            return Err(e);
        }
        let outcome = if index >= 0 {
            let info = BufferInfo {
                offset: env.int_field(info_obj, self.cache.handle(SLOT_BUFFER_INFO_OFFSET)),
                size: env.int_field(info_obj, self.cache.handle(SLOT_BUFFER_INFO_SIZE)),
                presentation_time_us: env
                    .long_field(info_obj, self.cache.handle(SLOT_BUFFER_INFO_PTS)),
                flags: env.int_field(info_obj, self.cache.handle(SLOT_BUFFER_INFO_FLAGS)),
            };
            DequeueOutput::Buffer { index, info }
        } else if index == self.info_output_format_changed {
            DequeueOutput::OutputFormatChanged
        } else if index == self.info_output_buffers_changed {
            DequeueOutput::OutputBuffersChanged
        } else if index == self.info_try_again_later {
            DequeueOutput::TryAgainLater
        } else {
            env.delete_local_ref(info_obj);
            return Err(BridgeError::External(format!(
                "dequeueOutputBuffer returned status {}",
                index
            )));
        };
        env.delete_local_ref(info_obj);
        exception_check(env)?;
        Ok(outcome)
    }

    /// Returns the slot to the codec, optionally rendering it.
    pub fn release_output_buffer(&self, index: i32, render: bool) -> Result<(), BridgeError> {
        self.void_call(
            SLOT_RELEASE_OUTPUT_BUFFER,
            &[Value::Int(index), Value::Bool(render)],
        )
    }

    /// Renders the slot at a specific display timestamp. Only available on
    /// newer platform generations.
    pub fn release_output_buffer_at_time(
        &self,
        index: i32,
        render_time_ns: i64,
    ) -> Result<(), BridgeError> {
        if self.cache.handle(SLOT_RELEASE_OUTPUT_BUFFER_AT_TIME) == 0 {
            return Err(BridgeError::External(
                "timed output release is not available on this platform".into(),
            ));
        }
        self.void_call(
            SLOT_RELEASE_OUTPUT_BUFFER_AT_TIME,
            &[Value::Int(index), Value::Long(render_time_ns)],
        )
    }

    /// Current output format as a fresh binding.
    pub fn output_format(&self) -> Result<MediaFormat, BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let local = env
            .call_method(self.object, self.cache.handle(SLOT_GET_OUTPUT_FORMAT), &[])
            .as_object()
            .unwrap_or(0);
        exception_check(env)?;
        if local == 0 {
            return Err(BridgeError::External("codec reported no output format".into()));
        }
        MediaFormat::from_object(self.bridge.clone(), env, local)
    }

    /// Drops the cached legacy output array so the next access refetches
    /// it. No-op on the direct-buffer path and when nothing is cached.
    pub fn clean_output_buffers(&self) -> Result<(), BridgeError> {
        let array = self.output_buffers.swap(0, Ordering::AcqRel);
        if array != 0 {
            let guard = self.bridge.attach()?;
            guard.env().delete_global_ref(array);
        }
        Ok(())
    }

    fn release_binding(&mut self) {
        let guard = match self.bridge.attach() {
            Ok(guard) => guard,
            Err(e) => {
                error!("could not attach for codec release: {}", e);
                return;
            }
        };
        let env = guard.env().as_ref();
        env.call_method(self.object, self.cache.handle(SLOT_RELEASE), &[]);
        if let Err(e) = exception_check(env) {
            error!("codec release failed: {}", e);
        }
        let inputs = self.input_buffers.swap(0, Ordering::AcqRel);
        if inputs != 0 {
            env.delete_global_ref(inputs);
        }
        let outputs = self.output_buffers.swap(0, Ordering::AcqRel);
        if outputs != 0 {
            env.delete_global_ref(outputs);
        }
        env.delete_global_ref(self.object);
        self.object = 0;
        self.cache.release(env, MEDIA_CODEC_MEMBERS);
    }
}

impl Drop for MediaCodec {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!("codec flush during teardown failed: {}", e);
        }
        if let Err(e) = self.stop() {
            error!("codec stop during teardown failed: {}", e);
        }
        self.release_binding();
    }
}

// SAFETY: every foreign handle inside is only dereferenced through an
// attached environment, and the cached array slots are atomics.
unsafe impl Send for MediaCodec {}
unsafe impl Sync for MediaCodec {}

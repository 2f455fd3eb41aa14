// MediaFormat - typed property bag binding
//
// Wraps the platform's key/value media description object. Getters treat
// a foreign exception as "key absent" (cleared silently, Ok(None)); setters
// propagate foreign failures as errors. Byte-buffer values are deep-copied
// on both sides so no foreign memory outlives the call.

use std::sync::Arc;

use crate::error::BridgeError;
use crate::reflect::{MemberKind, MemberSpec, ReflectionCache};
use crate::runtime::{clear_exception, exception_check, Bridge, CallEnv, Handle, Value};

const SLOT_CLASS: usize = 0;
const SLOT_INIT: usize = 1;
const SLOT_GET_INTEGER: usize = 2;
const SLOT_GET_LONG: usize = 3;
const SLOT_GET_FLOAT: usize = 4;
const SLOT_GET_BYTE_BUFFER: usize = 5;
const SLOT_GET_STRING: usize = 6;
const SLOT_SET_INTEGER: usize = 7;
const SLOT_SET_LONG: usize = 8;
const SLOT_SET_FLOAT: usize = 9;
const SLOT_SET_BYTE_BUFFER: usize = 10;
const SLOT_SET_STRING: usize = 11;
const SLOT_TO_STRING: usize = 12;

static MEDIA_FORMAT_MEMBERS: &[MemberSpec] = &[
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "android/media/MediaFormat",
        signature: "",
        kind: MemberKind::Class,
        slot: SLOT_CLASS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "<init>",
        signature: "()V",
        kind: MemberKind::Method,
        slot: SLOT_INIT,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "getInteger",
        signature: "(Ljava/lang/String;)I",
        kind: MemberKind::Method,
        slot: SLOT_GET_INTEGER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "getLong",
        signature: "(Ljava/lang/String;)J",
        kind: MemberKind::Method,
        slot: SLOT_GET_LONG,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "getFloat",
        signature: "(Ljava/lang/String;)F",
        kind: MemberKind::Method,
        slot: SLOT_GET_FLOAT,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "getByteBuffer",
        signature: "(Ljava/lang/String;)Ljava/nio/ByteBuffer;",
        kind: MemberKind::Method,
        slot: SLOT_GET_BYTE_BUFFER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "getString",
        signature: "(Ljava/lang/String;)Ljava/lang/String;",
        kind: MemberKind::Method,
        slot: SLOT_GET_STRING,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "setInteger",
        signature: "(Ljava/lang/String;I)V",
        kind: MemberKind::Method,
        slot: SLOT_SET_INTEGER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "setLong",
        signature: "(Ljava/lang/String;J)V",
        kind: MemberKind::Method,
        slot: SLOT_SET_LONG,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "setFloat",
        signature: "(Ljava/lang/String;F)V",
        kind: MemberKind::Method,
        slot: SLOT_SET_FLOAT,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "setByteBuffer",
        signature: "(Ljava/lang/String;Ljava/nio/ByteBuffer;)V",
        kind: MemberKind::Method,
        slot: SLOT_SET_BYTE_BUFFER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "setString",
        signature: "(Ljava/lang/String;Ljava/lang/String;)V",
        kind: MemberKind::Method,
        slot: SLOT_SET_STRING,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "toString",
        signature: "()Ljava/lang/String;",
        kind: MemberKind::Method,
        slot: SLOT_TO_STRING,
        mandatory: true,
    },
];

/// Binding to one foreign format object, held as a global reference.
pub struct MediaFormat {
    bridge: Arc<Bridge>,
    cache: ReflectionCache,
    object: Handle,
}

impl MediaFormat {
    /// Creates a fresh, empty format object.
    pub fn new(bridge: Arc<Bridge>) -> Result<Self, BridgeError> {
        let guard = bridge.attach()?;
        let env = guard.env().as_ref();
        let mut cache = ReflectionCache::resolve(&bridge, env, MEDIA_FORMAT_MEMBERS, true)?;
        let local = env.new_object(cache.handle(SLOT_CLASS), cache.handle(SLOT_INIT), &[]);
        if let Err(e) = exception_check(env) {
            cache.release(env, MEDIA_FORMAT_MEMBERS);
            return Err(e);
        }
        let object = env.new_global_ref(local);
        env.delete_local_ref(local);
        if let Err(e) = exception_check(env) {
            cache.release(env, MEDIA_FORMAT_MEMBERS);
            return Err(e);
        }
        drop(guard);
        Ok(MediaFormat {
            bridge,
            cache,
            object,
        })
    }

    /// Wraps a format object returned by a foreign call. Takes over the
    /// local reference.
    pub(crate) fn from_object(
        bridge: Arc<Bridge>,
        env: &dyn CallEnv,
        object: Handle,
    ) -> Result<Self, BridgeError> {
        let mut cache = match ReflectionCache::resolve(&bridge, env, MEDIA_FORMAT_MEMBERS, true) {
            Ok(cache) => cache,
            Err(e) => {
                env.delete_local_ref(object);
                return Err(e);
            }
        };
        let global = env.new_global_ref(object);
        env.delete_local_ref(object);
        if let Err(e) = exception_check(env) {
            cache.release(env, MEDIA_FORMAT_MEMBERS);
            return Err(e);
        }
        Ok(MediaFormat {
            bridge,
            cache,
            object: global,
        })
    }

    pub(crate) fn object(&self) -> Handle {
        self.object
    }

    /// Foreign `toString()`, for diagnostics.
    pub fn to_display_string(&self) -> Result<String, BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let result = env.call_method(self.object, self.cache.handle(SLOT_TO_STRING), &[]);
        exception_check(env)?;
        let string_obj = result.as_object().unwrap_or(0);
        if string_obj == 0 {
            return Ok(String::new());
        }
        let text = env.string_value(string_obj).unwrap_or_default();
        env.delete_local_ref(string_obj);
        Ok(text)
    }

    fn get_value(&self, slot: usize, key: &str) -> Result<Option<Value>, BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let key_obj = env.new_string(key);
        exception_check(env)?;
        let result = env.call_method(self.object, self.cache.handle(slot), &[Value::Object(key_obj)]);
        env.delete_local_ref(key_obj);
        // The platform throws for absent keys; that is "no value", not an
        // error.
        if clear_exception(env) {
            return Ok(None);
        }
        Ok(Some(result))
    }

    pub fn get_i32(&self, key: &str) -> Result<Option<i32>, BridgeError> {
        Ok(self
            .get_value(SLOT_GET_INTEGER, key)?
            .and_then(|v| v.as_int()))
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, BridgeError> {
        Ok(self.get_value(SLOT_GET_LONG, key)?.and_then(|v| v.as_long()))
    }

    pub fn get_f32(&self, key: &str) -> Result<Option<f32>, BridgeError> {
        Ok(self
            .get_value(SLOT_GET_FLOAT, key)?
            .and_then(|v| v.as_float()))
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let key_obj = env.new_string(key);
        exception_check(env)?;
        let result = env.call_method(
            self.object,
            self.cache.handle(SLOT_GET_STRING),
            &[Value::Object(key_obj)],
        );
        env.delete_local_ref(key_obj);
        if clear_exception(env) {
            return Ok(None);
        }
        let string_obj = match result.as_object() {
            Some(h) if h != 0 => h,
            _ => return Ok(None),
        };
        let text = env.string_value(string_obj);
        env.delete_local_ref(string_obj);
        Ok(text)
    }

    /// Returns an owned copy of a byte-buffer value.
    pub fn get_buffer(&self, key: &str) -> Result<Option<Vec<u8>>, BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let key_obj = env.new_string(key);
        exception_check(env)?;
        let result = env.call_method(
            self.object,
            self.cache.handle(SLOT_GET_BYTE_BUFFER),
            &[Value::Object(key_obj)],
        );
        env.delete_local_ref(key_obj);
        if clear_exception(env) {
            return Ok(None);
        }
        let buffer_obj = match result.as_object() {
            Some(h) if h != 0 => h,
            _ => return Ok(None),
        };
        let copy = match env.direct_buffer(buffer_obj) {
            Some((ptr, len)) if !ptr.is_null() && len > 0 => {
                // Copied before the local reference goes away; the caller
                // never sees foreign memory.
                let slice = unsafe { std::slice::from_raw_parts(ptr, len) };
                Some(slice.to_vec())
            }
            _ => None,
        };
        env.delete_local_ref(buffer_obj);
        Ok(copy)
    }

    fn set_value(&self, slot: usize, key: &str, value: Value) -> Result<(), BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let key_obj = env.new_string(key);
        exception_check(env)?;
        env.call_method(
            self.object,
            self.cache.handle(slot),
            &[Value::Object(key_obj), value],
        );
        env.delete_local_ref(key_obj);
        exception_check(env)
    }

    pub fn set_i32(&self, key: &str, value: i32) -> Result<(), BridgeError> {
        self.set_value(SLOT_SET_INTEGER, key, Value::Int(value))
    }

    pub fn set_i64(&self, key: &str, value: i64) -> Result<(), BridgeError> {
        self.set_value(SLOT_SET_LONG, key, Value::Long(value))
    }

    pub fn set_f32(&self, key: &str, value: f32) -> Result<(), BridgeError> {
        self.set_value(SLOT_SET_FLOAT, key, Value::Float(value))
    }

    pub fn set_string(&self, key: &str, value: &str) -> Result<(), BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let key_obj = env.new_string(key);
        exception_check(env)?;
        let value_obj = env.new_string(value);
        if let Err(e) = exception_check(env) {
            env.delete_local_ref(key_obj);
            return Err(e);
        }
        env.call_method(
            self.object,
            self.cache.handle(SLOT_SET_STRING),
            &[Value::Object(key_obj), Value::Object(value_obj)],
        );
        env.delete_local_ref(key_obj);
        env.delete_local_ref(value_obj);
        exception_check(env)
    }

    /// Stores a copy of `data` as a fresh direct buffer value.
    pub fn set_buffer(&self, key: &str, data: &[u8]) -> Result<(), BridgeError> {
        let guard = self.bridge.attach()?;
        let env = guard.env().as_ref();
        let buffer_obj = env.new_direct_buffer(data);
        exception_check(env)?;
        let key_obj = env.new_string(key);
        if let Err(e) = exception_check(env) {
            env.delete_local_ref(buffer_obj);
            return Err(e);
        }
        env.call_method(
            self.object,
            self.cache.handle(SLOT_SET_BYTE_BUFFER),
            &[Value::Object(key_obj), Value::Object(buffer_obj)],
        );
        env.delete_local_ref(key_obj);
        env.delete_local_ref(buffer_obj);
        exception_check(env)
    }
}

impl Drop for MediaFormat {
    fn drop(&mut self) {
        if let Ok(guard) = self.bridge.attach() {
            let env = guard.env().as_ref();
            env.delete_global_ref(self.object);
            self.cache.release(env, MEDIA_FORMAT_MEMBERS);
        }
    }
}

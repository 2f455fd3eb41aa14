// Decoder selection
//
// Picks a hardware decoder name for a mime type and resolution. Newer
// platform generations expose a format-driven query (MediaCodecList
// instance plus findDecoderForFormat); older ones only enumerate installed
// codecs, so the fallback walks the registry and takes the first decoder
// advertising the mime type, skipping the software fallbacks whose names
// carry the "OMX.google" prefix.

use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::reflect::{MemberKind, MemberSpec, ReflectionCache};
use crate::runtime::{exception_check, Bridge, CallEnv, Handle, Value};

const SLOT_LIST_CLASS: usize = 0;
const SLOT_LIST_INIT: usize = 1;
const SLOT_FIND_DECODER_FOR_FORMAT: usize = 2;
const SLOT_GET_CODEC_COUNT: usize = 3;
const SLOT_GET_CODEC_INFO_AT: usize = 4;
const SLOT_INFO_CLASS: usize = 5;
const SLOT_GET_NAME: usize = 6;
const SLOT_IS_ENCODER: usize = 7;
const SLOT_GET_SUPPORTED_TYPES: usize = 8;
const SLOT_FORMAT_CLASS: usize = 9;
const SLOT_CREATE_VIDEO_FORMAT: usize = 10;

static CODEC_LIST_MEMBERS: &[MemberSpec] = &[
    MemberSpec {
        owner: "android/media/MediaCodecList",
        name: "android/media/MediaCodecList",
        signature: "",
        kind: MemberKind::Class,
        slot: SLOT_LIST_CLASS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodecList",
        name: "<init>",
        signature: "(I)V",
        kind: MemberKind::Method,
        slot: SLOT_LIST_INIT,
        mandatory: false,
    },
    MemberSpec {
        owner: "android/media/MediaCodecList",
        name: "findDecoderForFormat",
        signature: "(Landroid/media/MediaFormat;)Ljava/lang/String;",
        kind: MemberKind::Method,
        slot: SLOT_FIND_DECODER_FOR_FORMAT,
        mandatory: false,
    },
    MemberSpec {
        owner: "android/media/MediaCodecList",
        name: "getCodecCount",
        signature: "()I",
        kind: MemberKind::StaticMethod,
        slot: SLOT_GET_CODEC_COUNT,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodecList",
        name: "getCodecInfoAt",
        signature: "(I)Landroid/media/MediaCodecInfo;",
        kind: MemberKind::StaticMethod,
        slot: SLOT_GET_CODEC_INFO_AT,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodecInfo",
        name: "android/media/MediaCodecInfo",
        signature: "",
        kind: MemberKind::Class,
        slot: SLOT_INFO_CLASS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodecInfo",
        name: "getName",
        signature: "()Ljava/lang/String;",
        kind: MemberKind::Method,
        slot: SLOT_GET_NAME,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodecInfo",
        name: "isEncoder",
        signature: "()Z",
        kind: MemberKind::Method,
        slot: SLOT_IS_ENCODER,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaCodecInfo",
        name: "getSupportedTypes",
        signature: "()[Ljava/lang/String;",
        kind: MemberKind::Method,
        slot: SLOT_GET_SUPPORTED_TYPES,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "android/media/MediaFormat",
        signature: "",
        kind: MemberKind::Class,
        slot: SLOT_FORMAT_CLASS,
        mandatory: true,
    },
    MemberSpec {
        owner: "android/media/MediaFormat",
        name: "createVideoFormat",
        signature: "(Ljava/lang/String;II)Landroid/media/MediaFormat;",
        kind: MemberKind::StaticMethod,
        slot: SLOT_CREATE_VIDEO_FORMAT,
        mandatory: true,
    },
];

/// Resolves the decoder name for `mime` at `width` x `height`.
pub fn select_decoder(
    bridge: &std::sync::Arc<Bridge>,
    mime: &str,
    width: i32,
    height: i32,
) -> Result<String, BridgeError> {
    let guard = bridge.attach()?;
    let env = guard.env().as_ref();
    let mut cache = ReflectionCache::resolve(bridge, env, CODEC_LIST_MEMBERS, false)?;
    let result = select_with_cache(env, &cache, mime, width, height);
    cache.release(env, CODEC_LIST_MEMBERS);
    result
}

fn select_with_cache(
    env: &dyn CallEnv,
    cache: &ReflectionCache,
    mime: &str,
    width: i32,
    height: i32,
) -> Result<String, BridgeError> {
    if cache.handle(SLOT_LIST_INIT) != 0 && cache.handle(SLOT_FIND_DECODER_FOR_FORMAT) != 0 {
        if let Some(name) = find_for_format(env, cache, mime, width, height)? {
            debug!("selected decoder {:?} for {} ({}x{})", name, mime, width, height);
            return Ok(name);
        }
        warn!("no format-matched decoder for {} ({}x{})", mime, width, height);
    }
    enumerate_decoders(env, cache, mime)
}

fn find_for_format(
    env: &dyn CallEnv,
    cache: &ReflectionCache,
    mime: &str,
    width: i32,
    height: i32,
) -> Result<Option<String>, BridgeError> {
    let mime_obj = env.new_string(mime);
    exception_check(env)?;
    let format = env
        .call_static_method(
            cache.handle(SLOT_FORMAT_CLASS),
            cache.handle(SLOT_CREATE_VIDEO_FORMAT),
            &[Value::Object(mime_obj), Value::Int(width), Value::Int(height)],
        )
        .as_object()
        .unwrap_or(0);
    env.delete_local_ref(mime_obj);
    exception_check(env)?;
    if format == 0 {
        return Ok(None);
    }

    // REGULAR_CODECS is 0 on every platform generation carrying this API.
    let list = env.new_object(
        cache.handle(SLOT_LIST_CLASS),
        cache.handle(SLOT_LIST_INIT),
        &[Value::Int(0)],
    );
    if let Err(e) = exception_check(env) {
        env.delete_local_ref(format);
        return Err(e);
    }
    let name_obj = env
        .call_method(
            list,
            cache.handle(SLOT_FIND_DECODER_FOR_FORMAT),
            &[Value::Object(format)],
        )
        .as_object()
        .unwrap_or(0);
    env.delete_local_ref(list);
    env.delete_local_ref(format);
    exception_check(env)?;
    if name_obj == 0 {
        return Ok(None);
    }
    let name = env.string_value(name_obj);
    env.delete_local_ref(name_obj);
    Ok(name)
}

fn enumerate_decoders(
    env: &dyn CallEnv,
    cache: &ReflectionCache,
    mime: &str,
) -> Result<String, BridgeError> {
    let count = env
        .call_static_method(
            cache.handle(SLOT_LIST_CLASS),
            cache.handle(SLOT_GET_CODEC_COUNT),
            &[],
        )
        .as_int()
        .unwrap_or(0);
    exception_check(env)?;

    for index in 0..count {
        let info = env
            .call_static_method(
                cache.handle(SLOT_LIST_CLASS),
                cache.handle(SLOT_GET_CODEC_INFO_AT),
                &[Value::Int(index)],
            )
            .as_object()
            .unwrap_or(0);
        exception_check(env)?;
        if info == 0 {
            continue;
        }

        let is_encoder = env
            .call_method(info, cache.handle(SLOT_IS_ENCODER), &[])
            .as_bool()
            .unwrap_or(false);
        if let Err(e) = exception_check(env) {
            env.delete_local_ref(info);
            return Err(e);
        }
        if is_encoder {
            env.delete_local_ref(info);
            continue;
        }

        let name = codec_info_name(env, cache, info)?;
        // Software fallbacks are never a hardware decode win.
        if name.contains("OMX.google") {
            env.delete_local_ref(info);
            continue;
        }

        let supported = supports_mime(env, cache, info, mime);
        env.delete_local_ref(info);
        if supported? {
            debug!("selected decoder {:?} for {} by enumeration", name, mime);
            return Ok(name);
        }
    }
    Err(BridgeError::External(format!(
        "no hardware decoder installed for {}",
        mime
    )))
}

fn codec_info_name(
    env: &dyn CallEnv,
    cache: &ReflectionCache,
    info: Handle,
) -> Result<String, BridgeError> {
    let name_obj = env
        .call_method(info, cache.handle(SLOT_GET_NAME), &[])
        .as_object()
        .unwrap_or(0);
    exception_check(env)?;
    if name_obj == 0 {
        return Ok(String::new());
    }
    let name = env.string_value(name_obj).unwrap_or_default();
    env.delete_local_ref(name_obj);
    Ok(name)
}

fn supports_mime(
    env: &dyn CallEnv,
    cache: &ReflectionCache,
    info: Handle,
    mime: &str,
) -> Result<bool, BridgeError> {
    let types = env
        .call_method(info, cache.handle(SLOT_GET_SUPPORTED_TYPES), &[])
        .as_object()
        .unwrap_or(0);
    exception_check(env)?;
    if types == 0 {
        return Ok(false);
    }
    let length = env.array_length(types);
    for type_index in 0..length {
        let type_obj = env.array_element(types, type_index);
        if type_obj == 0 {
            continue;
        }
        let value = env.string_value(type_obj).unwrap_or_default();
        env.delete_local_ref(type_obj);
        if value.eq_ignore_ascii_case(mime) {
            env.delete_local_ref(types);
            return Ok(true);
        }
    }
    env.delete_local_ref(types);
    Ok(false)
}

//! Loads the embedded location helper and links its native callbacks.

use std::ffi::c_void;
use std::fs;
use std::sync::OnceLock;

use jni::objects::{GlobalRef, JClass, JObject, JValue};
use jni::{JNIEnv, NativeMethod};

use super::{map_jni_error, native_location_result, native_nmea_message, native_settings_result};
use crate::PlatformError;

/// DEX bytecode of `geobridge.location.LocationHelper`, built by kotlinc + D8.
static DEX_BYTES: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/classes.dex"));

const HELPER_CLASS: &str = "geobridge.location.LocationHelper";

static HELPER: OnceLock<GlobalRef> = OnceLock::new();

/// The helper class, loading it on first use.
pub(super) fn helper_class(
    env: &mut JNIEnv<'_>,
    context: &JObject<'_>,
) -> Result<&'static GlobalRef, PlatformError> {
    if let Some(class) = HELPER.get() {
        return Ok(class);
    }

    let class = load(env, context)?;
    Ok(HELPER.get_or_init(|| class))
}

fn load(env: &mut JNIEnv<'_>, context: &JObject<'_>) -> Result<GlobalRef, PlatformError> {
    let cache_dir = env
        .call_method(context, "getCacheDir", "()Ljava/io/File;", &[])
        .and_then(|value| value.l())
        .map_err(map_jni_error)?;
    let cache_path = env
        .call_method(&cache_dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
        .and_then(|value| value.l())
        .map_err(map_jni_error)?;
    let cache_path: String = env
        .get_string((&cache_path).into())
        .map_err(map_jni_error)?
        .into();

    // Dynamically loaded code must not be writable on newer releases.
    let dex_path = format!("{cache_path}/geobridge_location.dex");
    let _ = fs::remove_file(&dex_path);
    fs::write(&dex_path, DEX_BYTES)
        .map_err(|err| PlatformError::new(format!("write DEX failed: {err}")))?;
    let mut permissions = fs::metadata(&dex_path)
        .map_err(|err| PlatformError::new(format!("stat DEX failed: {err}")))?
        .permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&dex_path, permissions)
        .map_err(|err| PlatformError::new(format!("protect DEX failed: {err}")))?;

    let dex_path = env.new_string(&dex_path).map_err(map_jni_error)?;
    let optimized_dir = env.new_string(&cache_path).map_err(map_jni_error)?;
    let parent_loader = env
        .call_method(context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .and_then(|value| value.l())
        .map_err(map_jni_error)?;

    let loader = env
        .new_object(
            "dalvik/system/DexClassLoader",
            "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Ljava/lang/ClassLoader;)V",
            &[
                JValue::Object(&dex_path),
                JValue::Object(&optimized_dir),
                JValue::Object(&JObject::null()),
                JValue::Object(&parent_loader),
            ],
        )
        .map_err(map_jni_error)?;

    let name = env.new_string(HELPER_CLASS).map_err(map_jni_error)?;
    let class = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&name)],
        )
        .and_then(|value| value.l())
        .map_err(map_jni_error)?;
    let class = JClass::from(class);

    // Classes from a DexClassLoader do not see symbols exported by this
    // library, so the callbacks are linked by hand.
    let natives = [
        NativeMethod {
            name: "nativeSettingsResult".into(),
            sig: "(JII)V".into(),
            fn_ptr: native_settings_result as *mut c_void,
        },
        NativeMethod {
            name: "nativeLocationResult".into(),
            sig: "(JLjava/lang/String;)V".into(),
            fn_ptr: native_location_result as *mut c_void,
        },
        NativeMethod {
            name: "nativeNmeaMessage".into(),
            sig: "(JLjava/lang/String;)V".into(),
            fn_ptr: native_nmea_message as *mut c_void,
        },
    ];

    // SAFETY: each pointer is an `extern "system"` fn whose parameters match
    // the JNI signature registered with it.
    #[allow(unused_unsafe)]
    unsafe {
        env.register_native_methods(&class, &natives)
            .map_err(map_jni_error)?;
    }

    env.new_global_ref(&class).map_err(map_jni_error)
}

//! Android permission implementation using JNI.
//!
//! Talks to the host `Activity` directly; no helper classes are loaded.

use crate::{Permission, PermissionError, PermissionPlatform};
use jni::objects::{GlobalRef, JObject, JValue};
use jni::sys::jint;
use jni::{JNIEnv, JavaVM};
use log::error;
use std::fmt;

/// `PackageManager.PERMISSION_GRANTED`.
const PERMISSION_GRANTED: jint = 0;

/// Runtime permissions were introduced in API level 23 (Marshmallow).
const RUNTIME_PERMISSIONS_SDK: jint = 23;

/// Request code used for location permission prompts. The host forwards
/// `onRequestPermissionsResult` for this code to the bridge.
pub const REQUEST_PERMISSIONS_REQUEST_CODE: jint = 34;

/// Permission platform backed by an Android `Activity`.
pub struct ActivityPermissions {
    vm: JavaVM,
    activity: GlobalRef,
    sdk_int: jint,
}

impl fmt::Debug for ActivityPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityPermissions")
            .field("sdk_int", &self.sdk_int)
            .finish_non_exhaustive()
    }
}

impl ActivityPermissions {
    /// Wrap the host activity.
    ///
    /// # Errors
    /// Returns a [`PermissionError`] if the JVM handle, a global reference or
    /// the SDK level cannot be obtained.
    pub fn new(env: &mut JNIEnv<'_>, activity: &JObject<'_>) -> Result<Self, PermissionError> {
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let activity = env.new_global_ref(activity).map_err(map_jni_error)?;
        let sdk_int = env
            .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")
            .and_then(|value| value.i())
            .map_err(map_jni_error)?;

        Ok(Self {
            vm,
            activity,
            sdk_int,
        })
    }

    /// The device's `Build.VERSION.SDK_INT`.
    #[must_use]
    pub const fn sdk_int(&self) -> jint {
        self.sdk_int
    }

    fn with_activity<T, F>(&self, action: F) -> Result<T, PermissionError>
    where
        F: FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> jni::errors::Result<T>,
    {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        action(&mut env, self.activity.as_obj()).map_err(map_jni_error)
    }
}

impl PermissionPlatform for ActivityPermissions {
    fn runtime_permissions(&self) -> bool {
        self.sdk_int >= RUNTIME_PERMISSIONS_SDK
    }

    fn is_granted(&self, permission: Permission) -> bool {
        if !self.runtime_permissions() {
            return true;
        }

        let result = self.with_activity(|env, activity| {
            let name = env.new_string(permission.as_str())?;
            env.call_method(
                activity,
                "checkSelfPermission",
                "(Ljava/lang/String;)I",
                &[JValue::Object(&name)],
            )?
            .i()
        });

        match result {
            Ok(state) => state == PERMISSION_GRANTED,
            Err(err) => {
                error!("checkSelfPermission failed: {err}");
                false
            }
        }
    }

    fn should_show_rationale(&self, permission: Permission) -> bool {
        if !self.runtime_permissions() {
            return false;
        }

        let result = self.with_activity(|env, activity| {
            let name = env.new_string(permission.as_str())?;
            env.call_method(
                activity,
                "shouldShowRequestPermissionRationale",
                "(Ljava/lang/String;)Z",
                &[JValue::Object(&name)],
            )?
            .z()
        });

        result.unwrap_or_else(|err| {
            error!("shouldShowRequestPermissionRationale failed: {err}");
            false
        })
    }

    fn request(&mut self, permission: Permission) -> Result<(), PermissionError> {
        if !self.runtime_permissions() {
            return Ok(());
        }

        self.with_activity(|env, activity| {
            let name = env.new_string(permission.as_str())?;
            let names = env.new_object_array(1, "java/lang/String", &name)?;
            env.call_method(
                activity,
                "requestPermissions",
                "([Ljava/lang/String;I)V",
                &[
                    JValue::Object(&names),
                    JValue::Int(REQUEST_PERMISSIONS_REQUEST_CODE),
                ],
            )?;
            Ok(())
        })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn map_jni_error(err: jni::errors::Error) -> PermissionError {
    PermissionError::Platform(err.to_string())
}

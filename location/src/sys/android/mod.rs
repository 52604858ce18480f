//! Android location implementation using JNI.
//!
//! `LocationHelper.kt` wraps the fused location client, the settings client
//! and `LocationManager`. It is compiled to DEX at build time, embedded in
//! this library and loaded on first use. Rust drives the helper with JSON
//! payloads; the helper reports settings results, fixes and NMEA sentences
//! back through native callbacks keyed by session handle.
//!
//! The host glue owns the activity. It opens a session with [`create`],
//! forwards method calls and stream subscriptions, and relays
//! `onRequestPermissionsResult` and `onActivityResult`. Replies and stream
//! events reach the host as [`HostMessage`]s.

mod loader;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;
use geobridge_permission::sys::android::ActivityPermissions;
use geobridge_permission::{Permission, PermissionError, PermissionPlatform};
use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jint, jlong};
use jni::{JNIEnv, JavaVM};
use log::{error, warn};
use serde::Serialize;

use super::serial::Serialized;
use crate::{
    Capabilities, LocationBridge, LocationPlatform, LocationStream, MethodCall, MethodReply,
    MethodResult, PlatformError, Provider, RawLocation, RequestSettings, SettingsOutcome,
    SettingsPurpose, StateError, StreamEvent,
};

/// `OnNmeaMessageListener` needs API level 24 (Nougat).
const NMEA_LISTENER_SDK: jint = 24;

/// `CommonStatusCodes.SUCCESS`.
const STATUS_SUCCESS: jint = 0;
/// `LocationSettingsStatusCodes.RESOLUTION_REQUIRED`.
const STATUS_RESOLUTION_REQUIRED: jint = 6;

/// `Activity.RESULT_OK`.
const RESULT_OK: jint = -1;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);
static SESSIONS: OnceLock<Mutex<HashMap<u64, Arc<Serialized<Session>>>>> = OnceLock::new();

fn sessions() -> &'static Mutex<HashMap<u64, Arc<Serialized<Session>>>> {
    SESSIONS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Location platform backed by a `LocationHelper` instance.
struct AndroidLocationPlatform {
    vm: JavaVM,
    helper: GlobalRef,
    permissions: ActivityPermissions,
}

impl fmt::Debug for AndroidLocationPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidLocationPlatform")
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

impl AndroidLocationPlatform {
    /// Create a helper bound to `activity` that reports under `handle`.
    fn new(env: &mut JNIEnv<'_>, activity: &JObject<'_>, handle: jlong) -> Result<Self, PlatformError> {
        let class = loader::helper_class(env, activity)?;
        let helper = env
            .new_object(
                <&JClass>::from(class.as_obj()),
                "(Landroid/app/Activity;J)V",
                &[JValue::Object(activity), JValue::Long(handle)],
            )
            .map_err(map_jni_error)?;

        let permissions = ActivityPermissions::new(env, activity)
            .map_err(|err| PlatformError::new(err.to_string()))?;
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let helper = env.new_global_ref(helper).map_err(map_jni_error)?;

        Ok(Self {
            vm,
            helper,
            permissions,
        })
    }

    fn with_helper<T, F>(&self, action: F) -> Result<T, PlatformError>
    where
        F: FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> jni::errors::Result<T>,
    {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        let result = action(&mut env, self.helper.as_obj());
        if result.is_err() && env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        result.map_err(map_jni_error)
    }

    fn call_void(&self, method: &str) -> Result<(), PlatformError> {
        self.with_helper(|env, helper| {
            env.call_method(helper, method, "()V", &[])?;
            Ok(())
        })
    }
}

impl PermissionPlatform for AndroidLocationPlatform {
    fn runtime_permissions(&self) -> bool {
        self.permissions.runtime_permissions()
    }

    fn is_granted(&self, permission: Permission) -> bool {
        self.permissions.is_granted(permission)
    }

    fn should_show_rationale(&self, permission: Permission) -> bool {
        self.permissions.should_show_rationale(permission)
    }

    fn request(&mut self, permission: Permission) -> Result<(), PermissionError> {
        self.permissions.request(permission)
    }
}

impl LocationPlatform for AndroidLocationPlatform {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            nmea_feed: self.permissions.sdk_int() >= NMEA_LISTENER_SDK,
        }
    }

    fn is_provider_enabled(&self, provider: Provider) -> Result<bool, PlatformError> {
        let name = match provider {
            Provider::Gps => "gps",
            Provider::Network => "network",
        };

        self.with_helper(|env, helper| {
            let name = env.new_string(name)?;
            env.call_method(
                helper,
                "isProviderEnabled",
                "(Ljava/lang/String;)Z",
                &[JValue::Object(&name)],
            )?
            .z()
        })
    }

    fn check_settings(
        &mut self,
        settings: &RequestSettings,
        purpose: SettingsPurpose,
    ) -> Result<(), PlatformError> {
        let json = to_json(settings)?;
        self.with_helper(|env, helper| {
            let json = env.new_string(json.as_str())?;
            env.call_method(
                helper,
                "checkSettings",
                "(Ljava/lang/String;I)V",
                &[JValue::Object(&json), JValue::Int(purpose.request_code())],
            )?;
            Ok(())
        })
    }

    fn start_resolution(&mut self, purpose: SettingsPurpose) -> Result<(), PlatformError> {
        self.with_helper(|env, helper| {
            env.call_method(
                helper,
                "startResolution",
                "(I)V",
                &[JValue::Int(purpose.request_code())],
            )?;
            Ok(())
        })
    }

    fn request_location_updates(&mut self, settings: &RequestSettings) -> Result<(), PlatformError> {
        let json = to_json(settings)?;
        self.with_helper(|env, helper| {
            let json = env.new_string(json.as_str())?;
            env.call_method(
                helper,
                "requestLocationUpdates",
                "(Ljava/lang/String;)V",
                &[JValue::Object(&json)],
            )?;
            Ok(())
        })
    }

    fn remove_location_updates(&mut self) {
        if let Err(err) = self.call_void("removeLocationUpdates") {
            error!("failed to stop Android location updates: {err}");
        }
    }

    fn add_nmea_listener(&mut self) -> Result<(), PlatformError> {
        self.call_void("addNmeaListener")
    }

    fn remove_nmea_listener(&mut self) {
        if let Err(err) = self.call_void("removeNmeaListener") {
            error!("failed to remove Android NMEA listener: {err}");
        }
    }
}

/// Identifies a session opened with [`create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

/// Output of a session, delivered to the host outside any lock.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// A method call finished.
    Reply {
        /// The id passed to [`method_call`].
        id: u64,
        /// Its result.
        result: MethodResult,
    },
    /// An item for the stream listener.
    Event(StreamEvent),
    /// The stream ended after an error or because it was replaced.
    EndOfStream,
}

type Deliver = Arc<dyn Fn(HostMessage) + Send + Sync>;

struct Session {
    bridge: LocationBridge<AndroidLocationPlatform>,
    deliver: Deliver,
    replies: Vec<(u64, MethodReply)>,
    stream: Option<LocationStream>,
}

impl Session {
    fn drain(&mut self) -> (Deliver, Vec<HostMessage>) {
        let mut outgoing = Vec::new();
        let mut cx = Context::from_waker(noop_waker_ref());

        self.replies.retain_mut(|(id, reply)| match reply.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                outgoing.push(HostMessage::Reply { id: *id, result });
                false
            }
            Poll::Pending => true,
        });

        if let Some(stream) = &self.stream {
            while let Some(item) = stream.try_next() {
                outgoing.push(HostMessage::Event(StreamEvent::from(item)));
            }

            if stream.is_terminated() {
                self.stream = None;
                outgoing.push(HostMessage::EndOfStream);
            }
        }

        (Arc::clone(&self.deliver), outgoing)
    }
}

/// Open a location session for `activity`.
///
/// `deliver` receives replies and stream events; it may call back into this
/// module.
///
/// # Errors
/// Returns a [`PlatformError`] if the helper cannot be loaded or created.
pub fn create<F>(
    env: &mut JNIEnv<'_>,
    activity: &JObject<'_>,
    deliver: F,
) -> Result<SessionHandle, PlatformError>
where
    F: Fn(HostMessage) + Send + Sync + 'static,
{
    let id = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    let handle = jlong::try_from(id).map_err(|_| PlatformError::new("session handles exhausted"))?;
    let platform = AndroidLocationPlatform::new(env, activity, handle)?;

    let session = Session {
        bridge: LocationBridge::new(platform),
        deliver: Arc::new(deliver),
        replies: Vec::new(),
        stream: None,
    };

    sessions()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, Arc::new(Serialized::new(session)));

    Ok(SessionHandle(id))
}

/// Close a session, stopping its provider updates.
pub fn destroy(handle: SessionHandle) {
    let session = sessions()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&handle.0);
    // Dropped outside the map lock: stopping updates calls into Java.
    drop(session);
}

/// Dispatch a method call; its result arrives as [`HostMessage::Reply`].
pub fn method_call(handle: SessionHandle, id: u64, call: MethodCall) {
    dispatch(handle.0, move |session| {
        let reply = session.bridge.handle_method_call(&call);
        session.replies.push((id, reply));
    });
}

/// Subscribe the host's stream listener.
pub fn listen(handle: SessionHandle) {
    dispatch(handle.0, |session| {
        session.stream = Some(session.bridge.listen());
    });
}

/// Unsubscribe the host's stream listener.
pub fn cancel(handle: SessionHandle) {
    dispatch(handle.0, |session| {
        session.bridge.cancel();
        session.stream = None;
    });
}

/// Relay `onRequestPermissionsResult` for the location request code.
pub fn permission_result(handle: SessionHandle, granted: bool) {
    dispatch(handle.0, move |session| {
        log_state_error(session.bridge.on_permission_result(granted));
    });
}

/// Relay `onActivityResult`. Request codes that are not ours are ignored.
pub fn activity_result(handle: SessionHandle, request_code: i32, result_code: i32) {
    let Some(purpose) = SettingsPurpose::from_request_code(request_code) else {
        return;
    };

    dispatch(handle.0, move |session| {
        log_state_error(
            session
                .bridge
                .on_resolution_result(purpose, result_code == RESULT_OK),
        );
    });
}

/// Run `action` on the session, then hand whatever it produced to the host.
///
/// Callbacks that re-enter while the session is busy, including synchronous
/// ones from the helper, are queued and run by the current owner.
fn dispatch<F>(key: u64, action: F)
where
    F: FnOnce(&mut Session) + Send + 'static,
{
    let session = sessions()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();

    let Some(session) = session else {
        error!("received Android location callback for unknown handle {key}");
        return;
    };

    session.submit(action, Session::drain, |(deliver, outgoing)| {
        for message in outgoing {
            deliver(message);
        }
    });
}

fn session_key(handle: jlong) -> u64 {
    u64::try_from(handle).unwrap_or_default()
}

fn read_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Option<String> {
    match env.get_string(value) {
        Ok(value) => Some(value.into()),
        Err(err) => {
            error!("failed to read Android string payload: {err}");
            None
        }
    }
}

fn log_state_error(result: Result<(), StateError>) {
    if let Err(err) = result {
        warn!("ignored Android location callback: {err}");
    }
}

pub(crate) extern "system" fn native_settings_result(
    _env: JNIEnv<'_>,
    _helper: JObject<'_>,
    handle: jlong,
    request_code: jint,
    status_code: jint,
) {
    let Some(purpose) = SettingsPurpose::from_request_code(request_code) else {
        warn!("settings result for unknown request code {request_code}");
        return;
    };
    let outcome = match status_code {
        STATUS_SUCCESS => SettingsOutcome::Satisfied,
        STATUS_RESOLUTION_REQUIRED => SettingsOutcome::ResolutionRequired,
        _ => SettingsOutcome::Unavailable,
    };

    dispatch(session_key(handle), move |session| {
        log_state_error(session.bridge.on_settings_checked(purpose, outcome));
    });
}

pub(crate) extern "system" fn native_location_result(
    mut env: JNIEnv<'_>,
    _helper: JObject<'_>,
    handle: jlong,
    location: JString<'_>,
) {
    let Some(json) = read_string(&mut env, &location) else {
        return;
    };
    let raw: RawLocation = match serde_json::from_str(&json) {
        Ok(raw) => raw,
        Err(err) => {
            error!("failed to parse Android location payload: {err}");
            return;
        }
    };

    dispatch(session_key(handle), move |session| {
        log_state_error(session.bridge.on_location(&raw));
    });
}

pub(crate) extern "system" fn native_nmea_message(
    mut env: JNIEnv<'_>,
    _helper: JObject<'_>,
    handle: jlong,
    message: JString<'_>,
) {
    let Some(message) = read_string(&mut env, &message) else {
        return;
    };

    dispatch(session_key(handle), move |session| {
        session.bridge.on_nmea_message(&message);
    });
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, PlatformError> {
    serde_json::to_string(value).map_err(|err| {
        error!("failed to encode location payload: {err}");
        PlatformError::new(err.to_string())
    })
}

#[allow(clippy::needless_pass_by_value)]
fn map_jni_error(err: jni::errors::Error) -> PlatformError {
    PlatformError::new(err.to_string())
}

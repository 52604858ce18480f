//! Method-channel surface: named calls with argument maps in, results out.

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use geobridge_permission::PermissionStatus;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::platform::LocationPlatform;
use crate::{LocationBridge, LocationError, LocationResult, RequestSettings, StreamItem};

/// A named invocation from the host framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name, e.g. `getLocation`.
    pub method: String,
    /// Argument map; `null` when the method takes none.
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Create a call.
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Methods understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `changeSettings`
    ChangeSettings,
    /// `getLocation`
    GetLocation,
    /// `hasPermission`
    HasPermission,
    /// `requestPermission`
    RequestPermission,
    /// `serviceEnabled`
    ServiceEnabled,
    /// `requestService`
    RequestService,
}

impl Method {
    /// Look up a method by its channel name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "changeSettings" => Self::ChangeSettings,
            "getLocation" => Self::GetLocation,
            "hasPermission" => Self::HasPermission,
            "requestPermission" => Self::RequestPermission,
            "serviceEnabled" => Self::ServiceEnabled,
            "requestService" => Self::RequestService,
            _ => return None,
        })
    }
}

/// Outcome of a method call as sent back to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResult {
    /// The call succeeded.
    Success {
        /// Result value.
        value: Value,
    },
    /// The call failed.
    Error {
        /// Stable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
    /// The method name is unknown.
    NotImplemented,
}

impl MethodResult {
    /// A successful result.
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    fn from_result<T>(result: LocationResult<T>, encode: impl FnOnce(T) -> Value) -> Self {
        match result {
            Ok(value) => Self::success(encode(value)),
            Err(err) => err.into(),
        }
    }
}

impl From<LocationError> for MethodResult {
    fn from(err: LocationError) -> Self {
        Self::Error {
            code: err.code().to_owned(),
            message: err.to_string(),
        }
    }
}

/// A method result that may still be waiting on the platform.
pub type MethodReply = BoxFuture<'static, MethodResult>;

/// A stream item as sent to the host's event channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A location fix map.
    Success {
        /// The fix.
        value: Value,
    },
    /// The error that ended the stream.
    Error {
        /// Stable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl From<StreamItem> for StreamEvent {
    fn from(item: StreamItem) -> Self {
        match item {
            Ok(fix) => Self::Success {
                value: fix.to_value(),
            },
            Err(err) => Self::Error {
                code: err.code().to_owned(),
                message: err.to_string(),
            },
        }
    }
}

fn flag(value: bool) -> Value {
    Value::from(i32::from(value))
}

fn ready(result: MethodResult) -> MethodReply {
    future::ready(result).boxed()
}

impl<P: LocationPlatform> LocationBridge<P> {
    /// Dispatch a method call.
    ///
    /// Synchronous methods return an already completed reply; the others
    /// complete once the platform reports back through the `on_*` callbacks.
    ///
    /// `requestPermission` answers `0` for a denial the app may ask about
    /// again. A permanent denial is not reported as `0` but as a
    /// `PERMISSION_DENIED_NEVER_ASK` error, so callers can send the user to
    /// the system settings instead of prompting again.
    pub fn handle_method_call(&mut self, call: &MethodCall) -> MethodReply {
        let Some(method) = Method::from_name(&call.method) else {
            debug!("method {} not implemented", call.method);
            return ready(MethodResult::NotImplemented);
        };

        match method {
            Method::ChangeSettings => {
                let result = RequestSettings::from_arguments(&call.arguments)
                    .and_then(|settings| self.change_settings(settings));
                ready(MethodResult::from_result(result, |()| Value::from(1)))
            }
            Method::GetLocation => self
                .get_location()
                .map(|result| MethodResult::from_result(result, |fix| fix.to_value()))
                .boxed(),
            Method::HasPermission => ready(MethodResult::success(flag(self.has_permission()))),
            Method::RequestPermission => self
                .request_permission()
                .map(|result| match result {
                    Ok(PermissionStatus::DeniedForever) => {
                        LocationError::PermissionDeniedForever.into()
                    }
                    other => MethodResult::from_result(other, |status| {
                        Value::from(status.as_flag())
                    }),
                })
                .boxed(),
            Method::ServiceEnabled => ready(MethodResult::from_result(self.service_enabled(), flag)),
            Method::RequestService => self
                .request_service()
                .map(|result| MethodResult::from_result(result, flag))
                .boxed(),
        }
    }
}

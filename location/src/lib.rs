//! Location services bridged to a host framework.
//!
//! [`LocationBridge`] receives method calls from application code
//! (`getLocation`, `requestPermission`, `requestService`, ...) and drives a
//! [`LocationPlatform`] through the permission prompt, the settings check and
//! continuous updates. Platform callbacks flow back in through the bridge's
//! `on_*` methods and come out as one-shot [`Reply`] values or as items on a
//! [`LocationStream`].
//!
//! ```ignore
//! use geobridge_location::{LocationBridge, MethodCall};
//! use serde_json::Value;
//!
//! let mut bridge = LocationBridge::new(platform);
//! let reply = bridge.handle_method_call(&MethodCall::new("getLocation", Value::Null));
//! // ... platform callbacks arrive through bridge.on_* ...
//! let result = reply.await;
//! ```

#![warn(missing_docs)]

mod bridge;
mod channel;
mod error;
mod fix;
pub mod nmea;
pub mod platform;
mod reply;
mod settings;
mod state;

/// Platform-specific implementations.
pub mod sys;

pub use bridge::LocationBridge;
pub use channel::{Method, MethodCall, MethodReply, MethodResult, StreamEvent};
pub use error::{LocationError, LocationResult};
pub use fix::{LocationFix, RawLocation};
pub use geobridge_permission::{Permission, PermissionStatus};
pub use platform::{
    Capabilities, LocationPlatform, PlatformError, Provider, SettingsOutcome, SettingsPurpose,
};
pub use reply::{LocationStream, Reply, StreamItem};
pub use settings::{Accuracy, Priority, RequestSettings};
pub use state::{LocationState, StateError};

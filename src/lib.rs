//! # Geobridge
//!
//! Location services for apps whose UI lives in a host framework that talks
//! to native code over named method calls and an event stream.
//!
//! Geobridge answers those calls by driving the platform's location stack:
//! the runtime permission prompt, the location settings check with its
//! "turn on location" resolution dialog, and continuous fused location
//! updates refined with NMEA mean-sea-level altitude where available.
//!
//! ## Features
//!
//! - `permission`: Runtime location permission checks and prompts.
//! - `location`: The method-channel bridge, location fixes and the fix stream.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geobridge = { version = "0.1", features = ["location"] }
//! ```
//!
//! ```rust,ignore
//! use geobridge::location::{LocationBridge, MethodCall};
//! use serde_json::Value;
//!
//! async fn locate<P: geobridge::location::LocationPlatform>(bridge: &mut LocationBridge<P>) {
//!     let reply = bridge.handle_method_call(&MethodCall::new("getLocation", Value::Null));
//!     println!("{:?}", reply.await);
//! }
//! ```

#[cfg(feature = "location")]
pub use geobridge_location as location;

#[cfg(feature = "permission")]
pub use geobridge_permission as permission;

//! Platform-specific permission implementations.

#[cfg(target_os = "android")]
pub mod android;

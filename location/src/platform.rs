//! The platform location service the bridge drives.
//!
//! Every asynchronous call here only *starts* work. Completion is reported
//! back through the matching `on_*` method of
//! [`LocationBridge`](crate::LocationBridge) on the same serialized queue.

use geobridge_permission::PermissionPlatform;
use thiserror::Error;

use crate::RequestSettings;

/// A failure raised by the platform while starting an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PlatformError {
    /// Human-readable description from the platform.
    pub message: String,
}

impl PlatformError {
    /// Create an error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Location providers whose enabled state can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Satellite positioning.
    Gps,
    /// Cell and Wi-Fi positioning.
    Network,
}

/// Why a settings check was started; echoed back with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsPurpose {
    /// Before starting location updates.
    Location,
    /// On behalf of a `requestService` call.
    Service,
}

impl SettingsPurpose {
    /// Activity request code the platform uses for the resolution prompt.
    #[must_use]
    pub const fn request_code(self) -> i32 {
        match self {
            Self::Location => 0x1,
            Self::Service => 0x1001,
        }
    }

    /// Inverse of [`SettingsPurpose::request_code`].
    #[must_use]
    pub const fn from_request_code(code: i32) -> Option<Self> {
        match code {
            0x1 => Some(Self::Location),
            0x1001 => Some(Self::Service),
            _ => None,
        }
    }
}

/// Result of asking the provider whether device settings satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsOutcome {
    /// Settings are adequate.
    Satisfied,
    /// Settings are inadequate but a user prompt can fix them.
    ResolutionRequired,
    /// Settings are inadequate and cannot be fixed from the app.
    Unavailable,
}

/// Optional platform features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    /// The platform exposes a raw NMEA sentence feed.
    pub nmea_feed: bool,
}

/// A platform location service.
///
/// Permission queries come from the [`PermissionPlatform`] supertrait so one
/// host object can answer both.
pub trait LocationPlatform: PermissionPlatform {
    /// Optional features of this platform.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Rebuild the provider request objects for new settings.
    ///
    /// # Errors
    /// Returns a [`PlatformError`] if the platform rejects the settings.
    fn configure(&mut self, settings: &RequestSettings) -> Result<(), PlatformError> {
        let _ = settings;
        Ok(())
    }

    /// Whether `provider` is enabled in the device settings.
    ///
    /// # Errors
    /// Returns a [`PlatformError`] if the status cannot be read.
    fn is_provider_enabled(&self, provider: Provider) -> Result<bool, PlatformError>;

    /// Start validating `settings` against the device settings.
    ///
    /// # Errors
    /// Returns a [`PlatformError`] if the check could not be started.
    fn check_settings(
        &mut self,
        settings: &RequestSettings,
        purpose: SettingsPurpose,
    ) -> Result<(), PlatformError>;

    /// Launch the user-facing prompt that fixes the settings found inadequate
    /// by the last check for `purpose`.
    ///
    /// # Errors
    /// Returns a [`PlatformError`] if the prompt could not be launched.
    fn start_resolution(&mut self, purpose: SettingsPurpose) -> Result<(), PlatformError>;

    /// Begin continuous fix delivery.
    ///
    /// # Errors
    /// Returns a [`PlatformError`] if updates could not be requested.
    fn request_location_updates(&mut self, settings: &RequestSettings) -> Result<(), PlatformError>;

    /// Stop fix delivery. Calling this with no active updates is harmless.
    fn remove_location_updates(&mut self);

    /// Subscribe to the raw NMEA feed.
    ///
    /// # Errors
    /// Returns a [`PlatformError`] if the listener could not be registered.
    fn add_nmea_listener(&mut self) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Unsubscribe from the raw NMEA feed.
    fn remove_nmea_listener(&mut self) {}
}

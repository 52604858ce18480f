use thiserror::Error;

/// Errors reported to method-channel callers and stream listeners.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The user denied the location permission. Asking again is allowed.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The user denied the location permission and asked not to be prompted again.
    #[error("Location permission denied forever - please open app settings")]
    PermissionDeniedForever,

    /// `changeSettings` received malformed arguments or the platform rejected them.
    #[error("An unexpected error happened during location settings change: {0}")]
    Settings(String),

    /// Whether location services are enabled could not be determined.
    #[error("Location service status couldn't be determined: {0}")]
    ServiceStatus(String),

    /// Location services are off and the platform offers no way to turn them on here.
    #[error("Failed to get location. {0}")]
    ServiceDisabled(String),

    /// A newer one-shot call replaced this one before it completed.
    #[error("Request superseded by a newer call")]
    Superseded,
}

impl LocationError {
    /// Stable error code sent across the method channel.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PermissionDeniedForever => "PERMISSION_DENIED_NEVER_ASK",
            Self::Settings(_) => "CHANGE_SETTINGS_ERROR",
            Self::ServiceStatus(_) => "SERVICE_STATUS_ERROR",
            Self::ServiceDisabled(_) => "SERVICE_STATUS_DISABLED",
            Self::Superseded => "REQUEST_SUPERSEDED",
        }
    }
}

/// Result type for location operations.
pub type LocationResult<T> = Result<T, LocationError>;

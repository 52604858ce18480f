//! Runtime permission handling for the location bridge.
//!
//! The platform side is abstracted behind [`PermissionPlatform`] so the
//! bridge can be driven by the Android activity implementation in
//! [`sys`] or by any other host that can answer the same questions.

#![warn(missing_docs)]

/// Platform-specific implementations.
pub mod sys;

/// Permissions the bridge knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Permission {
    /// Precise device location.
    FineLocation,
}

impl Permission {
    /// The platform permission string used when checking or requesting.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FineLocation => "android.permission.ACCESS_FINE_LOCATION",
        }
    }
}

/// The current status of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    /// Permission has been granted by the user.
    Granted,
    /// Permission was denied but the app may ask again.
    Denied,
    /// Permission was denied and the user asked never to be prompted again.
    /// Only the system settings screen can change this.
    DeniedForever,
}

impl PermissionStatus {
    /// Classify the answer to a permission prompt.
    ///
    /// A denial after which the platform no longer wants a rationale shown
    /// means the user picked "don't ask again".
    #[must_use]
    pub const fn from_response(granted: bool, show_rationale: bool) -> Self {
        match (granted, show_rationale) {
            (true, _) => Self::Granted,
            (false, true) => Self::Denied,
            (false, false) => Self::DeniedForever,
        }
    }

    /// Returns `true` for [`PermissionStatus::Granted`].
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    /// The integer flag reported over the method channel.
    #[must_use]
    pub const fn as_flag(self) -> i32 {
        if self.is_granted() { 1 } else { 0 }
    }
}

/// Errors that can occur when requesting permissions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The platform call failed.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Synchronous permission queries plus an asynchronous prompt.
///
/// `request` only opens the prompt; the answer arrives later through
/// whatever callback the host wires to its consumer.
pub trait PermissionPlatform {
    /// Whether this platform version asks for permissions at runtime.
    /// Install-time permission platforms always count as granted.
    fn runtime_permissions(&self) -> bool {
        true
    }

    /// Whether `permission` is currently granted.
    fn is_granted(&self, permission: Permission) -> bool;

    /// Whether the platform would show a rationale before asking again.
    fn should_show_rationale(&self, permission: Permission) -> bool;

    /// Open the platform prompt for `permission`.
    ///
    /// # Errors
    /// Returns a [`PermissionError`] if the prompt could not be shown.
    fn request(&mut self, permission: Permission) -> Result<(), PermissionError>;
}

/// Check the current status of a permission without prompting.
///
/// A permanent denial can only be told apart after a prompt, so this
/// reports either [`PermissionStatus::Granted`] or [`PermissionStatus::Denied`].
pub fn check<P>(platform: &P, permission: Permission) -> PermissionStatus
where
    P: PermissionPlatform + ?Sized,
{
    if !platform.runtime_permissions() || platform.is_granted(permission) {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        runtime: bool,
        granted: bool,
    }

    impl PermissionPlatform for Fixed {
        fn runtime_permissions(&self) -> bool {
            self.runtime
        }

        fn is_granted(&self, _permission: Permission) -> bool {
            self.granted
        }

        fn should_show_rationale(&self, _permission: Permission) -> bool {
            false
        }

        fn request(&mut self, _permission: Permission) -> Result<(), PermissionError> {
            Ok(())
        }
    }

    #[test]
    fn response_classification() {
        assert_eq!(PermissionStatus::from_response(true, false), PermissionStatus::Granted);
        assert_eq!(PermissionStatus::from_response(true, true), PermissionStatus::Granted);
        assert_eq!(PermissionStatus::from_response(false, true), PermissionStatus::Denied);
        assert_eq!(
            PermissionStatus::from_response(false, false),
            PermissionStatus::DeniedForever
        );
    }

    #[test]
    fn flags() {
        assert_eq!(PermissionStatus::Granted.as_flag(), 1);
        assert_eq!(PermissionStatus::Denied.as_flag(), 0);
        assert_eq!(PermissionStatus::DeniedForever.as_flag(), 0);
    }

    #[test]
    fn install_time_permissions_count_as_granted() {
        let platform = Fixed {
            runtime: false,
            granted: false,
        };
        assert_eq!(check(&platform, Permission::FineLocation), PermissionStatus::Granted);
    }

    #[test]
    fn runtime_check_follows_platform() {
        let denied = Fixed {
            runtime: true,
            granted: false,
        };
        assert_eq!(check(&denied, Permission::FineLocation), PermissionStatus::Denied);

        let granted = Fixed {
            runtime: true,
            granted: true,
        };
        assert_eq!(check(&granted, Permission::FineLocation), PermissionStatus::Granted);
    }

    #[test]
    fn platform_errors_keep_the_message() {
        let err = PermissionError::Platform("no activity attached".into());
        assert_eq!(err.to_string(), "platform error: no activity attached");
    }

    #[test]
    fn fine_location_string() {
        assert_eq!(
            Permission::FineLocation.as_str(),
            "android.permission.ACCESS_FINE_LOCATION"
        );
    }
}

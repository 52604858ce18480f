//! Request settings shared by every subscription and one-shot request.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{LocationError, LocationResult};

/// Accuracy levels exposed to application code, by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accuracy {
    /// Ordinal 0: only passive fixes from other apps.
    PowerSave,
    /// Ordinal 1: city-level accuracy.
    Low,
    /// Ordinal 2: block-level accuracy.
    Balanced,
    /// Ordinal 3: the most precise fixes available.
    #[default]
    High,
    /// Ordinal 4: navigation grade; the platform has no separate tier for it.
    Navigation,
}

impl Accuracy {
    /// The provider priority this accuracy maps to.
    #[must_use]
    pub const fn priority(self) -> Priority {
        match self {
            Self::PowerSave => Priority::NoPower,
            Self::Low => Priority::LowPower,
            Self::Balanced => Priority::BalancedPowerAccuracy,
            Self::High | Self::Navigation => Priority::HighAccuracy,
        }
    }
}

impl TryFrom<i64> for Accuracy {
    type Error = LocationError;

    fn try_from(ordinal: i64) -> Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(Self::PowerSave),
            1 => Ok(Self::Low),
            2 => Ok(Self::Balanced),
            3 => Ok(Self::High),
            4 => Ok(Self::Navigation),
            other => Err(LocationError::Settings(format!(
                "accuracy must be between 0 and 4, got {other}"
            ))),
        }
    }
}

/// Power/accuracy priority understood by the fused location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// No power drawn; fixes only arrive when another client requests them.
    NoPower,
    /// Low power, coarse fixes.
    LowPower,
    /// Balance between power and accuracy.
    BalancedPowerAccuracy,
    /// Highest accuracy, usually satellite backed.
    HighAccuracy,
}

impl Priority {
    /// The provider's numeric priority constant.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::HighAccuracy => 100,
            Self::BalancedPowerAccuracy => 102,
            Self::LowPower => 104,
            Self::NoPower => 105,
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Update interval, priority and displacement filter for location requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSettings {
    #[serde(skip)]
    accuracy: Accuracy,
    #[serde(rename = "interval")]
    interval_ms: u64,
    #[serde(rename = "fastestInterval")]
    fastest_interval_ms: u64,
    priority: Priority,
    #[serde(rename = "smallestDisplacement")]
    distance_filter: f32,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self::from_parts(Accuracy::High, 5000, 0.0)
    }
}

impl RequestSettings {
    /// Build validated settings.
    ///
    /// # Errors
    /// Returns [`LocationError::Settings`] if `distance_filter` is negative or
    /// not finite once narrowed to the provider's `f32`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(accuracy: Accuracy, interval_ms: u64, distance_filter: f64) -> LocationResult<Self> {
        let meters = distance_filter as f32;
        if !meters.is_finite() || meters < 0.0 {
            return Err(LocationError::Settings(format!(
                "distanceFilter must be a non-negative number of meters, got {distance_filter}"
            )));
        }

        Ok(Self::from_parts(accuracy, interval_ms, meters))
    }

    /// Parse the argument map of a `changeSettings` call.
    ///
    /// # Errors
    /// Returns [`LocationError::Settings`] for missing keys, non-numeric
    /// values or values out of range.
    pub fn from_arguments(arguments: &Value) -> LocationResult<Self> {
        let args = ChangeSettingsArgs::deserialize(arguments)
            .map_err(|err| LocationError::Settings(err.to_string()))?;

        let accuracy = Accuracy::try_from(args.accuracy)?;
        let interval_ms = u64::try_from(args.interval).map_err(|_| {
            LocationError::Settings(format!(
                "interval must be a non-negative number of milliseconds, got {}",
                args.interval
            ))
        })?;

        Self::new(accuracy, interval_ms, args.distance_filter)
    }

    const fn from_parts(accuracy: Accuracy, interval_ms: u64, distance_filter: f32) -> Self {
        Self {
            accuracy,
            interval_ms,
            fastest_interval_ms: interval_ms / 2,
            priority: accuracy.priority(),
            distance_filter,
        }
    }

    /// The accuracy level these settings were built from.
    #[must_use]
    pub const fn accuracy(&self) -> Accuracy {
        self.accuracy
    }

    /// Desired update interval in milliseconds.
    #[must_use]
    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Fastest accepted update interval, half the desired one.
    #[must_use]
    pub const fn fastest_interval_ms(&self) -> u64 {
        self.fastest_interval_ms
    }

    /// Provider priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Minimum displacement between fixes, in meters.
    #[must_use]
    pub const fn distance_filter(&self) -> f32 {
        self.distance_filter
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeSettingsArgs {
    accuracy: i64,
    interval: i64,
    distance_filter: f64,
}

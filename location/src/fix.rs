use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A location sample as reported by the platform provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f32,
    /// Altitude above the WGS84 ellipsoid in meters.
    pub altitude: f64,
    /// Ground speed in meters per second.
    pub speed: f32,
    /// Speed accuracy in meters per second, on platforms that report it.
    #[serde(default)]
    pub speed_accuracy: Option<f32>,
    /// Bearing in degrees.
    pub bearing: f32,
    /// Fix time as Unix epoch milliseconds.
    pub time: i64,
}

/// A single position fix delivered to callers.
///
/// Serializes to the key/value map of the method channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
    /// Altitude in meters; above mean sea level when a GGA sentence has been
    /// seen, otherwise above the ellipsoid.
    pub altitude: f64,
    /// Speed in meters per second.
    pub speed: f64,
    /// Speed accuracy in meters per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_accuracy: Option<f64>,
    /// Heading in degrees.
    pub heading: f64,
    /// Fix time as Unix epoch milliseconds.
    pub time: f64,
}

impl LocationFix {
    /// Convert a raw sample, substituting the sea-level altitude when known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_raw(raw: &RawLocation, sea_level_altitude: Option<f64>) -> Self {
        Self {
            latitude: raw.latitude,
            longitude: raw.longitude,
            accuracy: f64::from(raw.accuracy),
            altitude: sea_level_altitude.unwrap_or(raw.altitude),
            speed: f64::from(raw.speed),
            speed_accuracy: raw.speed_accuracy.map(f64::from),
            heading: f64::from(raw.bearing),
            time: raw.time as f64,
        }
    }

    /// The method-channel map for this fix.
    #[must_use]
    pub fn to_value(&self) -> Value {
        // Only numeric fields; serializing into a `Value` cannot fail.
        serde_json::to_value(self).unwrap_or_default()
    }
}

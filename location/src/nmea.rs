//! Sea-level altitude from raw NMEA GGA sentences.
//!
//! Fused fixes report altitude above the WGS84 ellipsoid. GGA sentences
//! carry the altitude above mean sea level in field 9, e.g.
//! `$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47`.

/// Index of the mean-sea-level altitude field in a GGA sentence.
const GGA_ALTITUDE_FIELD: usize = 9;

/// Extract the mean-sea-level altitude from a GGA sentence.
///
/// Accepts any talker (`$GPGGA`, `$GNGGA`, ...). Returns `None` for other
/// sentence types, an empty altitude field or an unparsable value.
#[must_use]
pub fn parse_sea_level_altitude(sentence: &str) -> Option<f64> {
    let sentence = sentence.trim_end();
    let body = sentence.strip_prefix('$')?;
    let mut fields = body.split(',');

    let kind = fields.next()?;
    if kind.len() != 5 || !kind.ends_with("GGA") {
        return None;
    }

    let altitude = fields.nth(GGA_ALTITUDE_FIELD - 1)?;
    let altitude = altitude.split('*').next().unwrap_or(altitude);
    if altitude.is_empty() {
        return None;
    }

    altitude.parse().ok().filter(|value: &f64| value.is_finite())
}

/// Last sea-level altitude observed on the sentence feed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeaLevelAltitude {
    last: Option<f64>,
}

impl SeaLevelAltitude {
    /// Feed one sentence. Anything that is not a GGA sentence with an
    /// altitude leaves the cached value untouched.
    pub fn observe(&mut self, sentence: &str) {
        if let Some(altitude) = parse_sea_level_altitude(sentence) {
            self.last = Some(altitude);
        }
    }

    /// The most recent sea-level altitude, if any sentence carried one.
    #[must_use]
    pub const fn get(&self) -> Option<f64> {
        self.last
    }
}

//! A scripted platform that records every call the bridge makes.

#![allow(dead_code)]

use geobridge_location::{
    Capabilities, LocationPlatform, PlatformError, Provider, RawLocation, RequestSettings,
    SettingsPurpose,
};
use geobridge_permission::{Permission, PermissionError, PermissionPlatform};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RequestPermission,
    Configure(RequestSettings),
    CheckSettings(SettingsPurpose),
    StartResolution(SettingsPurpose),
    RequestUpdates,
    RemoveUpdates,
    AddNmea,
    RemoveNmea,
}

#[derive(Debug)]
pub struct FakePlatform {
    pub granted: bool,
    pub rationale: bool,
    pub gps: Result<bool, PlatformError>,
    pub network: Result<bool, PlatformError>,
    pub nmea_feed: bool,
    pub fail_configure: bool,
    pub fail_resolution: bool,
    pub fail_updates: bool,
    pub calls: Vec<Call>,
}

impl FakePlatform {
    /// Permission granted, both providers on.
    pub fn ready() -> Self {
        Self {
            granted: true,
            gps: Ok(true),
            network: Ok(true),
            ..Self::default()
        }
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            granted: false,
            rationale: false,
            gps: Ok(false),
            network: Ok(false),
            nmea_feed: false,
            fail_configure: false,
            fail_resolution: false,
            fail_updates: false,
            calls: Vec::new(),
        }
    }
}

impl PermissionPlatform for FakePlatform {
    fn is_granted(&self, _permission: Permission) -> bool {
        self.granted
    }

    fn should_show_rationale(&self, _permission: Permission) -> bool {
        self.rationale
    }

    fn request(&mut self, _permission: Permission) -> Result<(), PermissionError> {
        self.calls.push(Call::RequestPermission);
        Ok(())
    }
}

impl LocationPlatform for FakePlatform {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            nmea_feed: self.nmea_feed,
        }
    }

    fn configure(&mut self, settings: &RequestSettings) -> Result<(), PlatformError> {
        if self.fail_configure {
            return Err(PlatformError::new("request rejected by provider"));
        }
        self.calls.push(Call::Configure(settings.clone()));
        Ok(())
    }

    fn is_provider_enabled(&self, provider: Provider) -> Result<bool, PlatformError> {
        match provider {
            Provider::Gps => self.gps.clone(),
            Provider::Network => self.network.clone(),
        }
    }

    fn check_settings(
        &mut self,
        _settings: &RequestSettings,
        purpose: SettingsPurpose,
    ) -> Result<(), PlatformError> {
        self.calls.push(Call::CheckSettings(purpose));
        Ok(())
    }

    fn start_resolution(&mut self, purpose: SettingsPurpose) -> Result<(), PlatformError> {
        if self.fail_resolution {
            return Err(PlatformError::new("no activity to host the prompt"));
        }
        self.calls.push(Call::StartResolution(purpose));
        Ok(())
    }

    fn request_location_updates(&mut self, _settings: &RequestSettings) -> Result<(), PlatformError> {
        if self.fail_updates {
            return Err(PlatformError::new("provider unavailable"));
        }
        self.calls.push(Call::RequestUpdates);
        Ok(())
    }

    fn remove_location_updates(&mut self) {
        self.calls.push(Call::RemoveUpdates);
    }

    fn add_nmea_listener(&mut self) -> Result<(), PlatformError> {
        self.calls.push(Call::AddNmea);
        Ok(())
    }

    fn remove_nmea_listener(&mut self) {
        self.calls.push(Call::RemoveNmea);
    }
}

pub fn raw_fix(latitude: f64, longitude: f64) -> RawLocation {
    RawLocation {
        latitude,
        longitude,
        accuracy: 4.0,
        altitude: 120.0,
        speed: 1.5,
        speed_accuracy: Some(0.5),
        bearing: 90.0,
        time: 1_700_000_000_000,
    }
}

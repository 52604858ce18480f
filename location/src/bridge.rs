use std::fmt;

use geobridge_permission::{Permission, PermissionError, PermissionStatus};
use log::{debug, error, info, warn};

use crate::nmea::SeaLevelAltitude;
use crate::platform::{LocationPlatform, Provider, SettingsOutcome, SettingsPurpose};
use crate::reply::{EventSink, Responder};
use crate::{
    LocationError, LocationFix, LocationResult, LocationState, LocationStream, RawLocation, Reply,
    RequestSettings, StateError,
};

const SETTINGS_INADEQUATE: &str =
    "Location settings are inadequate, and cannot be fixed here. Fix in Settings.";
const SERVICES_DISABLED: &str = "Location services disabled";
const RESOLUTION_FAILED: &str = "The location settings prompt could not be shown";

/// The single outstanding one-shot call.
enum Pending {
    Location(Responder<LocationFix>),
    Permission(Responder<PermissionStatus>),
    Service {
        responder: Responder<bool>,
        awaiting_resolution: bool,
    },
}

impl Pending {
    const fn name(&self) -> &'static str {
        match self {
            Self::Location(_) => "getLocation",
            Self::Permission(_) => "requestPermission",
            Self::Service { .. } => "requestService",
        }
    }
}

/// Mediates between method-channel callers and a platform location service.
///
/// Every call and every platform callback goes through `&mut self`, which is
/// how the host's single serialized callback queue shows up here. The bridge
/// holds at most one pending one-shot call and at most one stream listener;
/// both are fed by the same provider subscription.
pub struct LocationBridge<P: LocationPlatform> {
    platform: P,
    settings: RequestSettings,
    state: LocationState,
    pending: Option<Pending>,
    sink: Option<EventSink>,
    permission_prompt_open: bool,
    nmea_listening: bool,
    altitude: SeaLevelAltitude,
}

impl<P: LocationPlatform> fmt::Debug for LocationBridge<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationBridge")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("pending", &self.pending.as_ref().map(Pending::name))
            .field("listener", &self.sink.as_ref().map(EventSink::id))
            .field("permission_prompt_open", &self.permission_prompt_open)
            .finish_non_exhaustive()
    }
}

impl<P: LocationPlatform> LocationBridge<P> {
    /// Create a bridge over `platform` with default request settings.
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            settings: RequestSettings::default(),
            state: LocationState::Idle,
            pending: None,
            sink: None,
            permission_prompt_open: false,
            nmea_listening: false,
            altitude: SeaLevelAltitude::default(),
        }
    }

    /// The platform this bridge drives.
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutable access to the platform.
    pub const fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Settings used by the next settings check and update request.
    pub const fn settings(&self) -> &RequestSettings {
        &self.settings
    }

    /// Current pipeline state.
    pub const fn state(&self) -> LocationState {
        self.state
    }

    /// Whether a stream listener is attached.
    pub const fn is_listening(&self) -> bool {
        self.sink.is_some()
    }

    /// Whether a one-shot call is outstanding.
    pub const fn has_pending_call(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace the request settings.
    ///
    /// Updates already running keep their old settings until restarted.
    ///
    /// # Errors
    /// Returns [`LocationError::Settings`] if the platform rejects them.
    pub fn change_settings(&mut self, settings: RequestSettings) -> LocationResult<()> {
        self.platform
            .configure(&settings)
            .map_err(|err| LocationError::Settings(err.message))?;
        info!(
            "location settings changed: interval {} ms, {:?}, {} m",
            settings.interval_ms(),
            settings.priority(),
            settings.distance_filter()
        );
        self.settings = settings;
        Ok(())
    }

    /// Whether location permission is granted right now.
    pub fn has_permission(&self) -> bool {
        geobridge_permission::check(&self.platform, Permission::FineLocation).is_granted()
    }

    /// Ask for location permission, prompting only if it is not yet granted.
    pub fn request_permission(&mut self) -> Reply<PermissionStatus> {
        if self.has_permission() {
            return Reply::ready(Ok(PermissionStatus::Granted));
        }

        let (responder, reply) = Reply::channel();
        self.replace_pending(Pending::Permission(responder));
        if let Err(err) = self.open_permission_prompt() {
            error!("could not open the location permission prompt: {err}");
            if let Some(responder) = self.take_permission_responder() {
                responder.send(Err(LocationError::PermissionDenied));
            }
        }
        reply
    }

    /// Resolve the current position once.
    ///
    /// Prompts for permission and validates settings first when needed.
    pub fn get_location(&mut self) -> Reply<LocationFix> {
        let (responder, reply) = Reply::channel();
        self.replace_pending(Pending::Location(responder));
        self.start_pipeline();
        reply
    }

    /// Subscribe to position updates, replacing any previous listener.
    pub fn listen(&mut self) -> LocationStream {
        let (sink, stream) = LocationStream::channel();
        if let Some(previous) = self.sink.replace(sink) {
            debug!("location listener {} replaced", previous.id());
        }
        self.start_pipeline();
        stream
    }

    /// Detach the stream listener and stop provider updates.
    ///
    /// A pending `getLocation` keeps the pipeline alive until its fix
    /// arrives. Calling this with no listener is harmless.
    pub fn cancel(&mut self) {
        if let Some(sink) = self.sink.take() {
            debug!("location listener {} cancelled", sink.id());
        }

        if matches!(self.pending, Some(Pending::Location(_))) {
            return;
        }

        self.stop_updates();
        self.reset();
    }

    /// Whether the satellite or the network provider is enabled.
    ///
    /// # Errors
    /// Returns [`LocationError::ServiceStatus`] if either check fails.
    pub fn service_enabled(&self) -> LocationResult<bool> {
        let status = |provider| {
            self.platform
                .is_provider_enabled(provider)
                .map_err(|err| LocationError::ServiceStatus(err.message))
        };

        let gps = status(Provider::Gps)?;
        let network = status(Provider::Network)?;
        Ok(gps || network)
    }

    /// Ask the platform to enable location services if they are off.
    pub fn request_service(&mut self) -> Reply<bool> {
        match self.service_enabled() {
            Ok(true) => return Reply::ready(Ok(true)),
            Ok(false) => {}
            Err(err) => return Reply::ready(Err(err)),
        }

        let (responder, reply) = Reply::channel();
        match self
            .platform
            .check_settings(&self.settings, SettingsPurpose::Service)
        {
            Ok(()) => self.replace_pending(Pending::Service {
                responder,
                awaiting_resolution: false,
            }),
            Err(err) => responder.send(Err(LocationError::ServiceStatus(err.message))),
        }
        reply
    }

    /// Platform callback: the user answered the permission prompt.
    ///
    /// # Errors
    /// Returns [`StateError::Unexpected`] if no prompt was open.
    pub fn on_permission_result(&mut self, granted: bool) -> Result<(), StateError> {
        if !self.permission_prompt_open {
            return Err(self.unexpected("permission result"));
        }
        self.permission_prompt_open = false;

        let status = PermissionStatus::from_response(
            granted,
            !granted && self.platform.should_show_rationale(Permission::FineLocation),
        );
        info!("location permission answered: {status:?}");

        if let Some(responder) = self.take_permission_responder() {
            responder.send(Ok(status));
        }

        if self.state != LocationState::PermissionRequested {
            return Ok(());
        }

        match status {
            PermissionStatus::Granted => self.begin_settings_check(),
            PermissionStatus::Denied => self.fail_pipeline(&LocationError::PermissionDenied),
            PermissionStatus::DeniedForever => {
                self.fail_pipeline(&LocationError::PermissionDeniedForever);
            }
        }
        Ok(())
    }

    /// Platform callback: a settings check started for `purpose` finished.
    ///
    /// # Errors
    /// Returns [`StateError::Unexpected`] if no check for `purpose` is running.
    pub fn on_settings_checked(
        &mut self,
        purpose: SettingsPurpose,
        outcome: SettingsOutcome,
    ) -> Result<(), StateError> {
        match purpose {
            SettingsPurpose::Location => {
                if self.state != LocationState::SettingsChecking {
                    return Err(self.unexpected("settings result"));
                }

                match outcome {
                    SettingsOutcome::Satisfied => self.start_updates(),
                    SettingsOutcome::ResolutionRequired => self.begin_resolution(),
                    SettingsOutcome::Unavailable => {
                        error!("{SETTINGS_INADEQUATE}");
                        self.fail_pipeline(&LocationError::ServiceDisabled(
                            SETTINGS_INADEQUATE.into(),
                        ));
                    }
                }
            }
            SettingsPurpose::Service => {
                let Some(responder) = self.take_service_responder(false) else {
                    return Err(self.unexpected("service settings result"));
                };

                match outcome {
                    SettingsOutcome::Satisfied => responder.send(Ok(true)),
                    SettingsOutcome::ResolutionRequired => {
                        match self.platform.start_resolution(SettingsPurpose::Service) {
                            Ok(()) => {
                                self.pending = Some(Pending::Service {
                                    responder,
                                    awaiting_resolution: true,
                                });
                            }
                            Err(err) => {
                                warn!("location settings prompt unable to execute request: {err}");
                                responder
                                    .send(Err(LocationError::ServiceDisabled(RESOLUTION_FAILED.into())));
                            }
                        }
                    }
                    SettingsOutcome::Unavailable => {
                        responder.send(Err(LocationError::ServiceDisabled(SERVICES_DISABLED.into())));
                    }
                }
            }
        }
        Ok(())
    }

    /// Platform callback: the user closed the settings resolution prompt.
    ///
    /// # Errors
    /// Returns [`StateError::Unexpected`] if no prompt for `purpose` was shown.
    pub fn on_resolution_result(
        &mut self,
        purpose: SettingsPurpose,
        accepted: bool,
    ) -> Result<(), StateError> {
        match purpose {
            SettingsPurpose::Location => {
                if self.state != LocationState::ResolutionPending {
                    return Err(self.unexpected("resolution result"));
                }

                if accepted {
                    self.begin_settings_check();
                } else {
                    info!("location settings prompt dismissed");
                    self.fail_pipeline(&LocationError::ServiceDisabled(SERVICES_DISABLED.into()));
                }
            }
            SettingsPurpose::Service => {
                let Some(responder) = self.take_service_responder(true) else {
                    return Err(self.unexpected("service resolution result"));
                };

                if accepted {
                    responder.send(Ok(true));
                } else {
                    info!("location service prompt dismissed");
                    responder.send(Err(LocationError::ServiceDisabled(SERVICES_DISABLED.into())));
                }
            }
        }
        Ok(())
    }

    /// Platform callback: the provider delivered a fix.
    ///
    /// The fix completes a pending `getLocation` and goes out on the stream.
    /// With nobody left to receive fixes, provider updates stop.
    ///
    /// # Errors
    /// Returns [`StateError::Unexpected`] if the pipeline is not streaming; the
    /// provider is told to stop in that case too.
    pub fn on_location(&mut self, raw: &RawLocation) -> Result<(), StateError> {
        if self.state != LocationState::Streaming {
            self.platform.remove_location_updates();
            return Err(self.unexpected("location fix"));
        }

        let sea_level = self
            .platform
            .capabilities()
            .nmea_feed
            .then(|| self.altitude.get())
            .flatten();
        let fix = LocationFix::from_raw(raw, sea_level);

        if let Some(responder) = self.take_location_responder() {
            responder.send(Ok(fix.clone()));
        }

        let delivered = self.sink.as_ref().is_some_and(|sink| sink.send(Ok(fix)));
        if !delivered {
            if let Some(sink) = self.sink.take() {
                debug!("location listener {} went away", sink.id());
            }
            self.stop_updates();
            self.reset();
        }
        Ok(())
    }

    /// Platform callback: a raw NMEA sentence arrived.
    pub fn on_nmea_message(&mut self, sentence: &str) {
        self.altitude.observe(sentence);
    }

    fn start_pipeline(&mut self) {
        if self.state != LocationState::Idle {
            return;
        }

        if self.has_permission() {
            self.begin_settings_check();
        } else {
            self.begin_permission_request();
        }
    }

    fn begin_permission_request(&mut self) {
        if let Err(err) = self.transition(LocationState::PermissionRequested) {
            error!("{err}");
            return;
        }

        if let Err(err) = self.open_permission_prompt() {
            error!("could not open the location permission prompt: {err}");
            self.fail_pipeline(&LocationError::PermissionDenied);
        }
    }

    fn open_permission_prompt(&mut self) -> Result<(), PermissionError> {
        if self.permission_prompt_open {
            return Ok(());
        }

        self.platform.request(Permission::FineLocation)?;
        self.permission_prompt_open = true;
        Ok(())
    }

    fn begin_settings_check(&mut self) {
        if let Err(err) = self.transition(LocationState::SettingsChecking) {
            error!("{err}");
            return;
        }

        if let Err(err) = self
            .platform
            .check_settings(&self.settings, SettingsPurpose::Location)
        {
            self.fail_pipeline(&LocationError::ServiceStatus(err.message));
        }
    }

    fn begin_resolution(&mut self) {
        match self.platform.start_resolution(SettingsPurpose::Location) {
            Ok(()) => {
                if let Err(err) = self.transition(LocationState::ResolutionPending) {
                    error!("{err}");
                }
            }
            Err(err) => {
                warn!("location settings prompt unable to execute request: {err}");
                self.fail_pipeline(&LocationError::ServiceDisabled(RESOLUTION_FAILED.into()));
            }
        }
    }

    fn start_updates(&mut self) {
        if self.platform.capabilities().nmea_feed && !self.nmea_listening {
            match self.platform.add_nmea_listener() {
                Ok(()) => self.nmea_listening = true,
                Err(err) => warn!("NMEA listener unavailable, using ellipsoidal altitude: {err}"),
            }
        }

        if let Err(err) = self.platform.request_location_updates(&self.settings) {
            self.fail_pipeline(&LocationError::ServiceStatus(err.message));
            return;
        }

        if let Err(err) = self.transition(LocationState::Streaming) {
            error!("{err}");
        }
    }

    fn stop_updates(&mut self) {
        if self.state == LocationState::Streaming {
            self.platform.remove_location_updates();
        }

        if self.nmea_listening {
            self.platform.remove_nmea_listener();
            self.nmea_listening = false;
        }
    }

    /// Deliver `error` to every consumer of the pipeline and go idle.
    fn fail_pipeline(&mut self, error: &LocationError) {
        debug!("location pipeline failed in {:?}: {error}", self.state);

        if let Some(responder) = self.take_location_responder() {
            responder.send(Err(error.clone()));
        }

        if let Some(sink) = self.sink.take() {
            sink.send(Err(error.clone()));
        }

        self.stop_updates();
        self.reset();
    }

    fn transition(&mut self, next: LocationState) -> Result<(), StateError> {
        if !self.state.can_transition_to(next) {
            return Err(StateError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }

        debug!("location state {:?} -> {next:?}", self.state);
        self.state = next;
        Ok(())
    }

    fn reset(&mut self) {
        if self.state != LocationState::Idle {
            debug!("location state {:?} -> Idle", self.state);
            self.state = LocationState::Idle;
        }
    }

    const fn unexpected(&self, event: &'static str) -> StateError {
        StateError::Unexpected {
            event,
            state: self.state,
        }
    }

    fn replace_pending(&mut self, pending: Pending) {
        if let Some(previous) = self.pending.replace(pending) {
            debug!("pending {} superseded", previous.name());
        }
    }

    fn take_location_responder(&mut self) -> Option<Responder<LocationFix>> {
        match self.pending.take() {
            Some(Pending::Location(responder)) => Some(responder),
            other => {
                self.pending = other;
                None
            }
        }
    }

    fn take_permission_responder(&mut self) -> Option<Responder<PermissionStatus>> {
        match self.pending.take() {
            Some(Pending::Permission(responder)) => Some(responder),
            other => {
                self.pending = other;
                None
            }
        }
    }

    fn take_service_responder(&mut self, resolving: bool) -> Option<Responder<bool>> {
        match self.pending.take() {
            Some(Pending::Service {
                responder,
                awaiting_resolution,
            }) if awaiting_resolution == resolving => Some(responder),
            other => {
                self.pending = other;
                None
            }
        }
    }
}

impl<P: LocationPlatform> Drop for LocationBridge<P> {
    fn drop(&mut self) {
        self.stop_updates();
    }
}

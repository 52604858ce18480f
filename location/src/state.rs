//! States of the permission → settings → streaming pipeline.

use thiserror::Error;

/// Where the location pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LocationState {
    /// No pipeline work in progress.
    #[default]
    Idle,
    /// Waiting for the user to answer the permission prompt.
    PermissionRequested,
    /// Waiting for the provider to validate the request settings.
    SettingsChecking,
    /// Waiting for the user to answer the settings resolution prompt.
    ResolutionPending,
    /// Provider updates are registered and fixes are flowing.
    Streaming,
}

impl LocationState {
    /// Whether the pipeline may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use LocationState::{
            Idle, PermissionRequested, ResolutionPending, SettingsChecking, Streaming,
        };

        matches!(
            (self, next),
            (Idle, PermissionRequested | SettingsChecking)
                | (PermissionRequested, SettingsChecking | Idle)
                | (SettingsChecking, Streaming | ResolutionPending | Idle)
                | (ResolutionPending, SettingsChecking | Idle)
                | (Streaming, Idle)
        )
    }
}

/// A platform callback or transition the pipeline cannot accept right now.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// The transition table forbids moving between these states.
    #[error("illegal transition from {from:?} to {to:?}")]
    IllegalTransition {
        /// Current state.
        from: LocationState,
        /// Requested state.
        to: LocationState,
    },
    /// A callback arrived that nothing is waiting for.
    #[error("unexpected {event} while {state:?}")]
    Unexpected {
        /// Which callback arrived.
        event: &'static str,
        /// State at the time.
        state: LocationState,
    },
}

#[cfg(test)]
mod tests {
    use super::LocationState::*;
    use super::*;

    const ALL: [LocationState; 5] = [
        Idle,
        PermissionRequested,
        SettingsChecking,
        ResolutionPending,
        Streaming,
    ];

    #[test]
    fn no_self_transitions() {
        for state in ALL {
            assert!(!state.can_transition_to(state), "{state:?}");
        }
    }

    #[test]
    fn every_state_can_return_to_idle() {
        for state in ALL.into_iter().filter(|state| *state != Idle) {
            assert!(state.can_transition_to(Idle), "{state:?}");
        }
    }

    #[test]
    fn streaming_requires_a_settings_check() {
        for state in ALL {
            assert_eq!(
                state.can_transition_to(Streaming),
                state == SettingsChecking,
                "{state:?}"
            );
        }
    }

    #[test]
    fn permission_is_only_requested_from_idle() {
        for state in ALL {
            assert_eq!(
                state.can_transition_to(PermissionRequested),
                state == Idle,
                "{state:?}"
            );
        }
    }
}

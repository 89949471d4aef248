use thiserror::Error;

use crate::core::phase::{LifecycleState, Phase};

/// Unified error type for the entire Trellis library
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A user hook raised an error while its phase was firing
    #[error("Hook failed during {phase} on '{instance}': {error}")]
    Hook {
        phase: Phase,
        instance: String,
        error: anyhow::Error,
    },

    /// An event subscriber raised an error during emission
    #[error("Subscriber failed for '{event}' on '{instance}': {error}")]
    Subscriber {
        event: String,
        instance: String,
        error: anyhow::Error,
    },

    /// A phase was fired on an instance that already reached its terminal state
    #[error("Phase {phase} fired on torn-down instance '{instance}'")]
    TornDown { phase: Phase, instance: String },

    /// A phase was fired out of order for the instance's current state
    #[error("Invalid transition: {phase} cannot fire on '{instance}' in state {state}")]
    InvalidTransition {
        phase: Phase,
        state: LifecycleState,
        instance: String,
    },

    /// A phase was fired while another phase was still on the call stack
    #[error("Re-entrant {phase} on '{instance}' while {current} is still firing")]
    Reentrant {
        phase: Phase,
        current: Phase,
        instance: String,
    },

    /// A template referenced a component name with no registered class
    #[error("Unknown component '{component}' in template of '{instance}'")]
    UnknownComponent { component: String, instance: String },

    /// An instance id did not resolve to a live tree node
    #[error("No instance with id {id}")]
    MissingInstance { id: usize },

    /// One or more failures were collected while draining a phase traversal
    #[error("{failed} failure(s) while draining {phase} across the tree")]
    Drained {
        phase: Phase,
        failed: usize,
        #[source]
        first: Box<LifecycleError>,
    },
}

impl LifecycleError {
    /// Create a hook error
    pub fn hook(phase: Phase, instance: impl Into<String>, error: anyhow::Error) -> Self {
        Self::Hook {
            phase,
            instance: instance.into(),
            error,
        }
    }

    /// Create a subscriber error
    pub fn subscriber(
        event: impl Into<String>,
        instance: impl Into<String>,
        error: anyhow::Error,
    ) -> Self {
        Self::Subscriber {
            event: event.into(),
            instance: instance.into(),
            error,
        }
    }

    /// Create a torn-down re-fire error
    pub fn torn_down(phase: Phase, instance: impl Into<String>) -> Self {
        Self::TornDown {
            phase,
            instance: instance.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(
        phase: Phase,
        state: LifecycleState,
        instance: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            phase,
            state,
            instance: instance.into(),
        }
    }

    /// Create a re-entrancy error
    pub fn reentrant(phase: Phase, current: Phase, instance: impl Into<String>) -> Self {
        Self::Reentrant {
            phase,
            current,
            instance: instance.into(),
        }
    }

    /// Create an unknown component error
    pub fn unknown_component(component: impl Into<String>, instance: impl Into<String>) -> Self {
        Self::UnknownComponent {
            component: component.into(),
            instance: instance.into(),
        }
    }

    /// Create a missing instance error
    pub fn missing_instance(id: usize) -> Self {
        Self::MissingInstance { id }
    }

    /// Wrap the failures collected by a drained traversal; `errors` must be
    /// non-empty and the first entry becomes the source.
    pub fn drained(phase: Phase, mut errors: Vec<LifecycleError>) -> Self {
        let failed = errors.len();
        Self::Drained {
            phase,
            failed,
            first: Box::new(errors.remove(0)),
        }
    }

    /// Phase the error occurred in, where one applies.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Hook { phase, .. }
            | Self::TornDown { phase, .. }
            | Self::InvalidTransition { phase, .. }
            | Self::Reentrant { phase, .. }
            | Self::Drained { phase, .. } => Some(*phase),
            Self::Subscriber { .. } | Self::UnknownComponent { .. } | Self::MissingInstance { .. } => {
                None
            }
        }
    }

    /// Fatal errors terminate the instance they name; everything else is
    /// collected and surfaced after the traversal drains.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TornDown { .. } | Self::Reentrant { .. } | Self::MissingInstance { .. }
        )
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Hook { .. } => "hook",
            Self::Subscriber { .. } => "subscriber",
            Self::TornDown { .. } => "torndown",
            Self::InvalidTransition { .. } => "transition",
            Self::Reentrant { .. } => "reentrant",
            Self::UnknownComponent { .. } => "component",
            Self::MissingInstance { .. } => "instance",
            Self::Drained { .. } => "drained",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Macro for creating errors with less ceremony
#[macro_export]
macro_rules! lifecycle_error {
    (hook, $phase:expr, $instance:expr, $error:expr) => {
        $crate::LifecycleError::hook($phase, $instance, $error)
    };
    (torn_down, $phase:expr, $instance:expr) => {
        $crate::LifecycleError::torn_down($phase, $instance)
    };
    (component, $component:expr, $instance:expr) => {
        $crate::LifecycleError::unknown_component($component, $instance)
    };
}

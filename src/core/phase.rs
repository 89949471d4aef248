//! Lifecycle phases and the per-instance state machine
//!
//! Phases are a closed enumeration; hook chains and event names are resolved
//! against these variants rather than by runtime name lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One named point in a component's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Construct,
    Config,
    Init,
    Render,
    Complete,
    Unrender,
    Teardown,
}

/// Traversal direction of a phase across the composition tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Ancestor fires before any descendant.
    TopDown,
    /// Every descendant fires before its parent.
    BottomUp,
}

impl Phase {
    /// All phases, in the order a normal lifetime fires them.
    pub const ALL: [Phase; 7] = [
        Phase::Construct,
        Phase::Config,
        Phase::Init,
        Phase::Render,
        Phase::Complete,
        Phase::Unrender,
        Phase::Teardown,
    ];

    /// Name of the event emitted on the instance bus when this phase fires.
    pub fn event_name(&self) -> &'static str {
        match self {
            Phase::Construct => "construct",
            Phase::Config => "config",
            Phase::Init => "init",
            Phase::Render => "render",
            Phase::Complete => "complete",
            Phase::Unrender => "unrender",
            Phase::Teardown => "teardown",
        }
    }

    /// Configuration key under which a hook for this phase is declared.
    pub fn option_key(&self) -> &'static str {
        match self {
            Phase::Construct => "onconstruct",
            Phase::Config => "onconfig",
            Phase::Init => "oninit",
            Phase::Render => "onrender",
            Phase::Complete => "oncomplete",
            Phase::Unrender => "onunrender",
            Phase::Teardown => "onteardown",
        }
    }

    /// Tree traversal direction for this phase.
    ///
    /// COMPLETE is driven bottom-up but settlement across siblings is gated by
    /// the transition engine, so only its firing count is guaranteed tree-wide.
    pub fn direction(&self) -> Direction {
        match self {
            Phase::Construct | Phase::Config | Phase::Init | Phase::Render => Direction::TopDown,
            Phase::Complete | Phase::Unrender | Phase::Teardown => Direction::BottomUp,
        }
    }

    /// State an instance enters once this phase has fired.
    pub fn entered_state(&self) -> LifecycleState {
        match self {
            Phase::Construct => LifecycleState::Constructed,
            Phase::Config => LifecycleState::Configured,
            Phase::Init => LifecycleState::Initialized,
            Phase::Render => LifecycleState::Rendered,
            Phase::Complete => LifecycleState::Completed,
            Phase::Unrender => LifecycleState::Unrendered,
            Phase::Teardown => LifecycleState::TornDown,
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Lifecycle state of a live instance.
///
/// `TornDown` is terminal: firing any further phase on a torn-down instance
/// is a fatal, reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LifecycleState {
    Unconstructed,
    Constructed,
    Configured,
    Initialized,
    Rendered,
    Completed,
    Unrendered,
    TornDown,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::TornDown)
    }

    /// Whether `phase` may fire on an instance currently in this state.
    ///
    /// TEARDOWN is accepted from any constructed, not-yet-torn-down state so
    /// that an instance cancelled mid-render still reaches `TornDown`; the
    /// phases it never entered (COMPLETE, UNRENDER) are simply skipped.
    pub fn can_enter(&self, phase: Phase) -> bool {
        match phase {
            Phase::Construct => *self == LifecycleState::Unconstructed,
            Phase::Config => *self == LifecycleState::Constructed,
            Phase::Init => *self == LifecycleState::Configured,
            Phase::Render => *self == LifecycleState::Initialized,
            Phase::Complete => *self == LifecycleState::Rendered,
            Phase::Unrender => {
                matches!(self, LifecycleState::Rendered | LifecycleState::Completed)
            }
            Phase::Teardown => {
                *self >= LifecycleState::Constructed && !self.is_terminal()
            }
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unconstructed => "unconstructed",
            LifecycleState::Constructed => "constructed",
            LifecycleState::Configured => "configured",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Rendered => "rendered",
            LifecycleState::Completed => "completed",
            LifecycleState::Unrendered => "unrendered",
            LifecycleState::TornDown => "torndown",
        };
        f.write_str(name)
    }
}

/// Dense per-phase storage, indexed by [`Phase`].
#[derive(Debug, Clone)]
pub struct PhaseMap<T>([T; 7]);

impl<T> PhaseMap<T> {
    /// Iterate entries in phase order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, &T)> {
        Phase::ALL.iter().map(move |p| (*p, &self.0[p.index()]))
    }
}

impl<T: Default> Default for PhaseMap<T> {
    fn default() -> Self {
        Self(std::array::from_fn(|_| T::default()))
    }
}

impl<T> Index<Phase> for PhaseMap<T> {
    type Output = T;

    fn index(&self, phase: Phase) -> &T {
        &self.0[phase.index()]
    }
}

impl<T> IndexMut<Phase> for PhaseMap<T> {
    fn index_mut(&mut self, phase: Phase) -> &mut T {
        &mut self.0[phase.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_directions() {
        assert_eq!(Phase::Config.direction(), Direction::TopDown);
        assert_eq!(Phase::Render.direction(), Direction::TopDown);
        assert_eq!(Phase::Unrender.direction(), Direction::BottomUp);
        assert_eq!(Phase::Teardown.direction(), Direction::BottomUp);
    }

    #[test]
    fn test_event_and_option_names() {
        assert_eq!(Phase::Init.event_name(), "init");
        assert_eq!(Phase::Init.option_key(), "oninit");
        assert_eq!(Phase::Teardown.option_key(), "onteardown");
    }

    #[test]
    fn test_state_machine_happy_path() {
        let mut state = LifecycleState::Unconstructed;
        for phase in Phase::ALL {
            assert!(state.can_enter(phase), "{} should accept {}", state, phase);
            state = phase.entered_state();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_teardown_accepted_mid_lifecycle() {
        assert!(LifecycleState::Initialized.can_enter(Phase::Teardown));
        assert!(LifecycleState::Rendered.can_enter(Phase::Teardown));
        assert!(!LifecycleState::TornDown.can_enter(Phase::Teardown));
        assert!(!LifecycleState::Unconstructed.can_enter(Phase::Teardown));
    }

    #[test]
    fn test_unrender_from_rendered_or_completed() {
        assert!(LifecycleState::Rendered.can_enter(Phase::Unrender));
        assert!(LifecycleState::Completed.can_enter(Phase::Unrender));
        assert!(!LifecycleState::Initialized.can_enter(Phase::Unrender));
    }

    #[test]
    fn test_phase_map_indexing() {
        let mut map: PhaseMap<u32> = PhaseMap::default();
        map[Phase::Render] = 7;
        assert_eq!(map[Phase::Render], 7);
        assert_eq!(map[Phase::Config], 0);
        assert_eq!(map.iter().count(), 7);
    }
}

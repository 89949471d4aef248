// Core infrastructure modules
pub mod core {
    pub mod errors;
    pub mod phase;
}

pub mod component; // classes, hook chains, live instances
pub mod orchestrator; // tree traversal and async completion
pub mod pubsub; // per-instance event channel

// Re-exports for convenience
pub use crate::core::errors::{LifecycleError, Result};
pub use crate::core::phase::{Direction, LifecycleState, Phase, PhaseMap};

pub use crate::component::*;
pub use crate::orchestrator::*;
pub use crate::pubsub::{EventBus, Subscriber, Subscription};

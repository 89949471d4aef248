//! Component classes, resolved hook chains, and live instances

pub mod class;
pub mod hooks;
pub mod instance;

pub use class::*;
pub use hooks::*;
pub use instance::*;

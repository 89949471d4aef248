//! Tree traversal, async completion, and external collaborator seams

pub mod collaborators;
pub mod completion;
pub mod registry;
pub mod tree;

pub use collaborators::*;
pub use completion::*;
pub use registry::*;
pub use tree::*;

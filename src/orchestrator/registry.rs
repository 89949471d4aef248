//! Registry of named component classes
//!
//! Templates resolve component names against the host instance's own
//! registrations first, then against this shared registry.

use std::sync::Arc;

use dashmap::DashMap;

use crate::component::class::ClassDefinition;

/// Shared, orchestrator-level component registry
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    classes: Arc<DashMap<String, Arc<ClassDefinition>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under a component name
    pub fn register(&self, name: impl Into<String>, class: Arc<ClassDefinition>) {
        self.classes.insert(name.into(), class);
    }

    /// Get a class by component name
    pub fn get(&self, name: &str) -> Option<Arc<ClassDefinition>> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    /// Check if a component name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// List all registered component names
    pub fn list(&self) -> Vec<String> {
        self.classes.iter().map(|entry| entry.key().clone()).collect()
    }
}

//! Class definitions and the base-link chain they form
//!
//! A `ClassDefinition` is immutable once created. Deriving a class via
//! `extend` records a single ownership link to its base; instantiation walks
//! those links root-first to resolve hook chains, default data, and templates.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::component::hooks::{Hook, SuperRef};
use crate::component::instance::Instance;
use crate::core::phase::{Phase, PhaseMap};
use crate::orchestrator::collaborators::TemplateSource;

/// Configuration bag supplied at `extend` time or at instantiation.
///
/// An instance-level options bag acts as the most-derived link in the hook
/// chain for every phase except CONSTRUCT, which belongs to class definitions
/// only.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    pub(crate) hooks: PhaseMap<Option<Hook>>,
    pub(crate) data: serde_json::Map<String, Value>,
    pub(crate) template: Option<Arc<dyn TemplateSource>>,
    pub(crate) components: HashMap<String, Arc<ClassDefinition>>,
}

impl ComponentOptions {
    /// Create an empty options bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a hook for `phase`
    pub fn on<F>(mut self, phase: Phase, hook: F) -> Self
    where
        F: Fn(&mut Instance, &SuperRef<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks[phase] = Some(Arc::new(hook));
        self
    }

    /// Seed a default data value
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attach the template collaborator consulted during RENDER
    pub fn template<T: TemplateSource + 'static>(mut self, template: T) -> Self {
        self.template = Some(Arc::new(template));
        self
    }

    /// Register a named child class available to this component's template
    pub fn component(mut self, name: impl Into<String>, class: Arc<ClassDefinition>) -> Self {
        self.components.insert(name.into(), class);
        self
    }

    /// Whether a hook is declared for `phase`
    pub fn has_hook(&self, phase: Phase) -> bool {
        self.hooks[phase].is_some()
    }
}

/// An immutable class definition with an optional base link.
pub struct ClassDefinition {
    name: String,
    options: ComponentOptions,
    base: Option<Arc<ClassDefinition>>,
}

impl ClassDefinition {
    /// Define a root class (no base link).
    pub fn new(name: impl Into<String>, options: ComponentOptions) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            options,
            base: None,
        })
    }

    /// Derive a new class whose base link is `self`.
    pub fn extend(
        self: &Arc<Self>,
        name: impl Into<String>,
        options: ComponentOptions,
    ) -> Arc<ClassDefinition> {
        Arc::new(ClassDefinition {
            name: name.into(),
            options,
            base: Some(Arc::clone(self)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&Arc<ClassDefinition>> {
        self.base.as_ref()
    }

    pub(crate) fn options(&self) -> &ComponentOptions {
        &self.options
    }
}

/// Ordered list of class definitions from root ancestor to most-derived.
///
/// Derived once per instantiation by walking base links; empty for instances
/// created directly from a terminal options bag.
#[derive(Clone, Default)]
pub struct ClassChain {
    links: Vec<Arc<ClassDefinition>>,
}

impl ClassChain {
    /// Walk base links from `class` to the root, ordering root-first.
    pub fn from_class(class: Option<&Arc<ClassDefinition>>) -> Self {
        let mut links = Vec::new();
        let mut current = class.cloned();
        while let Some(def) = current {
            current = def.base().cloned();
            links.push(def);
        }
        links.reverse();
        Self { links }
    }

    /// Class links, root-first.
    pub fn links(&self) -> &[Arc<ClassDefinition>] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

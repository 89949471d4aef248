//! Live component instances
//!
//! An instance is one node in the composition tree. It owns its hook registry
//! and event bus for its whole lifetime, tracks its lifecycle state, and holds
//! the structural links (parent, ordered children) the orchestrator traverses.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::component::class::{ClassChain, ClassDefinition, ComponentOptions};
use crate::component::hooks::{invoke_chain, HookRegistry};
use crate::core::errors::{LifecycleError, Result};
use crate::core::phase::{LifecycleState, Phase};
use crate::orchestrator::collaborators::TemplateSource;
use crate::pubsub::{EventBus, Subscription};

/// Identifier of an instance within its orchestrator's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub(crate) usize);

impl InstanceId {
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live node in the composition tree.
pub struct Instance {
    id: InstanceId,
    name: String,
    parent: Option<InstanceId>,
    children: Vec<InstanceId>,
    state: LifecycleState,
    /// Phase currently on the call stack. No orchestrator path re-enters
    /// `fire`, so the re-entrancy guard reports a bug, not a supported flow.
    firing: Option<Phase>,
    registry: HookRegistry,
    bus: EventBus,
    data: serde_json::Map<String, Value>,
    template: Option<Arc<dyn TemplateSource>>,
    components: HashMap<String, Arc<ClassDefinition>>,
}

impl Instance {
    /// Build an instance from its class chain and instance-level options.
    ///
    /// Default data, component registrations, and templates merge root to
    /// derived, with the instance options as the final override.
    pub(crate) fn new(
        id: InstanceId,
        name: impl Into<String>,
        parent: Option<InstanceId>,
        chain: &ClassChain,
        options: ComponentOptions,
    ) -> Self {
        let registry = HookRegistry::resolve(chain, &options);

        let mut data = serde_json::Map::new();
        let mut components = HashMap::new();
        let mut template = None;
        for class in chain.links() {
            data.extend(class.options().data.clone());
            components.extend(class.options().components.clone());
            if let Some(t) = &class.options().template {
                template = Some(Arc::clone(t));
            }
        }
        data.extend(options.data);
        components.extend(options.components);
        if let Some(t) = options.template {
            template = Some(t);
        }

        Self {
            id,
            name: name.into(),
            parent,
            children: Vec::new(),
            state: LifecycleState::Unconstructed,
            firing: None,
            registry,
            bus: EventBus::new(),
            data,
            template,
            components,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Component-slot name this instance was mounted under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<InstanceId> {
        self.parent
    }

    /// Children in creation order (first-rendered order).
    pub fn children(&self) -> &[InstanceId] {
        &self.children
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Read a data value. Opaque to the ordering core; only hook bodies care.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Write a data value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Subscribe to a named event. Phase events use the phase name
    /// (`"init"`, `"render"`, ...).
    pub fn on<F>(&mut self, event: impl Into<String>, subscriber: F) -> Subscription
    where
        F: Fn(&mut Instance, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.on(event, Arc::new(subscriber))
    }

    /// Cancel a subscription. Returns false if it was already removed.
    pub fn off(&mut self, subscription: Subscription) -> bool {
        self.bus.off(subscription)
    }

    /// Emit an event to subscribers in registration order.
    ///
    /// Every subscriber runs even if an earlier one fails; the first error is
    /// surfaced after all have run.
    pub fn emit(&mut self, event: &str, payload: &Value) -> Result<()> {
        let subscribers = self.bus.subscribers(event);
        let mut first = None;
        for subscriber in subscribers {
            if let Err(error) = subscriber(self, payload) {
                warn!(
                    instance = %self.name,
                    event,
                    %error,
                    "event subscriber failed"
                );
                if first.is_none() {
                    first = Some(LifecycleError::subscriber(event, &self.name, error));
                }
            }
        }
        match first {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub(crate) fn add_child(&mut self, child: InstanceId) {
        self.children.push(child);
    }

    pub(crate) fn template(&self) -> Option<Arc<dyn TemplateSource>> {
        self.template.clone()
    }

    pub(crate) fn component_class(&self, name: &str) -> Option<Arc<ClassDefinition>> {
        self.components.get(name).cloned()
    }

    /// Fire one phase on this instance: guard, hook chain, state advance,
    /// then the phase event.
    ///
    /// The hook chain and the event emission both belong to the phase's
    /// firing; the chain always runs first (fixed engine-wide order). State
    /// advances even when a hook fails so the traversal around this instance
    /// is not corrupted; the error is returned for the caller to collect.
    pub(crate) fn fire(&mut self, phase: Phase) -> Result<()> {
        if self.state.is_terminal() {
            return Err(LifecycleError::torn_down(phase, &self.name));
        }
        if let Some(current) = self.firing {
            return Err(LifecycleError::reentrant(phase, current, &self.name));
        }
        if !self.state.can_enter(phase) {
            return Err(LifecycleError::invalid_transition(phase, self.state, &self.name));
        }

        debug!(instance = %self.name, id = %self.id, %phase, "firing phase");
        self.firing = Some(phase);
        let chain = self.registry.chain(phase).to_vec();
        let hook_result = invoke_chain(&chain, self);
        self.firing = None;
        self.state = phase.entered_state();

        let event_result = self.emit(phase.event_name(), &Value::Null);

        match hook_result {
            Err(error) => Err(LifecycleError::hook(phase, &self.name, error)),
            Ok(()) => event_result,
        }
    }
}

//! Tree orchestrator - drives lifecycle phases across a component tree
//!
//! Top-down phases visit an instance before its children; bottom-up phases
//! visit children first, in creation order either way. Hook and subscriber
//! failures never abort a traversal: they are collected, the remaining
//! subtree is still attempted, and the first failure is surfaced once the
//! traversal drains.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::component::class::{ClassChain, ClassDefinition, ComponentOptions};
use crate::component::instance::{Instance, InstanceId};
use crate::core::errors::{LifecycleError, Result};
use crate::core::phase::{Direction, LifecycleState, Phase};
use crate::orchestrator::collaborators::{NoTransitions, TransitionEngine};
use crate::orchestrator::completion::PendingCompletion;
use crate::orchestrator::registry::ComponentRegistry;

/// Owns the composition tree and drives phases across it.
pub struct Orchestrator {
    nodes: Vec<Instance>,
    registry: ComponentRegistry,
    transitions: Arc<dyn TransitionEngine>,
}

impl Orchestrator {
    /// Create an orchestrator with no shared registry entries and the
    /// immediate transition engine.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            registry: ComponentRegistry::new(),
            transitions: Arc::new(NoTransitions),
        }
    }

    /// Replace the transition collaborator gating COMPLETE and teardown
    /// settlement.
    pub fn with_transitions(mut self, engine: Arc<dyn TransitionEngine>) -> Self {
        self.transitions = engine;
        self
    }

    /// Use a shared component registry.
    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Number of instances ever created in this tree (torn-down ones stay
    /// for bookkeeping).
    pub fn instance_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn instance(&self, id: InstanceId) -> Result<&Instance> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| LifecycleError::missing_instance(id.0))
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Result<&mut Instance> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| LifecycleError::missing_instance(id.0))
    }

    /// Read a data value from an instance.
    pub fn get(&self, id: InstanceId, key: &str) -> Result<Option<Value>> {
        Ok(self.instance(id)?.get(key).cloned())
    }

    /// Write a data value onto an instance.
    pub fn set(&mut self, id: InstanceId, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.instance_mut(id)?.set(key, value);
        Ok(())
    }

    /// Mount a root instantiated from an extended class.
    ///
    /// Drives CONSTRUCT through COMPLETE across the whole tree the template
    /// produces. Children are instantiated during their parent's RENDER, in
    /// template-encounter order, and recursively driven through the same
    /// phases.
    pub async fn mount(
        &mut self,
        class: &Arc<ClassDefinition>,
        options: ComponentOptions,
    ) -> Result<InstanceId> {
        self.mount_internal(Some(Arc::clone(class)), options).await
    }

    /// Mount a root from a terminal options bag.
    ///
    /// No class link means no CONSTRUCT hook fires for the root itself; see
    /// the CONSTRUCT rule on [`crate::HookRegistry::resolve`].
    pub async fn mount_raw(&mut self, options: ComponentOptions) -> Result<InstanceId> {
        self.mount_internal(None, options).await
    }

    async fn mount_internal(
        &mut self,
        class: Option<Arc<ClassDefinition>>,
        options: ComponentOptions,
    ) -> Result<InstanceId> {
        let name = class
            .as_ref()
            .map_or_else(|| "root".to_string(), |c| c.name().to_string());
        let mut errors = Vec::new();

        let root = self.instantiate(class.as_ref(), &name, options, None, &mut errors);
        self.render(root, &mut errors);
        self.run_complete(root, &mut errors).await;

        info!(root = %root, instances = self.instance_count(), "mounted component tree");
        Self::drain(Phase::Render, errors)?;
        Ok(root)
    }

    /// Create one instance and fire its instantiation phases
    /// (CONSTRUCT, CONFIG, INIT).
    fn instantiate(
        &mut self,
        class: Option<&Arc<ClassDefinition>>,
        name: &str,
        options: ComponentOptions,
        parent: Option<InstanceId>,
        errors: &mut Vec<LifecycleError>,
    ) -> InstanceId {
        let chain = ClassChain::from_class(class);
        let id = InstanceId(self.nodes.len());
        let instance = Instance::new(id, name, parent, &chain, options);
        self.nodes.push(instance);
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].add_child(id);
        }
        debug!(instance = name, id = %id, links = chain.len(), "instantiated");

        for phase in [Phase::Construct, Phase::Config, Phase::Init] {
            if let Err(e) = self.nodes[id.0].fire(phase) {
                errors.push(e);
            }
        }
        id
    }

    /// Fire RENDER on `id`, then instantiate and render the children its
    /// template requests, depth-first in encounter order.
    fn render(&mut self, id: InstanceId, errors: &mut Vec<LifecycleError>) {
        if let Err(e) = self.nodes[id.0].fire(Phase::Render) {
            errors.push(e);
        }

        let mounts = match self.nodes[id.0].template() {
            Some(template) => template.child_mounts(&self.nodes[id.0]),
            None => Vec::new(),
        };
        for mount in mounts {
            let class = self.nodes[id.0]
                .component_class(&mount.component)
                .or_else(|| self.registry.get(&mount.component));
            let Some(class) = class else {
                errors.push(LifecycleError::unknown_component(
                    &mount.component,
                    self.nodes[id.0].name(),
                ));
                continue;
            };

            let mut options = ComponentOptions::new();
            options.data = mount.data;
            let child = self.instantiate(Some(&class), &mount.component, options, Some(id), errors);
            self.render(child, errors);
        }
    }

    /// Fire COMPLETE bottom-up once each instance's pending transitions
    /// settle. Settlement order is the transition engine's business; only the
    /// firing count is guaranteed tree-wide.
    async fn run_complete(&mut self, root: InstanceId, errors: &mut Vec<LifecycleError>) {
        for id in self.traversal_order(root, Direction::BottomUp) {
            let engine = Arc::clone(&self.transitions);
            engine.settled(id).await;
            if self.nodes[id.0].state() == LifecycleState::Rendered {
                if let Err(e) = self.nodes[id.0].fire(Phase::Complete) {
                    errors.push(e);
                }
            }
        }
    }

    /// Fire one phase across the subtree under `root`, in the phase's
    /// defined direction, draining failures.
    pub fn run_phase(&mut self, root: InstanceId, phase: Phase) -> Result<()> {
        self.instance(root)?;
        let mut errors = Vec::new();
        for id in self.traversal_order(root, phase.direction()) {
            if let Err(e) = self.nodes[id.0].fire(phase) {
                errors.push(e);
            }
        }
        Self::drain(phase, errors)
    }

    /// Tear down the subtree under `root`: UNRENDER then TEARDOWN, both
    /// bottom-up.
    ///
    /// Phases an instance never entered are skipped (an instance cancelled
    /// mid-render fires no UNRENDER), but TEARDOWN itself is mandatory for
    /// every constructed instance. The returned [`PendingCompletion`]
    /// resolves once every per-instance settlement signal resolves; a hook
    /// failure rides along as the resolved error instead of blocking it.
    ///
    /// Calling this on an already torn-down root is fatal and reported
    /// immediately.
    pub fn teardown(&mut self, root: InstanceId) -> Result<PendingCompletion> {
        if self.instance(root)?.state().is_terminal() {
            return Err(LifecycleError::torn_down(
                Phase::Teardown,
                self.instance(root)?.name(),
            ));
        }

        let order = self.traversal_order(root, Direction::BottomUp);
        info!(root = %root, instances = order.len(), "tearing down subtree");
        let mut errors = Vec::new();

        for &id in &order {
            if matches!(
                self.nodes[id.0].state(),
                LifecycleState::Rendered | LifecycleState::Completed
            ) {
                if let Err(e) = self.nodes[id.0].fire(Phase::Unrender) {
                    errors.push(e);
                }
            }
        }

        let mut signals = Vec::with_capacity(order.len());
        for &id in &order {
            if let Err(e) = self.nodes[id.0].fire(Phase::Teardown) {
                errors.push(e);
            }
            let engine = Arc::clone(&self.transitions);
            signals.push(PendingCompletion::from_future(async move {
                engine.settled(id).await;
                Ok(())
            }));
        }

        let pending = PendingCompletion::aggregate(signals);
        match Self::drain(Phase::Teardown, errors) {
            Ok(()) => Ok(pending),
            // The signal must still resolve; the drained failure becomes its
            // resolved value.
            Err(drained) => Ok(PendingCompletion::from_future(async move {
                let _ = pending.await;
                Err(drained)
            })),
        }
    }

    /// Depth-first lookup of a mounted descendant by component name.
    pub fn find_component(&self, root: InstanceId, name: &str) -> Option<InstanceId> {
        let mut order = Vec::new();
        self.collect_preorder(root, &mut order);
        order
            .into_iter()
            .skip(1)
            .find(|id| self.nodes[id.0].name() == name)
    }

    fn traversal_order(&self, root: InstanceId, direction: Direction) -> Vec<InstanceId> {
        let mut order = Vec::new();
        match direction {
            Direction::TopDown => self.collect_preorder(root, &mut order),
            Direction::BottomUp => self.collect_postorder(root, &mut order),
        }
        order
    }

    fn collect_preorder(&self, id: InstanceId, out: &mut Vec<InstanceId>) {
        out.push(id);
        for &child in self.nodes[id.0].children() {
            self.collect_preorder(child, out);
        }
    }

    fn collect_postorder(&self, id: InstanceId, out: &mut Vec<InstanceId>) {
        for &child in self.nodes[id.0].children() {
            self.collect_postorder(child, out);
        }
        out.push(id);
    }

    /// Surface collected traversal failures, labeled by the phase of the
    /// first failure (falling back to `phase` for errors without one).
    fn drain(phase: Phase, errors: Vec<LifecycleError>) -> Result<()> {
        if errors.is_empty() {
            return Ok(());
        }
        let phase = errors[0].phase().unwrap_or(phase);
        error!(%phase, failed = errors.len(), "phase traversal drained with failures");
        Err(LifecycleError::drained(phase, errors))
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::collaborators::{ChildMount, StaticTemplate};
    use std::sync::Mutex;

    fn leaf_class(name: &str) -> Arc<ClassDefinition> {
        ClassDefinition::new(name, ComponentOptions::new())
    }

    #[tokio::test]
    async fn test_children_recorded_in_encounter_order() {
        let template = StaticTemplate::new()
            .mount(ChildMount::new("First"))
            .mount(ChildMount::new("Second"));
        let options = ComponentOptions::new()
            .template(template)
            .component("First", leaf_class("First"))
            .component("Second", leaf_class("Second"));

        let mut orchestrator = Orchestrator::new();
        let root = orchestrator.mount_raw(options).await.unwrap();

        let children = orchestrator.instance(root).unwrap().children().to_vec();
        let names: Vec<String> = children
            .iter()
            .map(|&c| orchestrator.instance(c).unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["First", "Second"]);
    }

    #[tokio::test]
    async fn test_find_component_searches_descendants_depth_first() {
        let grandchild = leaf_class("GrandChild");
        let child = ClassDefinition::new(
            "Child",
            ComponentOptions::new()
                .template(StaticTemplate::new().mount(ChildMount::new("GrandChild")))
                .component("GrandChild", grandchild),
        );
        let options = ComponentOptions::new()
            .template(StaticTemplate::new().mount(ChildMount::new("Child")))
            .component("Child", child);

        let mut orchestrator = Orchestrator::new();
        let root = orchestrator.mount_raw(options).await.unwrap();

        let found = orchestrator.find_component(root, "GrandChild").unwrap();
        assert_eq!(orchestrator.instance(found).unwrap().name(), "GrandChild");
        assert!(orchestrator.find_component(root, "Nobody").is_none());
    }

    #[tokio::test]
    async fn test_shared_registry_resolves_template_names() {
        let registry = ComponentRegistry::new();
        registry.register("Widget", leaf_class("Widget"));

        let mut orchestrator = Orchestrator::new().with_registry(registry);
        let options =
            ComponentOptions::new().template(StaticTemplate::new().mount(ChildMount::new("Widget")));
        let root = orchestrator.mount_raw(options).await.unwrap();
        assert_eq!(orchestrator.instance(root).unwrap().children().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_component_is_drained_not_panicked() {
        let mut orchestrator = Orchestrator::new();
        let options =
            ComponentOptions::new().template(StaticTemplate::new().mount(ChildMount::new("Ghost")));
        let err = orchestrator.mount_raw(options).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Drained { .. }));
    }

    #[tokio::test]
    async fn test_teardown_mid_lifecycle_skips_unentered_phases() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let options = {
            let unrender = Arc::clone(&fired);
            let teardown = Arc::clone(&fired);
            ComponentOptions::new()
                .on(Phase::Unrender, move |_i, _s| {
                    unrender.lock().unwrap().push("unrender");
                    Ok(())
                })
                .on(Phase::Teardown, move |_i, _s| {
                    teardown.lock().unwrap().push("teardown");
                    Ok(())
                })
        };

        let mut orchestrator = Orchestrator::new();
        let mut errors = Vec::new();
        // Instance exists but was never rendered.
        let id = orchestrator.instantiate(None, "stalled", options, None, &mut errors);
        assert!(errors.is_empty());
        assert_eq!(
            orchestrator.instance(id).unwrap().state(),
            LifecycleState::Initialized
        );

        orchestrator.teardown(id).unwrap().await.unwrap();
        assert_eq!(*fired.lock().unwrap(), ["teardown"]);
        assert!(orchestrator.instance(id).unwrap().state().is_terminal());
    }

    #[tokio::test]
    async fn test_mount_drain_carries_the_failing_phase() {
        let class = ClassDefinition::new(
            "Broken",
            ComponentOptions::new().on(Phase::Init, |_i, _s| Err(anyhow::anyhow!("boom"))),
        );

        let mut orchestrator = Orchestrator::new();
        let err = orchestrator
            .mount(&class, ComponentOptions::new())
            .await
            .unwrap_err();
        match err {
            LifecycleError::Drained { phase, .. } => assert_eq!(phase, Phase::Init),
            other => panic!("Expected drained error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_phase_rejects_out_of_order_refire() {
        let mut orchestrator = Orchestrator::new();
        let root = orchestrator.mount_raw(ComponentOptions::new()).await.unwrap();

        let err = orchestrator.run_phase(root, Phase::Init).unwrap_err();
        if let LifecycleError::Drained { first, .. } = err {
            assert!(matches!(*first, LifecycleError::InvalidTransition { .. }));
        } else {
            panic!("Expected drained error");
        }
    }
}

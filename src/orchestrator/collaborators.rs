//! External collaborator seams
//!
//! The ordering core never renders output and never animates. It only needs
//! two things from the outside world: which children a template wants mounted
//! during RENDER, and when an instance's pending transitions have settled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component::instance::{Instance, InstanceId};

/// One child component instantiation requested by a template, in
/// template-encounter order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChildMount {
    /// Registered component name to instantiate.
    pub component: String,
    /// Data bound onto the child instance.
    pub data: serde_json::Map<String, Value>,
}

impl ChildMount {
    /// Mount a named component with no bound data
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            data: serde_json::Map::new(),
        }
    }

    /// Bind a data value onto the child
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Templating collaborator.
///
/// Supplies, during RENDER, the ordered list of child instantiations to
/// create. The orchestrator consumes this list depth-first; it produces no
/// output back except instance handles for later lookup.
pub trait TemplateSource: Send + Sync {
    fn child_mounts(&self, host: &Instance) -> Vec<ChildMount>;
}

/// A fixed template: the same child mounts on every render.
#[derive(Clone, Default)]
pub struct StaticTemplate {
    mounts: Vec<ChildMount>,
}

impl StaticTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(mut self, mount: ChildMount) -> Self {
        self.mounts.push(mount);
        self
    }
}

impl TemplateSource for StaticTemplate {
    fn child_mounts(&self, _host: &Instance) -> Vec<ChildMount> {
        self.mounts.clone()
    }
}

/// Template driven by a closure over the host instance's data.
pub struct TemplateFn<F>(pub F);

impl<F> TemplateSource for TemplateFn<F>
where
    F: Fn(&Instance) -> Vec<ChildMount> + Send + Sync,
{
    fn child_mounts(&self, host: &Instance) -> Vec<ChildMount> {
        (self.0)(host)
    }
}

/// Transition/animation collaborator.
///
/// Its only contract is that it eventually settles: COMPLETE awaits it before
/// firing, and TEARDOWN folds it into the aggregate completion signal.
#[async_trait]
pub trait TransitionEngine: Send + Sync {
    /// Resolves once all pending transitions for `instance` have settled.
    async fn settled(&self, instance: InstanceId);
}

/// Default engine: nothing animates, everything settles immediately.
pub struct NoTransitions;

#[async_trait]
impl TransitionEngine for NoTransitions {
    async fn settled(&self, _instance: InstanceId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_mount_builder() {
        let mount = ChildMount::new("Widget").data("label", "ok");
        assert_eq!(mount.component, "Widget");
        assert_eq!(mount.data.get("label").unwrap(), "ok");
    }

    #[test]
    fn test_static_template_preserves_encounter_order() {
        let template = StaticTemplate::new()
            .mount(ChildMount::new("First"))
            .mount(ChildMount::new("Second"));
        assert_eq!(template.mounts.len(), 2);
        assert_eq!(template.mounts[0].component, "First");
        assert_eq!(template.mounts[1].component, "Second");
    }

    #[tokio::test]
    async fn test_no_transitions_settles_immediately() {
        NoTransitions.settled(InstanceId(0)).await;
    }
}

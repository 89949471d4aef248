//! Error containment and teardown settlement guarantees
//!
//! A failing hook or subscriber must not abort the traversal around it, and
//! teardown's completion signal must settle even when hooks fail.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use trellis::{
    ChildMount, ClassDefinition, ComponentOptions, Instance, LifecycleError, Orchestrator, Phase,
    StaticTemplate, SuperRef,
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn logged(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn record(
    log: &Log,
    label: &str,
) -> impl Fn(&mut Instance, &SuperRef<'_>) -> anyhow::Result<()> + Send + Sync + 'static {
    let log = Arc::clone(log);
    let label = label.to_string();
    move |_instance, _sup| {
        log.lock().unwrap().push(label.clone());
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn test_failing_sibling_hook_does_not_abort_traversal() {
    init_tracing();
    let fired = new_log();

    let left = ClassDefinition::new(
        "Left",
        ComponentOptions::new().on(Phase::Init, record(&fired, "left")),
    );
    let boom = ClassDefinition::new(
        "Boom",
        ComponentOptions::new().on(Phase::Init, |_instance, _sup| {
            Err(anyhow::anyhow!("exploded"))
        }),
    );
    let right = ClassDefinition::new(
        "Right",
        ComponentOptions::new().on(Phase::Init, record(&fired, "right")),
    );

    let options = ComponentOptions::new()
        .template(
            StaticTemplate::new()
                .mount(ChildMount::new("Left"))
                .mount(ChildMount::new("Boom"))
                .mount(ChildMount::new("Right")),
        )
        .component("Left", left)
        .component("Boom", boom)
        .component("Right", right);

    let mut orchestrator = Orchestrator::new();
    let err = orchestrator.mount_raw(options).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Drained { .. }));
    // The sibling after the failure was still visited.
    assert_eq!(logged(&fired), ["left", "right"]);
}

#[tokio::test]
async fn test_teardown_signal_resolves_despite_hook_failure() {
    let fired = new_log();

    let child = ClassDefinition::new(
        "Child",
        ComponentOptions::new().on(Phase::Teardown, |_instance, _sup| {
            Err(anyhow::anyhow!("child refused"))
        }),
    );
    let options = ComponentOptions::new()
        .on(Phase::Teardown, record(&fired, "parent"))
        .template(StaticTemplate::new().mount(ChildMount::new("Child")))
        .component("Child", child);

    let mut orchestrator = Orchestrator::new();
    let root = orchestrator.mount_raw(options).await.unwrap();

    let pending = orchestrator.teardown(root).unwrap();
    let err = pending.await.unwrap_err();

    assert!(matches!(err, LifecycleError::Drained { .. }));
    // The parent's teardown hook still fired after the child's failure.
    assert_eq!(logged(&fired), ["parent"]);
    assert!(orchestrator.instance(root).unwrap().state().is_terminal());
}

#[tokio::test]
async fn test_second_teardown_is_fatal() {
    let mut orchestrator = Orchestrator::new();
    let root = orchestrator.mount_raw(ComponentOptions::new()).await.unwrap();
    orchestrator.teardown(root).unwrap().await.unwrap();

    let err = orchestrator.teardown(root).unwrap_err();
    assert!(matches!(err, LifecycleError::TornDown { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_failing_subscriber_is_reported_but_siblings_run() {
    let fired = new_log();

    let options = {
        let fired = Arc::clone(&fired);
        ComponentOptions::new().on(Phase::Construct, move |instance, _sup| {
            instance.on("init", |_instance, _payload| {
                Err(anyhow::anyhow!("subscriber failed"))
            });
            let fired = Arc::clone(&fired);
            instance.on("init", move |_instance, _payload| {
                fired.lock().unwrap().push("second".to_string());
                Ok(())
            });
            Ok(())
        })
    };
    let component = ClassDefinition::new("Component", options);

    let mut orchestrator = Orchestrator::new();
    let err = orchestrator
        .mount(&component, ComponentOptions::new())
        .await
        .unwrap_err();

    if let LifecycleError::Drained { first, .. } = err {
        assert!(matches!(*first, LifecycleError::Subscriber { .. }));
    } else {
        panic!("Expected drained error");
    }
    assert_eq!(logged(&fired), ["second"]);
}

#[tokio::test]
async fn test_cancelled_subscription_never_fires() {
    let fired = new_log();

    let options = {
        let fired = Arc::clone(&fired);
        ComponentOptions::new().on(Phase::Construct, move |instance, _sup| {
            let removed = instance.on("render", |_instance, _payload| {
                panic!("removed subscriber must not run");
            });
            assert!(instance.off(removed));

            let fired = Arc::clone(&fired);
            instance.on("init", move |_instance, _payload| {
                fired.lock().unwrap().push("init".to_string());
                Ok(())
            });
            Ok(())
        })
    };
    let component = ClassDefinition::new("Component", options);

    let mut orchestrator = Orchestrator::new();
    let root = orchestrator
        .mount(&component, ComponentOptions::new())
        .await
        .unwrap();
    orchestrator.teardown(root).unwrap().await.unwrap();

    assert_eq!(logged(&fired), ["init"]);
}

#[tokio::test]
async fn test_super_call_without_base_is_silent() {
    let fired = new_log();

    let options = {
        let fired = Arc::clone(&fired);
        ComponentOptions::new().on(Phase::Config, move |instance, sup| {
            // No class chain below this hook; the call must be inert.
            sup.call(instance)?;
            fired.lock().unwrap().push("config".to_string());
            Ok(())
        })
    };

    let mut orchestrator = Orchestrator::new();
    let root = orchestrator.mount_raw(options).await.unwrap();
    orchestrator.teardown(root).unwrap().await.unwrap();

    assert_eq!(logged(&fired), ["config"]);
}

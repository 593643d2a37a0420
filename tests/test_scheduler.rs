use autofluo::schedule::WorkflowScheduler;
use autofluo::workflow::{FluoError, Node, NodeKind, TriggerKind, Workflow, WorkflowEngine};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("params must be an object"),
    }
}

fn interval_trigger(name: &str, minutes: u64) -> Node {
    Node::trigger(
        name,
        TriggerKind::ScheduleInterval,
        params(json!({"schedule_type": "interval", "interval_minutes": minutes})),
    )
}

fn cron_trigger(name: &str, expression: &str) -> Node {
    Node::trigger(
        name,
        TriggerKind::ScheduleCron,
        params(json!({"schedule_type": "cron", "cron_expression": expression})),
    )
}

fn workflow(name: &str, nodes: Vec<Node>, triggers: &[&str]) -> Arc<Workflow> {
    Arc::new(Workflow {
        id: format!("wf-{name}"),
        name: name.to_string(),
        nodes,
        connections: HashMap::new(),
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
    })
}

fn scheduler() -> WorkflowScheduler {
    WorkflowScheduler::new(Arc::new(WorkflowEngine::new()), None)
}

#[tokio::test]
async fn registers_one_job_per_schedule_trigger() {
    let scheduler = scheduler();
    let wf = workflow(
        "reports",
        vec![
            cron_trigger("daily", "0 9 * * *"),
            interval_trigger("poll", 5),
            Node::trigger("click", TriggerKind::Manual, Map::new()),
        ],
        &["daily", "poll", "click"],
    );

    scheduler.register_workflow(wf).await.expect("registration");

    // Manual triggers are ignored; job ids are "{workflow}-{trigger}".
    assert_eq!(
        scheduler.job_ids().await,
        vec!["reports-daily".to_string(), "reports-poll".to_string()]
    );

    scheduler.shutdown().await;
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let scheduler = scheduler();
    let wf = workflow("poller", vec![interval_trigger("tick", 1)], &["tick"]);

    scheduler
        .register_workflow(wf.clone())
        .await
        .expect("first registration");

    match scheduler.register_workflow(wf).await {
        Err(FluoError::Scheduler(message)) => {
            assert!(message.contains("Duplicate job ID: poller-tick"));
        }
        other => panic!("expected scheduler error, got {other:?}"),
    }

    assert_eq!(scheduler.job_ids().await, vec!["poller-tick".to_string()]);
    scheduler.shutdown().await;
}

#[tokio::test]
async fn invalid_cron_fails_registration_and_installs_nothing() {
    let scheduler = scheduler();
    let wf = workflow(
        "broken",
        vec![cron_trigger("daily", "not a cron")],
        &["daily"],
    );

    match scheduler.register_workflow(wf).await {
        Err(FluoError::Validation(message)) => {
            assert!(message.contains("Invalid cron expression"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    // The workflow never became visible to the scheduler.
    assert!(scheduler.job_ids().await.is_empty());
    scheduler.shutdown().await;
}

#[tokio::test]
async fn partially_duplicate_workflow_installs_no_jobs() {
    let scheduler = scheduler();
    let first = workflow("jobs", vec![interval_trigger("a", 1)], &["a"]);
    scheduler.register_workflow(first).await.expect("first");

    // Same workflow name with an extra trigger: the duplicate id rejects the
    // whole registration, including the new trigger.
    let second = workflow(
        "jobs",
        vec![interval_trigger("a", 1), interval_trigger("b", 2)],
        &["a", "b"],
    );
    assert!(scheduler.register_workflow(second).await.is_err());
    assert_eq!(scheduler.job_ids().await, vec!["jobs-a".to_string()]);

    scheduler.shutdown().await;
}

#[tokio::test]
async fn unregister_removes_only_that_workflows_jobs() {
    let scheduler = scheduler();
    scheduler
        .register_workflow(workflow("one", vec![interval_trigger("t", 1)], &["t"]))
        .await
        .expect("one");
    scheduler
        .register_workflow(workflow("two", vec![interval_trigger("t", 1)], &["t"]))
        .await
        .expect("two");

    scheduler.unregister_workflow("one").await;

    assert_eq!(scheduler.job_ids().await, vec!["two-t".to_string()]);
    scheduler.shutdown().await;
}

#[tokio::test]
async fn start_and_shutdown_are_idempotent() {
    let scheduler = scheduler();
    scheduler
        .register_workflow(workflow("idle", vec![interval_trigger("t", 60)], &["t"]))
        .await
        .expect("registration");

    scheduler.start().await;
    scheduler.start().await;
    scheduler.shutdown().await;
    assert!(scheduler.job_ids().await.is_empty());
    scheduler.shutdown().await;
}

#[tokio::test]
async fn registration_after_start_spawns_immediately() {
    let scheduler = scheduler();
    scheduler.start().await;

    scheduler
        .register_workflow(workflow("late", vec![interval_trigger("t", 60)], &["t"]))
        .await
        .expect("late registration");

    assert_eq!(scheduler.job_ids().await, vec!["late-t".to_string()]);
    scheduler.shutdown().await;
}

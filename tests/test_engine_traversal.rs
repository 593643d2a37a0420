use autofluo::workflow::{
    ExecutionStatus, Node, NodeKind, TriggerKind, Workflow, WorkflowEngine, TRIGGER_DATA_KEY,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("params must be an object"),
    }
}

fn manual(name: &str) -> Node {
    Node::trigger(name, TriggerKind::Manual, Map::new())
}

fn interval_trigger(name: &str) -> Node {
    Node::trigger(
        name,
        TriggerKind::ScheduleInterval,
        params(json!({"schedule_type": "interval", "interval_minutes": 1})),
    )
}

fn extract(name: &str, field: &str) -> Node {
    Node::new(
        name,
        NodeKind::Transform,
        params(json!({"operation": "extract_field", "field": field})),
    )
}

fn uppercase(name: &str) -> Node {
    Node::new(
        name,
        NodeKind::Transform,
        params(json!({"operation": "uppercase"})),
    )
}

fn workflow(nodes: Vec<Node>, connections: &[(&str, &[&str])], triggers: &[&str]) -> Workflow {
    let connections: HashMap<String, Vec<String>> = connections
        .iter()
        .map(|(source, targets)| {
            (
                source.to_string(),
                targets.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect();
    Workflow {
        id: "wf-test".to_string(),
        name: "test workflow".to_string(),
        nodes,
        connections,
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
    }
}

#[tokio::test]
async fn manual_trigger_seeds_context_and_runs_successors() {
    let engine = WorkflowEngine::new();
    let wf = workflow(
        vec![manual("start"), extract("kind", "trigger_type")],
        &[("start", &["kind"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;

    assert!(context.errors.is_empty());
    assert_eq!(context.history, vec!["kind"]);
    assert_eq!(
        context.get(TRIGGER_DATA_KEY).unwrap()["trigger_type"],
        json!("manual")
    );
    assert_eq!(context.get("kind"), Some(&json!("manual")));
}

#[tokio::test]
async fn diamond_join_executes_shared_node_once() {
    let engine = WorkflowEngine::new();
    let wf = workflow(
        vec![
            manual("start"),
            extract("a", "trigger_type"),
            uppercase("b"),
            uppercase("c"),
        ],
        &[("start", &["a", "b"]), ("a", &["c"]), ("b", &["c"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;

    assert!(context.errors.is_empty(), "errors: {:?}", context.errors);
    // Declared order for the trigger's successors, then the join exactly once.
    assert_eq!(context.history, vec!["a", "b", "c"]);
    assert_eq!(context.history.iter().filter(|n| *n == "c").count(), 1);
    assert_eq!(context.get("a"), Some(&json!("manual")));
    assert_eq!(context.get("b"), Some(&json!("MANUAL")));
    assert_eq!(context.get("c"), Some(&json!("MANUAL")));
}

#[tokio::test]
async fn failing_node_prunes_only_its_own_branch() {
    let engine = WorkflowEngine::new();
    // bad expects a string input but receives the trigger payload object.
    let wf = workflow(
        vec![
            manual("start"),
            uppercase("bad"),
            extract("down", "anything"),
            extract("ok", "trigger_type"),
            uppercase("up"),
        ],
        &[("start", &["bad", "ok"]), ("bad", &["down"]), ("ok", &["up"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;

    assert_eq!(context.history, vec!["ok", "up"]);
    assert!(!context.history.contains(&"bad".to_string()));
    assert!(!context.history.contains(&"down".to_string()));
    assert_eq!(context.errors.len(), 1);
    assert!(context.errors[0].starts_with("Error in node bad:"));
    assert_eq!(context.get("up"), Some(&json!("MANUAL")));
}

#[tokio::test]
async fn schedule_triggers_never_fire_without_the_scheduler() {
    let engine = WorkflowEngine::new();
    let wf = workflow(
        vec![interval_trigger("sched"), extract("kind", "trigger_type")],
        &[("sched", &["kind"])],
        &["sched"],
    );

    // engine.run with no trigger name only considers manual triggers.
    let context = engine.run(&wf, None).await;
    assert!(context.history.is_empty());
    assert!(context.data.is_empty());
    assert!(context.errors.is_empty());

    // The scheduler names the trigger explicitly; then it fires.
    let context = engine.run(&wf, Some("sched")).await;
    assert_eq!(context.history, vec!["kind"]);
    assert_eq!(context.get("kind"), Some(&json!("schedule")));
    let last = wf.get_node("sched").unwrap().last_execution.lock().unwrap();
    assert!(last.is_some());
}

#[tokio::test]
async fn unknown_trigger_name_is_reported() {
    let engine = WorkflowEngine::new();
    let wf = workflow(vec![manual("start")], &[], &["start"]);

    let context = engine.run(&wf, Some("ghost")).await;
    assert_eq!(context.errors, vec!["Trigger node ghost not found"]);
    assert!(context.history.is_empty());
}

#[tokio::test]
async fn every_manual_trigger_fires_in_definition_order() {
    let engine = WorkflowEngine::new();
    let wf = workflow(
        vec![
            manual("first"),
            manual("second"),
            extract("a", "trigger_type"),
            uppercase("b"),
        ],
        &[("first", &["a"]), ("second", &["b"])],
        &["first", "second"],
    );

    let context = engine.run(&wf, None).await;
    assert!(context.errors.is_empty(), "errors: {:?}", context.errors);
    assert_eq!(context.history, vec!["a", "b"]);
    assert_eq!(context.get("b"), Some(&json!("MANUAL")));
}

#[tokio::test]
async fn run_record_status_is_derived_from_errors() {
    let engine = WorkflowEngine::new();

    let clean = workflow(
        vec![manual("start"), extract("kind", "trigger_type")],
        &[("start", &["kind"])],
        &["start"],
    );
    let (context, record) = engine.run_recorded(&clean, None).await;
    assert!(context.errors.is_empty());
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert!(record.log.is_none());
    assert_eq!(record.workflow_id, "wf-test");
    assert!(record.completed_at.unwrap() >= record.started_at);

    let failing = workflow(
        vec![manual("start"), uppercase("bad")],
        &[("start", &["bad"])],
        &["start"],
    );
    let (context, record) = engine.run_recorded(&failing, None).await;
    assert_eq!(context.errors.len(), 1);
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.log.unwrap().contains("Error in node bad:"));
}

#[tokio::test]
async fn history_and_errors_grow_monotonically_across_a_chain() {
    let engine = WorkflowEngine::new();
    let wf = workflow(
        vec![
            manual("start"),
            extract("a", "trigger_type"),
            uppercase("b"),
            uppercase("c"),
        ],
        &[("start", &["a"]), ("a", &["b"]), ("b", &["c"])],
        &["start"],
    );

    let context = engine.run(&wf, None).await;
    // Each node runs after the node feeding it.
    assert_eq!(context.history, vec!["a", "b", "c"]);
    assert_eq!(context.get("c"), Some(&json!("MANUAL")));
}

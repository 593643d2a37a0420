use chrono::Utc;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

use crate::workflow::context::{ExecutionContext, TRIGGER_DATA_KEY};
use crate::workflow::errors::NodeError;
use crate::workflow::models::{ExecutionRecord, ExecutionStatus, Node, NodeKind, Workflow};
use crate::workflow::nodes::NodeRunner;

/// Runs workflows: fires the requested trigger, seeds the context from its
/// payload, then walks the forward edges breadth-first. The engine keeps no
/// state between runs; everything mutable lives in the per-run context (or,
/// for schedule triggers, on the node itself).
pub struct WorkflowEngine {
    runner: NodeRunner,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self {
            runner: NodeRunner::new(),
        }
    }

    /// Execute one run and return its context. Node failures never abort the
    /// run; they are recorded in `context.errors` and prune the failing
    /// node's out-edges. Callers derive success from the error list.
    pub async fn run(&self, workflow: &Workflow, trigger_name: Option<&str>) -> ExecutionContext {
        tracing::info!(workflow = %workflow.name, "starting workflow execution");

        let mut context = ExecutionContext::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        let mut seed = Value::Null;

        let fired: Vec<&Node> = match trigger_name {
            Some(name) => match workflow.get_node(name) {
                Some(node) => vec![node],
                None => {
                    context.add_error(format!("Trigger node {name} not found"));
                    return context;
                }
            },
            // Without an explicit trigger only manual triggers fire, in
            // definition order. Schedule triggers are the scheduler's to drive.
            None => workflow.manual_triggers().collect(),
        };

        for node in fired {
            tracing::info!(workflow = %workflow.name, trigger = %node.name, "firing trigger");
            match self.runner.execute(node, &mut context, &seed).await {
                Ok(Some(result)) if !result.is_null() => {
                    context.set(TRIGGER_DATA_KEY, result.clone());
                    seed = result;
                    queue.extend(workflow.successors(&node.name).iter().cloned());
                }
                Ok(_) => {
                    tracing::debug!(trigger = %node.name, "trigger produced no payload, successors skipped");
                }
                Err(e) => record_node_error(&mut context, &node.name, e),
            }
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut failed: HashSet<String> = HashSet::new();

        while let Some(name) = queue.pop_front() {
            // First visit wins on diamond joins; failed nodes are not retried.
            if visited.contains(&name) || failed.contains(&name) {
                continue;
            }
            let Some(node) = workflow.get_node(&name) else {
                context.add_error(format!("Error in node {name}: node not found in workflow"));
                failed.insert(name);
                continue;
            };

            tracing::info!(node = %node.name, "executing node");
            match self.runner.execute(node, &mut context, &seed).await {
                Ok(result) => {
                    let result = result.unwrap_or(Value::Null);
                    context.set(&node.name, result.clone());
                    context.add_history(&node.name);
                    seed = promote_seed(node, result);
                    visited.insert(name.clone());
                    queue.extend(workflow.successors(&name).iter().cloned());
                }
                Err(e) => {
                    record_node_error(&mut context, &node.name, e);
                    failed.insert(name);
                }
            }
        }

        tracing::info!(
            workflow = %workflow.name,
            executed = context.history.len(),
            errors = context.errors.len(),
            "workflow execution completed"
        );
        context
    }

    /// Like `run`, but also derives the execution record the caller hands to
    /// the execution store.
    pub async fn run_recorded(
        &self,
        workflow: &Workflow,
        trigger_name: Option<&str>,
    ) -> (ExecutionContext, ExecutionRecord) {
        let started_at = Utc::now();
        let context = self.run(workflow, trigger_name).await;
        let completed_at = Utc::now();

        let status = if context.errors.is_empty() {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        let log = if context.errors.is_empty() {
            None
        } else {
            Some(context.errors.join("\n"))
        };

        let record = ExecutionRecord {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow.id.clone(),
            status,
            started_at,
            completed_at: Some(completed_at),
            log,
        };
        (context, record)
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn record_node_error(context: &mut ExecutionContext, node_name: &str, error: NodeError) {
    match error {
        NodeError::Execution(msg) => {
            context.add_error(format!("Error in node {node_name}: {msg}"));
        }
        NodeError::Unexpected(msg) => {
            context.add_error(format!("Unexpected error in node {node_name}: {msg}"));
        }
    }
}

/// A node's result is stored under its own name; the value handed downstream
/// as the next seed is usually the same, except HTTP nodes pass on the parsed
/// response body when the response was JSON.
fn promote_seed(node: &Node, result: Value) -> Value {
    match node.kind {
        NodeKind::HttpRequest => match result.get("body") {
            Some(body) if !body.is_null() => body.clone(),
            _ => result,
        },
        _ => result,
    }
}

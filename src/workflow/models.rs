use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Trigger,
    HttpRequest,
    Transform,
    SendEmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    ScheduleCron,
    ScheduleInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Delete => write!(f, "DELETE"),
            HttpMethod::Head => write!(f, "HEAD"),
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(format!("Unsupported HTTP method: {other}")),
        }
    }
}

/// One step of a workflow. Behaviour is selected by `kind` (and `trigger_kind`
/// for triggers); everything else the node needs lives in the `parameters`
/// bag, validated at registration and again before execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_kind: Option<TriggerKind>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Schedule triggers remember when they last fired. Shared across runs of
    /// the owning workflow, so updates go through the mutex.
    #[serde(skip, default)]
    pub last_execution: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind, parameters: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            trigger_kind: None,
            parameters,
            last_execution: Arc::new(Mutex::new(None)),
        }
    }

    pub fn trigger(
        name: impl Into<String>,
        trigger_kind: TriggerKind,
        parameters: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Trigger,
            trigger_kind: Some(trigger_kind),
            parameters,
            last_execution: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_schedule_trigger(&self) -> bool {
        self.kind == NodeKind::Trigger
            && matches!(
                self.trigger_kind,
                Some(TriggerKind::ScheduleCron) | Some(TriggerKind::ScheduleInterval)
            )
    }

    pub fn is_manual_trigger(&self) -> bool {
        self.kind == NodeKind::Trigger && self.trigger_kind == Some(TriggerKind::Manual)
    }

    /// String parameter lookup; `None` when missing or not a string.
    pub fn string_parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    /// Forward adjacency: source node name -> successor names in declared order.
    #[serde(default)]
    pub connections: HashMap<String, Vec<String>>,
    /// Names of the nodes that may originate a run.
    #[serde(default)]
    pub triggers: Vec<String>,
}

impl Workflow {
    pub fn get_node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn successors(&self, name: &str) -> &[String] {
        self.connections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn manual_triggers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_manual_trigger())
    }

    pub fn schedule_triggers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_schedule_trigger())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

/// Outcome of one run, handed to the execution store. The engine derives it;
/// persistence is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub log: Option<String>,
}

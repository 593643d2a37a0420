pub mod email;
pub mod http;
pub mod transform;
pub mod trigger;

pub use trigger::{ScheduleKind, ScheduleSpec};

use serde_json::Value;

use crate::workflow::context::ExecutionContext;
use crate::workflow::errors::NodeError;
use crate::workflow::models::{Node, NodeKind};

/// Validate a node's parameter bag without executing it. Used at workflow
/// load/registration; `NodeRunner::execute` performs the same checks before
/// any side effect.
pub fn validate_parameters(node: &Node) -> Result<(), NodeError> {
    match node.kind {
        NodeKind::Trigger => trigger::validate_parameters(node),
        NodeKind::HttpRequest => http::validate_parameters(node),
        NodeKind::Transform => transform::validate_parameters(node),
        NodeKind::SendEmail => email::validate_parameters(node),
    }
}

/// Executes nodes by kind. One runner is shared by all runs of an engine; it
/// owns the HTTP client and the SMTP relay settings.
pub struct NodeRunner {
    http: http::HttpRequestRunner,
    email: email::EmailSender,
}

impl NodeRunner {
    pub fn new() -> Self {
        Self {
            http: http::HttpRequestRunner::new(),
            email: email::EmailSender::from_env(),
        }
    }

    /// Run one node against the context. `input` is the current data seed
    /// (the most recently completed upstream result). Triggers may return
    /// `None` to decline firing; all other kinds produce a value.
    pub async fn execute(
        &self,
        node: &Node,
        context: &mut ExecutionContext,
        input: &Value,
    ) -> Result<Option<Value>, NodeError> {
        match node.kind {
            NodeKind::Trigger => trigger::execute(node),
            NodeKind::HttpRequest => self.http.execute(node, context).await.map(Some),
            NodeKind::Transform => transform::execute(node, input).map(Some),
            NodeKind::SendEmail => self.email.execute(node, context).await.map(Some),
        }
    }
}

impl Default for NodeRunner {
    fn default() -> Self {
        Self::new()
    }
}

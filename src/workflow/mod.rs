pub mod context;
pub mod engine;
pub mod errors;
pub mod models;
pub mod nodes;
pub mod template;
pub mod validation;

pub use context::{ExecutionContext, TRIGGER_DATA_KEY};
pub use engine::WorkflowEngine;
pub use errors::{FluoError, NodeError, Result};
pub use models::{ExecutionRecord, ExecutionStatus, Node, NodeKind, TriggerKind, Workflow};
pub use validation::WorkflowValidator;

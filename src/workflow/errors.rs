use thiserror::Error;

#[derive(Debug, Error)]
pub enum FluoError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Failure raised by a node during a run. Both variants are contained by the
/// engine: they are recorded in the run's error list and prune the failing
/// node's out-edges without aborting the traversal.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{0}")]
    Execution(String),

    #[error("{0}")]
    Unexpected(String),
}

impl NodeError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

pub type Result<T> = std::result::Result<T, FluoError>;

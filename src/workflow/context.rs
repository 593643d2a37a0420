use serde_json::{Map, Value};

/// Pseudo-key under which the most recent trigger payload is stored.
pub const TRIGGER_DATA_KEY: &str = "$trigger";

/// Per-run scratchpad. Created at the start of `WorkflowEngine::run`, owned by
/// exactly one run, and returned to the caller when the run finishes. Not
/// thread-safe: nodes execute sequentially against it.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    /// Node results keyed by node name, plus the `$trigger` pseudo-key.
    pub data: Map<String, Value>,
    /// Names of the nodes that completed without failing, in completion order.
    pub history: Vec<String>,
    /// Error descriptions, in occurrence order.
    pub errors: Vec<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, overwriting any prior value.
    pub fn set(&mut self, key: &str, value: Value) {
        tracing::debug!(key = %key, "context set");
        self.data.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn add_history(&mut self, node_name: &str) {
        self.history.push(node_name.to_string());
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        tracing::error!("{error}");
        self.errors.push(error);
    }
}

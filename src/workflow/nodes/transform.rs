use serde_json::Value;

use crate::workflow::errors::NodeError;
use crate::workflow::models::Node;

pub const VALID_OPERATIONS: [&str; 2] = ["uppercase", "extract_field"];

pub fn validate_parameters(node: &Node) -> Result<(), NodeError> {
    let operation = node.string_parameter("operation").unwrap_or_default();
    if !VALID_OPERATIONS.contains(&operation) {
        return Err(NodeError::execution(format!(
            "Invalid operation. Must be one of {VALID_OPERATIONS:?}"
        )));
    }
    if operation == "extract_field" && node.string_parameter("field").is_none() {
        return Err(NodeError::execution(
            "Field parameter is required for extract_field operation",
        ));
    }
    Ok(())
}

/// Apply the configured operation to the current data seed.
pub fn execute(node: &Node, input: &Value) -> Result<Value, NodeError> {
    validate_parameters(node)?;

    let operation = node.string_parameter("operation").unwrap_or_default();
    let result = match operation {
        "uppercase" => {
            let text = input.as_str().ok_or_else(|| {
                NodeError::execution("uppercase operation requires a string input")
            })?;
            Value::String(text.to_uppercase())
        }
        "extract_field" => {
            let field = node.string_parameter("field").unwrap_or_default();
            let object = input.as_object().ok_or_else(|| {
                NodeError::execution("Data must be an object for extract_field operation")
            })?;
            object.get(field).cloned().unwrap_or(Value::Null)
        }
        other => {
            return Err(NodeError::execution(format!(
                "Operation {other} not implemented"
            )))
        }
    };

    tracing::info!(node = %node.name, operation = operation, "transform completed");
    Ok(result)
}

//! `{{ expression }}` interpolation over the execution context's data bag.
//!
//! Expressions are dotted paths rooted at a node name, e.g.
//! `{{ fetch_post.body.title }}`. Numeric segments index into arrays.

use crate::workflow::errors::NodeError;
use serde_json::{Map, Value};

/// Render `template` against `data`, substituting every `{{ path }}`
/// placeholder. Unknown paths and malformed placeholders fail the render.
pub fn render(template: &str, data: &Map<String, Value>) -> Result<String, NodeError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open.find("}}").ok_or_else(|| {
            NodeError::execution("Template rendering failed: unterminated placeholder")
        })?;

        let expression = after_open[..end].trim();
        if expression.is_empty() {
            return Err(NodeError::execution(
                "Template rendering failed: empty placeholder",
            ));
        }

        let value = resolve(expression, data).ok_or_else(|| {
            NodeError::execution(format!(
                "Template rendering failed: unknown value `{expression}`"
            ))
        })?;
        output.push_str(&stringify(value));

        rest = &after_open[end + 2..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Resolve a dotted path against the data bag. The first segment addresses a
/// top-level key (a node name); the remainder walks nested objects/arrays.
fn resolve<'a>(expression: &str, data: &'a Map<String, Value>) -> Option<&'a Value> {
    let mut segments = expression.split('.');
    let root = data.get(segments.next()?)?;
    segments.try_fold(root, |value, segment| step(value, segment))
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

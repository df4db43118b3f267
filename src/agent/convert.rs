//! Conversions from raw completion content to agent output values.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Matches ```json ... ``` (or bare ```) fenced blocks.
static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*\n([\s\S]*?)```").expect("valid fenced-block regex")
});

/// Parse content as JSON, falling back to the first fenced block and
/// finally to the raw text as a JSON string.
pub fn parse_best_effort(content: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(content.trim()) {
        return value;
    }

    if let Some(block) = extract_fenced(content)
        && let Ok(value) = serde_json::from_str::<Value>(&block)
    {
        return value;
    }

    Value::String(content.to_string())
}

/// Parse content produced under a schema-enforced contract.
///
/// The content must be JSON and, when a validator is supplied, must match
/// the declared schema.
pub fn parse_enforced(
    agent: &str,
    content: &str,
    validator: Option<&jsonschema::Validator>,
) -> Result<Value> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| Error::StructuredOutputViolation {
            agent: agent.to_string(),
            message: format!("content is not valid JSON: {}", e),
        })?;

    if let Some(validator) = validator
        && let Err(e) = validator.validate(&value)
    {
        return Err(Error::StructuredOutputViolation {
            agent: agent.to_string(),
            message: format!("content does not match schema: {}", e),
        });
    }

    Ok(value)
}

/// Render an output value as plain text (strings without quotes).
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_fenced(text: &str) -> Option<String> {
    FENCED_JSON
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
}

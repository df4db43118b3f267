//! System prompt composition.

use super::definition::OutputContract;

/// Formatting directive for agents with a best-effort JSON contract.
pub const JSON_DIRECTIVE: &str = "Respond with a single JSON object and nothing else. \
Do not wrap it in prose or explanations.";

/// System prompt template used when a formatting directive applies.
pub const SYSTEM_PROMPT_TEMPLATE: &str = r#"{system}

<format>
{directive}
</format>"#;

/// Build the system message for an agent.
///
/// Schema-enforced contracts are carried in the request itself, so only the
/// best-effort contract changes the prompt text.
pub fn system_prompt(instructions: &str, contract: Option<&OutputContract>) -> String {
    match contract {
        Some(OutputContract::BestEffortJson) => SYSTEM_PROMPT_TEMPLATE
            .replace("{system}", instructions)
            .replace("{directive}", JSON_DIRECTIVE),
        Some(OutputContract::SchemaEnforced { .. }) | None => instructions.to_string(),
    }
}

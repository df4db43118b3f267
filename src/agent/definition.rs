//! Agent definitions.

use super::tools::ToolSpec;
use serde::Serialize;
use serde_json::Value;

/// How the completion API should choose between tools and plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool
    Auto,
    /// The model must call a tool
    Required,
}

/// Contract on the shape of an agent's final text output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputContract {
    /// Parse the content as JSON if possible, otherwise keep the raw text.
    BestEffortJson,
    /// The completion API is asked to enforce `schema`; content that does
    /// not parse or does not match is a contract violation.
    SchemaEnforced { name: String, schema: Value },
}

impl OutputContract {
    /// Schema-enforced contract with the given schema name.
    pub fn schema(name: impl Into<String>, schema: Value) -> Self {
        Self::SchemaEnforced {
            name: name.into(),
            schema,
        }
    }
}

/// Immutable description of one logical agent.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    /// Name used in logs and trace spans
    pub name: String,
    /// System instructions sent with every request
    pub instructions: String,
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Tools the model may call, in declaration order
    pub tools: Vec<ToolSpec>,
    pub output_contract: Option<OutputContract>,
    pub tool_choice: Option<ToolChoice>,
    /// Temperature for LLM sampling
    pub temperature: Option<f32>,
    /// Maximum tokens for LLM response
    pub max_tokens: Option<u32>,
}

impl AgentDefinition {
    /// Create a definition with the given name, instructions and model.
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: model.into(),
            tools: Vec::new(),
            output_contract: None,
            tool_choice: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Declare a tool. A later declaration with the same name replaces the
    /// earlier one, keeping names unique.
    pub fn tool(mut self, spec: ToolSpec) -> Self {
        self.tools.retain(|t| t.name != spec.name);
        self.tools.push(spec);
        self
    }

    /// Set the output contract.
    pub fn output(mut self, contract: OutputContract) -> Self {
        self.output_contract = Some(contract);
        self
    }

    /// Set the tool-choice policy.
    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Replace the model, keeping everything else.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let def = AgentDefinition::new("PlannerAgent", "Plan searches.", "gpt-4o-mini");
        assert_eq!(def.name, "PlannerAgent");
        assert!(def.tools.is_empty());
        assert!(def.output_contract.is_none());
        assert!(def.tool_choice.is_none());
        assert!(def.max_tokens.is_none());
    }

    #[test]
    fn test_duplicate_tool_replaces() {
        let def = AgentDefinition::new("a", "b", "c")
            .tool(ToolSpec::new("web_search", "first"))
            .tool(ToolSpec::new("send_email", "mail"))
            .tool(ToolSpec::new("web_search", "second"));

        let names: Vec<&str> = def.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["send_email", "web_search"]);
        assert_eq!(def.tools[1].description, "second");
    }

    #[test]
    fn test_tool_choice_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ToolChoice::Auto).unwrap(), "\"auto\"");
        assert_eq!(
            serde_json::to_string(&ToolChoice::Required).unwrap(),
            "\"required\""
        );
    }
}

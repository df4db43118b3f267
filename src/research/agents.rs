//! Default agent definitions for the research workflow.

use crate::agent::{AgentDefinition, OutputContract, ToolChoice, ToolSpec};
use serde_json::{json, Value};

/// Number of searches the planner is asked for
pub const HOW_MANY_SEARCHES: usize = 5;

pub const PLANNER_NAME: &str = "PlannerAgent";
pub const SEARCH_NAME: &str = "Search agent";
pub const WRITER_NAME: &str = "WriterAgent";
pub const EMAIL_NAME: &str = "Email agent";

pub const WEB_SEARCH_TOOL: &str = "web_search";
pub const SEND_EMAIL_TOOL: &str = "send_email";

// ═══════════════════════════════════════════════════════════════════════════
// PLANNER
// ═══════════════════════════════════════════════════════════════════════════

fn planner_instructions() -> String {
    format!(
        "You are a research assistant. Given a query, decide which web searches \
         would best answer it. Produce exactly {HOW_MANY_SEARCHES} search terms, each with a \
         short reason explaining what it contributes to the answer."
    )
}

/// JSON schema for [`WebSearchPlan`](super::WebSearchPlan).
pub fn web_search_plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "searches": {
                "type": "array",
                "description": "The web searches to perform",
                "items": {
                    "type": "object",
                    "properties": {
                        "reason": {
                            "type": "string",
                            "description": "Why this search matters to the query"
                        },
                        "query": {
                            "type": "string",
                            "description": "The search term"
                        }
                    },
                    "required": ["reason", "query"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["searches"],
        "additionalProperties": false
    })
}

pub fn planner(model: &str) -> AgentDefinition {
    AgentDefinition::new(PLANNER_NAME, planner_instructions(), model)
        .output(OutputContract::schema("web_search_plan", web_search_plan_schema()))
}

// ═══════════════════════════════════════════════════════════════════════════
// SEARCH
// ═══════════════════════════════════════════════════════════════════════════

/// The tool result is the agent's output, so the model only picks the term.
const SEARCH_INSTRUCTIONS: &str = "You are a research assistant. You are given a search term \
and the reason it matters. Call the web_search tool exactly once with a query that will find \
the most relevant sources for that term. Keep the query short and specific; do not answer the \
question yourself.";

pub fn web_search_tool() -> ToolSpec {
    ToolSpec::new(WEB_SEARCH_TOOL, "Search the web for information on a topic")
        .arg_required("query", "string", "The search query to execute")
}

pub fn search(model: &str) -> AgentDefinition {
    AgentDefinition::new(SEARCH_NAME, SEARCH_INSTRUCTIONS, model)
        .tool(web_search_tool())
        .tool_choice(ToolChoice::Required)
}

// ═══════════════════════════════════════════════════════════════════════════
// WRITER
// ═══════════════════════════════════════════════════════════════════════════

const WRITER_INSTRUCTIONS: &str = "You are a senior researcher writing a cohesive report for a \
research query. You receive the original query and notes gathered by a research assistant.\n\n\
Outline the structure and flow of the report first, then write the full report in markdown. \
It should be long and detailed: 5-10 pages, at least 1000 words.";

/// JSON schema for [`ReportData`](super::ReportData).
pub fn report_data_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "shortSummary": {
                "type": "string",
                "description": "A 2-3 sentence summary of the findings"
            },
            "markdownReport": {
                "type": "string",
                "description": "The final report"
            },
            "followUpQuestions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Suggested topics to research further"
            }
        },
        "required": ["shortSummary", "markdownReport", "followUpQuestions"],
        "additionalProperties": false
    })
}

pub fn writer(model: &str) -> AgentDefinition {
    AgentDefinition::new(WRITER_NAME, WRITER_INSTRUCTIONS, model)
        .output(OutputContract::schema("report_data", report_data_schema()))
}

// ═══════════════════════════════════════════════════════════════════════════
// EMAIL
// ═══════════════════════════════════════════════════════════════════════════

const EMAIL_INSTRUCTIONS: &str = "You send a well formatted HTML email based on a detailed \
report. Use your tool exactly once: convert the report into clean, readable HTML and choose a \
fitting subject line.";

pub fn send_email_tool() -> ToolSpec {
    ToolSpec::new(SEND_EMAIL_TOOL, "Send an email with the given subject and HTML body")
        .arg_required("subject", "string", "The subject of the email")
        .arg_required("htmlBody", "string", "The HTML body of the email")
}

pub fn email(model: &str) -> AgentDefinition {
    AgentDefinition::new(EMAIL_NAME, EMAIL_INSTRUCTIONS, model)
        .tool(send_email_tool())
        .tool_choice(ToolChoice::Required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{ReportData, WebSearchPlan};

    #[test]
    fn test_schemas_compile_and_accept_typed_values() {
        let plan = WebSearchPlan {
            searches: vec![crate::research::WebSearchItem {
                reason: "background".to_string(),
                query: "telegraph".to_string(),
            }],
        };
        let validator = jsonschema::validator_for(&web_search_plan_schema()).unwrap();
        assert!(validator.is_valid(&serde_json::to_value(&plan).unwrap()));

        let report = ReportData {
            short_summary: "s".to_string(),
            markdown_report: "# r".to_string(),
            follow_up_questions: vec![],
        };
        let validator = jsonschema::validator_for(&report_data_schema()).unwrap();
        assert!(validator.is_valid(&serde_json::to_value(&report).unwrap()));
        assert!(!validator.is_valid(&json!({"markdownReport": "# r"})));
    }

    #[test]
    fn test_planner_asks_for_five_searches() {
        let def = planner("gpt-4o-mini");
        assert_eq!(def.name, PLANNER_NAME);
        assert!(def.instructions.contains("exactly 5"));
        assert!(matches!(
            def.output_contract,
            Some(OutputContract::SchemaEnforced { ref name, .. }) if name == "web_search_plan"
        ));
    }

    #[test]
    fn test_tool_agents_require_their_tool() {
        let search = search("m");
        assert_eq!(search.tools[0].name, WEB_SEARCH_TOOL);
        assert_eq!(search.tool_choice, Some(ToolChoice::Required));

        assert!(search.instructions.contains(WEB_SEARCH_TOOL));
        assert!(!search.instructions.contains("paragraphs"));

        let email = email("m");
        assert_eq!(email.tools[0].required, vec!["subject", "htmlBody"]);
        assert!(email.output_contract.is_none());
    }
}

//! Data passed between the research stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One planned search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchItem {
    /// Why this search matters to the query
    pub reason: String,
    /// The search term
    pub query: String,
}

/// The planner's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchPlan {
    pub searches: Vec<WebSearchItem>,
}

/// The writer's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub short_summary: String,
    pub markdown_report: String,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

/// An item of the pipeline's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchUpdate {
    /// Human-readable progress
    Progress(String),
    /// The final markdown report; always the last successful item
    Report(String),
}

impl ResearchUpdate {
    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress(message.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Progress(s) | Self::Report(s) => s,
        }
    }

    pub fn is_report(&self) -> bool {
        matches!(self, Self::Report(_))
    }
}

impl fmt::Display for ResearchUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_data_uses_camel_case() {
        let report: ReportData = serde_json::from_value(json!({
            "shortSummary": "Telegraphs changed news.",
            "markdownReport": "# Telegraph",
            "followUpQuestions": ["What replaced it?"]
        }))
        .unwrap();
        assert_eq!(report.markdown_report, "# Telegraph");
        assert_eq!(report.follow_up_questions.len(), 1);

        let missing_questions: ReportData = serde_json::from_value(json!({
            "shortSummary": "s",
            "markdownReport": "m"
        }))
        .unwrap();
        assert!(missing_questions.follow_up_questions.is_empty());
    }

    #[test]
    fn test_plan_requires_searches() {
        assert!(serde_json::from_value::<WebSearchPlan>(json!({"queries": []})).is_err());
        let plan: WebSearchPlan = serde_json::from_value(json!({
            "searches": [{"reason": "background", "query": "telegraph invention"}]
        }))
        .unwrap();
        assert_eq!(plan.searches[0].query, "telegraph invention");
    }

    #[test]
    fn test_update_display() {
        let update = ResearchUpdate::progress("Starting research...");
        assert_eq!(update.to_string(), "Starting research...");
        assert!(!update.is_report());
        assert!(ResearchUpdate::Report("# r".to_string()).is_report());
    }
}

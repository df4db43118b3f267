//! Web search and email tool handlers.
//!
//! Both handlers call their provider with `ureq` on the blocking thread
//! pool. Provider failures are returned as tool errors, so the pipeline's
//! recovery policy decides what happens next.

use crate::agent::{tool_error, ToolHandler};
use crate::config::EmailConfig;
use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

fn http_agent(timeout: Option<Duration>) -> ureq::Agent {
    match timeout {
        Some(timeout) => ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into(),
        None => ureq::Agent::new_with_defaults(),
    }
}

fn string_arg(args: &Value, name: &str) -> Result<String, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| tool_error(format!("missing string argument '{}'", name)))
}

fn http_error(provider: &str, err: ureq::Error) -> ToolError {
    match err {
        ureq::Error::StatusCode(code) => tool_error(format!("{} returned HTTP {}", provider, code)),
        other => tool_error(format!("{} request failed: {}", provider, other)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXA SEARCH
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest {
    query: String,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: &'static str,
    contents: ExaContents,
}

#[derive(Serialize)]
struct ExaContents {
    text: ExaTextConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextConfig {
    max_characters: u32,
}

#[derive(Deserialize)]
struct ExaSearchResponse {
    results: Vec<ExaResult>,
}

#[derive(Deserialize)]
struct ExaResult {
    title: Option<String>,
    url: String,
    text: Option<String>,
}

/// `web_search` backed by the Exa search API.
///
/// Takes `{"query": string}` and returns a list of
/// `{"title", "url", "text"}` objects. The search agent's output is this
/// list unsummarized, so `num_results` and `max_characters` bound what the
/// writer receives per search.
#[derive(Clone)]
pub struct ExaSearch {
    api_key: Option<String>,
    num_results: u32,
    max_characters: u32,
    http: ureq::Agent,
}

impl ExaSearch {
    /// Without an API key every call fails with a tool error.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            num_results: 5,
            max_characters: 2000,
            http: http_agent(None),
        }
    }

    /// Number of results per search (clamped to 1-10).
    pub fn num_results(mut self, n: u32) -> Self {
        self.num_results = n.clamp(1, 10);
        self
    }

    /// Characters of page text kept per result.
    pub fn max_characters(mut self, n: u32) -> Self {
        self.max_characters = n;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http = http_agent(Some(timeout));
        self
    }

    fn build_request(&self, query: String) -> ExaSearchRequest {
        ExaSearchRequest {
            query,
            num_results: self.num_results,
            search_type: "auto",
            contents: ExaContents {
                text: ExaTextConfig {
                    max_characters: self.max_characters,
                },
            },
        }
    }
}

#[async_trait]
impl ToolHandler for ExaSearch {
    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let query = string_arg(&args, "query")?;
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| tool_error("EXA_API_KEY not set"))?;

        info!(query = %query, "Searching the web");
        let request = self.build_request(query);
        let http = self.http.clone();

        let response = tokio::task::spawn_blocking(move || {
            http.post(EXA_SEARCH_URL)
                .header("x-api-key", &api_key)
                .header("Content-Type", "application/json")
                .send_json(&request)
                .and_then(|mut resp| resp.body_mut().read_json::<ExaSearchResponse>())
        })
        .await
        .map_err(|e| tool_error(format!("search task failed: {}", e)))?
        .map_err(|e| http_error("Exa", e))?;

        debug!(results = response.results.len(), "Search finished");
        let results: Vec<Value> = response
            .results
            .into_iter()
            .map(|r| {
                json!({
                    "title": r.title.unwrap_or_default(),
                    "url": r.url,
                    "text": r.text.unwrap_or_default(),
                })
            })
            .collect();
        Ok(Value::Array(results))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SENDGRID
// ═══════════════════════════════════════════════════════════════════════════

/// `send_email` backed by the SendGrid v3 API.
///
/// Takes `{"subject": string, "htmlBody": string}` and returns
/// `{"status": "success"}` once SendGrid accepts the message.
#[derive(Clone)]
pub struct SendGridMailer {
    config: EmailConfig,
    http: ureq::Agent,
}

impl SendGridMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            http: http_agent(None),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http = http_agent(Some(timeout));
        self
    }

    fn build_body(&self, subject: &str, html_body: &str) -> Value {
        json!({
            "personalizations": [{ "to": [{ "email": self.config.to }] }],
            "from": { "email": self.config.from },
            "subject": subject,
            "content": [{ "type": "text/html", "value": html_body }],
        })
    }
}

#[async_trait]
impl ToolHandler for SendGridMailer {
    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let subject = string_arg(&args, "subject")?;
        let html_body = string_arg(&args, "htmlBody")?;

        info!(subject = %subject, to = %self.config.to, "Sending email");
        let body = self.build_body(&subject, &html_body);
        let auth = format!("Bearer {}", self.config.sendgrid_api_key);
        let http = self.http.clone();

        let status = tokio::task::spawn_blocking(move || {
            http.post(SENDGRID_SEND_URL)
                .header("Authorization", &auth)
                .header("Content-Type", "application/json")
                .send_json(&body)
                .map(|resp| resp.status().as_u16())
        })
        .await
        .map_err(|e| tool_error(format!("email task failed: {}", e)))?
        .map_err(|e| http_error("SendGrid", e))?;

        debug!(status, "Email accepted");
        Ok(json!({ "status": "success" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_config() -> EmailConfig {
        EmailConfig {
            sendgrid_api_key: "sg-test".to_string(),
            from: "noreply@example.com".to_string(),
            to: "user@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_search_without_key_fails() {
        let err = ExaSearch::new(None)
            .call(json!({"query": "telegraph"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "EXA_API_KEY not set");
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let err = ExaSearch::new(Some("exa-test".to_string()))
            .call(json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'query'"));
    }

    #[test]
    fn test_search_request_shape() {
        let search = ExaSearch::new(None).num_results(50).max_characters(500);
        let body = serde_json::to_value(search.build_request("telegraph".to_string())).unwrap();
        assert_eq!(
            body,
            json!({
                "query": "telegraph",
                "numResults": 10,
                "type": "auto",
                "contents": { "text": { "maxCharacters": 500 } }
            })
        );
    }

    #[tokio::test]
    async fn test_email_requires_both_fields() {
        let mailer = SendGridMailer::new(email_config());
        let err = mailer.call(json!({"subject": "Report"})).await.unwrap_err();
        assert!(err.to_string().contains("'htmlBody'"));
    }

    #[test]
    fn test_email_body_shape() {
        let body = SendGridMailer::new(email_config()).build_body("Report", "<h1>Telegraph</h1>");
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "user@example.com");
        assert_eq!(body["from"]["email"], "noreply@example.com");
        assert_eq!(body["subject"], "Report");
        assert_eq!(body["content"][0]["type"], "text/html");
        assert_eq!(body["content"][0]["value"], "<h1>Telegraph</h1>");
    }
}

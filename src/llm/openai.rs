//! OpenAI-compatible chat-completions client.

use super::{CompletionClient, CompletionRequest, CompletionResponse, TokenUsage, ToolCall};
use crate::agent::{OutputContract, ToolChoice};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    id: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Client for any endpoint that speaks `POST /chat/completions`.
///
/// Requests are sent with `ureq` on the blocking thread pool.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    http: ureq::Agent,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            http: ureq::Agent::new_with_defaults(),
        }
    }

    /// Point the client at a different OpenAI-compatible endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a global timeout for each HTTP request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    fn build_body(request: &CompletionRequest) -> ChatRequest {
        let (tools, tool_choice) = if request.tools.is_empty() {
            (Vec::new(), None)
        } else {
            (
                request
                    .tools
                    .iter()
                    .map(|t| t.to_function_declaration())
                    .collect(),
                request.tool_choice,
            )
        };

        let response_format = match &request.output_contract {
            Some(OutputContract::SchemaEnforced { name, schema }) => Some(json!({
                "type": "json_schema",
                "json_schema": {
                    "name": name,
                    "schema": schema,
                    "strict": true,
                }
            })),
            Some(OutputContract::BestEffortJson) | None => None,
        };

        ChatRequest {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_message.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user_message.clone(),
                },
            ],
            tools,
            tool_choice,
            response_format,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl ChatResponse {
    fn into_completion(self) -> Result<CompletionResponse> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Transport("no choices in completion response".to_string()))?;

        Ok(CompletionResponse {
            id: self.id,
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|c| ToolCall {
                    name: c.function.name,
                    arguments: c.function.arguments,
                })
                .collect(),
            usage: self.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = Self::build_body(request);
        let url = format!("{}/chat/completions", self.base_url);
        let auth = format!("Bearer {}", self.api_key);
        let http = self.http.clone();

        let response = tokio::task::spawn_blocking(move || {
            let mut resp = http
                .post(&url)
                .header("Authorization", &auth)
                .header("Content-Type", "application/json")
                .send_json(&body)?;
            resp.body_mut().read_json::<ChatResponse>()
        })
        .await
        .map_err(|e| Error::Transport(format!("completion task failed: {}", e)))?;

        match response {
            Ok(data) => data.into_completion(),
            Err(ureq::Error::StatusCode(code)) => Err(Error::Transport(format!(
                "completion API returned HTTP {}",
                code
            ))),
            Err(e) => Err(Error::Transport(format!("completion request failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolSpec;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            system_message: "Be brief.".to_string(),
            user_message: "Query: rust".to_string(),
            tools: Vec::new(),
            tool_choice: None,
            output_contract: None,
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_body_has_system_and_user_messages() {
        let json = serde_json::to_value(OpenAiClient::build_body(&request())).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Be brief.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "Query: rust");

        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert!(json.get("response_format").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_body_declares_tools_and_choice() {
        let mut req = request();
        req.tools = vec![
            ToolSpec::new("web_search", "Search the web for information")
                .arg_required("query", "string", "The search query to execute"),
        ];
        req.tool_choice = Some(ToolChoice::Required);

        let json = serde_json::to_value(OpenAiClient::build_body(&req)).unwrap();
        assert_eq!(json["tool_choice"], "required");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "web_search");
        assert_eq!(
            json["tools"][0]["function"]["parameters"]["required"][0],
            "query"
        );
    }

    #[test]
    fn test_tool_choice_dropped_without_tools() {
        let mut req = request();
        req.tool_choice = Some(ToolChoice::Auto);

        let json = serde_json::to_value(OpenAiClient::build_body(&req)).unwrap();
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn test_schema_contract_sets_response_format() {
        let mut req = request();
        req.output_contract = Some(OutputContract::SchemaEnforced {
            name: "plan".to_string(),
            schema: json!({"type": "object"}),
        });

        let json = serde_json::to_value(OpenAiClient::build_body(&req)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "plan");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "web_search", "arguments": "{\"query\":\"telegraph\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 7, "total_tokens": 27}
        }"#;

        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let completion = parsed.into_completion().unwrap();
        assert_eq!(completion.id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(completion.content, None);
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].name, "web_search");
        assert_eq!(completion.usage.unwrap().total_tokens, 27);
    }

    #[test]
    fn test_parse_response_without_choices_fails() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(parsed.into_completion(), Err(Error::Transport(_))));
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let client = OpenAiClient::new("sk-test").base_url("http://localhost:11434/v1/");
        assert_eq!(client.base_url, "http://localhost:11434/v1");
    }
}

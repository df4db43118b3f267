//! Completion API boundary.
//!
//! The runtime treats the completion API as a single opaque call: one
//! request in, one message or tool call out. [`CompletionClient`] is the
//! seam; [`OpenAiClient`] speaks the OpenAI chat-completions wire format.

mod openai;

pub use openai::OpenAiClient;

use crate::agent::{OutputContract, ToolChoice, ToolSpec};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One request to the completion API.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_message: String,
    pub user_message: String,
    /// Tool declarations, empty when the agent has no tools
    pub tools: Vec<ToolSpec>,
    pub tool_choice: Option<ToolChoice>,
    pub output_contract: Option<OutputContract>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    /// Raw JSON argument payload, exactly as returned by the API
    pub arguments: String,
}

/// Token accounting, when the API reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The completion API's answer: message content, tool calls, or both.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub id: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

#[async_trait]
impl<C: CompletionClient + ?Sized> CompletionClient for Arc<C> {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        (**self).complete(request).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted completion client for tests.

    use super::*;
    use std::sync::Mutex;

    type Respond = dyn Fn(&CompletionRequest) -> Result<CompletionResponse> + Send + Sync;

    /// Answers every request with a closure and records what it saw.
    pub(crate) struct ScriptedClient {
        respond: Box<Respond>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        pub(crate) fn new<F>(respond: F) -> Arc<Self>
        where
            F: Fn(&CompletionRequest) -> Result<CompletionResponse> + Send + Sync + 'static,
        {
            Arc::new(Self {
                respond: Box::new(respond),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            tokio::task::yield_now().await;
            (self.respond)(request)
        }
    }

    pub(crate) fn text(content: &str) -> CompletionResponse {
        CompletionResponse {
            id: Some("chatcmpl-test".to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn tool_call(name: &str, arguments: &str) -> CompletionResponse {
        CompletionResponse {
            id: Some("chatcmpl-test".to_string()),
            content: None,
            tool_calls: vec![ToolCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        }
    }
}

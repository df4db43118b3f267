//! Agent events and callbacks for observability.

use crate::llm::TokenUsage;
use serde_json::Value;
use std::sync::Arc;

/// Events emitted during one agent execution.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// About to call the completion API
    LLMRequest {
        agent: String,
        model: String,
        input_len: usize,
        tool_count: usize,
    },
    /// The completion API responded
    LLMResponse {
        response_id: Option<String>,
        content: Option<String>,
        usage: Option<TokenUsage>,
    },
    /// A tool is about to be invoked
    ToolCall { name: String, arguments: Value },
    /// A tool returned a value
    ToolResult { name: String, result: Value },
    /// The execution produced its final output
    Finish { value: Value },
    /// An error occurred
    Error { message: String },
}

/// Type alias for event callbacks
pub type EventCallback = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

/// Storage for agent callbacks
#[derive(Default, Clone)]
pub struct AgentCallbacks {
    pub on_llm_request: Option<EventCallback>,
    pub on_llm_response: Option<EventCallback>,
    pub on_tool_call: Option<EventCallback>,
    pub on_tool_result: Option<EventCallback>,
    pub on_finish: Option<EventCallback>,
    pub on_error: Option<EventCallback>,
    /// Catch-all callback for any event
    pub on_event: Option<EventCallback>,
}

impl AgentCallbacks {
    /// Emit an event to the appropriate callback(s)
    pub fn emit(&self, event: &AgentEvent) {
        let specific = match event {
            AgentEvent::LLMRequest { .. } => &self.on_llm_request,
            AgentEvent::LLMResponse { .. } => &self.on_llm_response,
            AgentEvent::ToolCall { .. } => &self.on_tool_call,
            AgentEvent::ToolResult { .. } => &self.on_tool_result,
            AgentEvent::Finish { .. } => &self.on_finish,
            AgentEvent::Error { .. } => &self.on_error,
        };

        if let Some(cb) = specific {
            cb(event);
        }

        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }
}

/// Callbacks that print a one-line summary of each event to stderr.
pub fn verbose_callbacks() -> AgentCallbacks {
    AgentCallbacks {
        on_llm_request: Some(Arc::new(|e| {
            if let AgentEvent::LLMRequest { agent, model, .. } = e {
                eprintln!("[quarry] {} -> {}", agent, model);
            }
        })),
        on_llm_response: Some(Arc::new(|e| {
            if let AgentEvent::LLMResponse { content, .. } = e {
                let content = content.as_deref().unwrap_or("<tool call>");
                let preview: String = content.chars().take(100).collect();
                let suffix = if content.chars().count() > 100 { "..." } else { "" };
                eprintln!("[quarry] LLM: {}{}", preview.replace('\n', "\\n"), suffix);
            }
        })),
        on_tool_call: Some(Arc::new(|e| {
            if let AgentEvent::ToolCall { name, arguments } = e {
                eprintln!("[quarry] Tool: {}({})", name, arguments);
            }
        })),
        on_finish: Some(Arc::new(|e| {
            if let AgentEvent::Finish { value } = e {
                let rendered = value.to_string();
                let preview: String = rendered.chars().take(80).collect();
                let suffix = if rendered.chars().count() > 80 { "..." } else { "" };
                eprintln!("[quarry] Finish: {}{}", preview, suffix);
            }
        })),
        on_error: Some(Arc::new(|e| {
            if let AgentEvent::Error { message } = e {
                eprintln!("[quarry] Error: {}", message);
            }
        })),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_specific_and_catch_all_both_fire() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let specific = seen.clone();
        let all = seen.clone();

        let callbacks = AgentCallbacks {
            on_tool_call: Some(Arc::new(move |_| specific.lock().unwrap().push("tool"))),
            on_event: Some(Arc::new(move |_| all.lock().unwrap().push("any"))),
            ..Default::default()
        };

        callbacks.emit(&AgentEvent::ToolCall {
            name: "web_search".to_string(),
            arguments: Value::Null,
        });
        callbacks.emit(&AgentEvent::Error {
            message: "x".to_string(),
        });

        assert_eq!(*seen.lock().unwrap(), vec!["tool", "any", "any"]);
    }

    #[test]
    fn test_verbose_leaves_catch_all_free() {
        let callbacks = verbose_callbacks();
        assert!(callbacks.on_event.is_none());
        assert!(callbacks.on_error.is_some());
        assert!(callbacks.on_tool_result.is_none());
    }
}

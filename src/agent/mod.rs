//! Single-shot agent runtime.
//!
//! An [`AgentRuntime`] executes one [`AgentDefinition`] against a
//! [`CompletionClient`]: one request, at most one tool call, one result.
//! There is no conversation loop; a tool's return value is the final output.

mod convert;
mod definition;
mod events;
mod prompt;
mod tools;

pub use convert::value_to_text;
pub use definition::{AgentDefinition, OutputContract, ToolChoice};
pub use events::{verbose_callbacks, AgentCallbacks, AgentEvent, EventCallback};
pub use tools::{handler_fn, tool_error, FnHandler, ToolHandler, ToolRegistry, ToolSpec};

use crate::error::{Error, Result};
use crate::llm::{CompletionClient, CompletionRequest, ToolCall};
use crate::trace::{SpanHandle, TraceContext};
use convert::{parse_best_effort, parse_enforced};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// The terminal value of one agent execution.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResult<T = Value> {
    pub final_output: T,
    /// Trace id of the run this execution belonged to, if any
    pub trace_id: Option<String>,
}

impl AgentResult<Value> {
    /// Assert that the output has the shape `T`.
    pub fn parse<T: DeserializeOwned>(self, agent: &str) -> Result<AgentResult<T>> {
        let final_output =
            serde_json::from_value(self.final_output).map_err(|e| Error::UnexpectedOutput {
                agent: agent.to_string(),
                message: e.to_string(),
            })?;
        Ok(AgentResult {
            final_output,
            trace_id: self.trace_id,
        })
    }

    /// The output as plain text.
    pub fn text(&self) -> String {
        value_to_text(&self.final_output)
    }
}

/// Executes one agent definition against a completion client.
pub struct AgentRuntime {
    definition: AgentDefinition,
    client: Arc<dyn CompletionClient>,
    registry: ToolRegistry,
    validator: Option<jsonschema::Validator>,
    callbacks: AgentCallbacks,
}

impl AgentRuntime {
    /// Create a runtime for `definition`.
    ///
    /// Fails if a schema-enforced contract carries an invalid JSON schema.
    pub fn new(definition: AgentDefinition, client: Arc<dyn CompletionClient>) -> Result<Self> {
        let validator = match &definition.output_contract {
            Some(OutputContract::SchemaEnforced { name, schema }) => Some(
                jsonschema::validator_for(schema).map_err(|e| {
                    Error::Config(format!(
                        "invalid output schema '{}' for agent '{}': {}",
                        name, definition.name, e
                    ))
                })?,
            ),
            _ => None,
        };

        Ok(Self {
            definition,
            client,
            registry: ToolRegistry::new(),
            validator,
            callbacks: AgentCallbacks::default(),
        })
    }

    // =========================================================================
    // Tool registration
    // =========================================================================

    /// Register a tool handler while building the runtime.
    pub fn with_tool<H: ToolHandler + 'static>(self, name: impl Into<String>, handler: H) -> Self {
        self.registry.register(name, handler);
        self
    }

    /// Register or replace a tool handler.
    pub fn register<H: ToolHandler + 'static>(&self, name: impl Into<String>, handler: H) {
        self.registry.register(name, handler);
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    // =========================================================================
    // Builder methods for callbacks
    // =========================================================================

    /// Print each event to stderr, replacing any callbacks already set.
    pub fn verbose(mut self, enabled: bool) -> Self {
        if enabled {
            self.callbacks = verbose_callbacks();
        }
        self
    }

    /// Set a callback for tool call events.
    pub fn on_tool_call<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_tool_call = Some(Arc::new(f));
        self
    }

    /// Set a callback for finish events.
    pub fn on_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_finish = Some(Arc::new(f));
        self
    }

    /// Set a callback for error events.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Arc::new(f));
        self
    }

    /// Set a catch-all callback for any event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_event = Some(Arc::new(f));
        self
    }

    fn emit(&self, event: AgentEvent) {
        self.callbacks.emit(&event);
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Build the completion request for `input`.
    pub fn build_request(&self, input: &str) -> CompletionRequest {
        let def = &self.definition;
        CompletionRequest {
            model: def.model.clone(),
            system_message: prompt::system_prompt(&def.instructions, def.output_contract.as_ref()),
            user_message: input.to_string(),
            tools: def.tools.clone(),
            tool_choice: if def.tools.is_empty() {
                None
            } else {
                def.tool_choice
            },
            output_contract: def.output_contract.clone(),
            temperature: def.temperature,
            max_tokens: def.max_tokens,
        }
    }

    /// Execute the agent once.
    ///
    /// When `trace` is `None` the ambient trace of the current task is used,
    /// if there is one. The execution is recorded as an `agent:<name>` span.
    pub async fn execute(&self, input: &str, trace: Option<&TraceContext>) -> Result<AgentResult> {
        let trace = trace.cloned().or_else(TraceContext::current);
        let trace_id = trace
            .as_ref()
            .map(|t| t.trace_id().to_string())
            .unwrap_or_default();

        let tracing_span = info_span!(
            "agent",
            agent.name = %self.definition.name,
            agent.model = %self.definition.model,
            trace_id = %trace_id,
        );

        let span = trace
            .as_ref()
            .map(|t| t.begin(format!("agent:{}", self.definition.name)));

        let result = self
            .execute_inner(input, trace.as_ref(), span.as_ref())
            .instrument(tracing_span)
            .await;

        if let Err(e) = &result {
            self.emit(AgentEvent::Error {
                message: e.to_string(),
            });
        }
        if let Some(span) = span {
            if let Err(e) = &result {
                span.error(e);
            }
            span.end();
        }

        result
    }

    async fn execute_inner(
        &self,
        input: &str,
        trace: Option<&TraceContext>,
        span: Option<&SpanHandle>,
    ) -> Result<AgentResult> {
        let def = &self.definition;
        let request = self.build_request(input);

        self.emit(AgentEvent::LLMRequest {
            agent: def.name.clone(),
            model: def.model.clone(),
            input_len: input.len(),
            tool_count: request.tools.len(),
        });
        info!(input_len = input.len(), tools = request.tools.len(), "Starting completion call");

        let response = self.client.complete(&request).await?;

        info!(
            response_id = response.id.as_deref().unwrap_or(""),
            prompt_tokens = response.usage.map(|u| u.prompt_tokens),
            completion_tokens = response.usage.map(|u| u.completion_tokens),
            tool_calls = response.tool_calls.len(),
            "Completion call finished"
        );
        if let Some(span) = span {
            span.log(
                "completion finished",
                Some(json!({
                    "model": def.model,
                    "input_len": input.len(),
                    "response_id": response.id,
                    "total_tokens": response.usage.map(|u| u.total_tokens),
                })),
            );
        }
        self.emit(AgentEvent::LLMResponse {
            response_id: response.id.clone(),
            content: response.content.clone(),
            usage: response.usage,
        });

        let trace_id = trace.map(|t| t.trace_id().to_string());

        if response.tool_calls.len() > 1 {
            debug!(
                ignored = response.tool_calls.len() - 1,
                "Only the first tool call is executed"
            );
        }
        if let Some(call) = response.tool_calls.into_iter().next() {
            let value = self.dispatch(call, trace, span).await?;
            self.emit(AgentEvent::Finish {
                value: value.clone(),
            });
            return Ok(AgentResult {
                final_output: value,
                trace_id,
            });
        }

        let content = response.content.unwrap_or_default();
        let value = match &def.output_contract {
            None => Value::String(content),
            Some(OutputContract::BestEffortJson) => parse_best_effort(&content),
            Some(OutputContract::SchemaEnforced { .. }) => {
                parse_enforced(&def.name, &content, self.validator.as_ref())?
            }
        };

        self.emit(AgentEvent::Finish {
            value: value.clone(),
        });
        Ok(AgentResult {
            final_output: value,
            trace_id,
        })
    }

    /// Run the handler for a tool call and return its value.
    async fn dispatch(
        &self,
        call: ToolCall,
        trace: Option<&TraceContext>,
        span: Option<&SpanHandle>,
    ) -> Result<Value> {
        info!(tool = %call.name, "Dispatching tool call");
        if let Some(span) = span {
            span.log(format!("tool call: {}", call.name), None);
        }

        let handler = self
            .registry
            .resolve(&call.name)
            .ok_or_else(|| Error::UnknownTool(call.name.clone()))?;

        let args: Value = serde_json::from_str(&call.arguments).map_err(|source| {
            Error::MalformedToolArguments {
                tool: call.name.clone(),
                source,
            }
        })?;

        self.emit(AgentEvent::ToolCall {
            name: call.name.clone(),
            arguments: args.clone(),
        });

        let outcome = match trace {
            Some(trace) => trace.scope(handler.call(args)).await,
            None => handler.call(args).await,
        };
        let value = outcome.map_err(|source| Error::ToolFailed {
            tool: call.name.clone(),
            source,
        })?;

        self.emit(AgentEvent::ToolResult {
            name: call.name,
            result: value.clone(),
        });
        Ok(value)
    }
}

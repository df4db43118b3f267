//! Error types for Quarry.

use thiserror::Error;

/// Opaque error returned by tool handlers.
pub type ToolError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while running agents and the research pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// The completion API was unreachable or returned an error
    #[error("Transport error: {0}")]
    Transport(String),

    /// The model called a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The model produced tool arguments that are not valid JSON
    #[error("Malformed arguments for tool '{tool}': {source}")]
    MalformedToolArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    /// A tool handler failed
    #[error("Tool '{tool}' failed: {source}")]
    ToolFailed {
        tool: String,
        #[source]
        source: ToolError,
    },

    /// Content returned under a schema-enforced contract did not conform
    #[error("Structured output violation in agent '{agent}': {message}")]
    StructuredOutputViolation { agent: String, message: String },

    /// An agent's final output did not have the expected shape
    #[error("Unexpected output from agent '{agent}': {message}")]
    UnexpectedOutput { agent: String, message: String },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was cancelled from outside
    #[error("Research run cancelled")]
    Cancelled,
}

/// Result type for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;

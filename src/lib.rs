//! Quarry - plan, search, write and deliver research reports
//!
//! Quarry drives a four-stage research workflow on top of single-shot LLM
//! agents. Each agent is executed exactly once per call: one completion
//! request, at most one tool call, one structured result.
//!
//! # Quick Start
//!
//! ```ignore
//! use futures::StreamExt;
//! use quarry::{ResearchConfig, ResearchPipeline, ResearchUpdate};
//!
//! #[tokio::main]
//! async fn main() -> quarry::Result<()> {
//!     let config = ResearchConfig::from_env()?;
//!     let pipeline = ResearchPipeline::from_config(&config)?;
//!
//!     let mut updates = pipeline.run("history of the telegraph");
//!     while let Some(update) = updates.next().await {
//!         match update? {
//!             ResearchUpdate::Progress(status) => eprintln!("{}", status),
//!             ResearchUpdate::Report(report) => println!("{}", report),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
mod error;
pub mod llm;
pub mod research;
mod trace;

pub use agent::{
    handler_fn, AgentDefinition, AgentResult, AgentRuntime, OutputContract, ToolChoice,
    ToolHandler, ToolRegistry, ToolSpec,
};
pub use config::{EmailConfig, ResearchConfig};
pub use error::{Error, Result, ToolError};
pub use llm::{CompletionClient, OpenAiClient};
pub use research::{
    ReportData, ResearchPipeline, ResearchStream, ResearchUpdate, WebSearchItem, WebSearchPlan,
};
pub use trace::{generate_trace_id, SpanHandle, TraceContext, TraceEvent, TraceEventKind};

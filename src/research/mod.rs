//! Research workflow built on single-shot agents.
//!
//! A [`ResearchPipeline`] plans a set of web searches for a query, runs them
//! concurrently, writes a markdown report from the summaries and optionally
//! emails it. Progress is reported as a stream of [`ResearchUpdate`]s.

pub mod agents;
mod pipeline;
pub mod tools;
mod types;

pub use pipeline::{ResearchPipeline, ResearchStream};
pub use types::{ReportData, ResearchUpdate, WebSearchItem, WebSearchPlan};

//! The research workflow: plan, search, write, deliver.

use super::agents;
use super::tools::{ExaSearch, SendGridMailer};
use super::types::{ReportData, ResearchUpdate, WebSearchItem, WebSearchPlan};
use crate::agent::AgentRuntime;
use crate::config::ResearchConfig;
use crate::error::{Error, Result};
use crate::llm::{CompletionClient, OpenAiClient};
use crate::trace::{SpanHandle, TraceContext};
use futures::future::join_all;
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Progress updates followed by the final report, or a terminal error.
pub type ResearchStream<'a> = Pin<Box<dyn Stream<Item = Result<ResearchUpdate>> + Send + 'a>>;

/// Orchestrates the planner, search, writer and delivery agents.
///
/// Searches run concurrently; a failed search is dropped from the results
/// and a failed delivery is logged, neither ends the run. Planner and
/// writer failures end the stream with an error.
pub struct ResearchPipeline {
    planner: AgentRuntime,
    searcher: AgentRuntime,
    writer: AgentRuntime,
    delivery: Option<AgentRuntime>,
    max_concurrent_searches: Option<usize>,
    cancel: Option<CancellationToken>,
}

impl ResearchPipeline {
    /// Create a pipeline without delivery.
    pub fn new(planner: AgentRuntime, searcher: AgentRuntime, writer: AgentRuntime) -> Self {
        Self {
            planner,
            searcher,
            writer,
            delivery: None,
            max_concurrent_searches: None,
            cancel: None,
        }
    }

    /// Build the default agents from configuration.
    ///
    /// Delivery is wired up only when `config.email` is set.
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let mut client = OpenAiClient::new(&config.openai_api_key).timeout(config.http_timeout);
        if let Some(url) = &config.openai_base_url {
            client = client.base_url(url);
        }
        let client: Arc<dyn CompletionClient> = Arc::new(client);
        let model = config.model.as_str();

        let planner = AgentRuntime::new(agents::planner(model), client.clone())?;
        let searcher = AgentRuntime::new(agents::search(model), client.clone())?.with_tool(
            agents::WEB_SEARCH_TOOL,
            ExaSearch::new(config.exa_api_key.clone()).timeout(config.http_timeout),
        );
        let writer = AgentRuntime::new(agents::writer(model), client.clone())?;

        let mut pipeline = Self::new(planner, searcher, writer);
        if let Some(email) = &config.email {
            let delivery = AgentRuntime::new(agents::email(model), client)?.with_tool(
                agents::SEND_EMAIL_TOOL,
                SendGridMailer::new(email.clone()).timeout(config.http_timeout),
            );
            pipeline = pipeline.with_delivery(delivery);
        }
        if let Some(limit) = config.max_concurrent_searches {
            pipeline = pipeline.max_concurrent_searches(limit);
        }
        Ok(pipeline)
    }

    /// Send the finished report with this agent.
    pub fn with_delivery(mut self, delivery: AgentRuntime) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Limit how many searches run at once (at least 1).
    pub fn max_concurrent_searches(mut self, limit: usize) -> Self {
        self.max_concurrent_searches = Some(limit.max(1));
        self
    }

    /// Abandon the run when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    // =========================================================================
    // Running
    // =========================================================================

    /// Run the workflow for `query` under a fresh trace.
    pub fn run(&self, query: impl Into<String>) -> ResearchStream<'_> {
        self.run_with_trace(query, TraceContext::new())
    }

    /// Run the workflow for `query`, recording into `trace`.
    pub fn run_with_trace(
        &self,
        query: impl Into<String>,
        trace: TraceContext,
    ) -> ResearchStream<'_> {
        Box::pin(self.updates(query.into(), trace))
    }

    fn updates(
        &self,
        query: String,
        trace: TraceContext,
    ) -> impl Stream<Item = Result<ResearchUpdate>> + Send + '_ {
        async_stream::try_stream! {
            let run = trace.begin("research");
            run.log("Starting research", Some(json!({ "query": query })));
            info!(trace_id = %trace.trace_id(), query = %query, "Starting research");

            yield ResearchUpdate::progress(format!("View trace: {}", trace.trace_id()));
            yield ResearchUpdate::progress("Starting research...");

            let plan = failed_on(&run, self.guard(self.plan_searches(&query, &trace)).await)?;
            yield ResearchUpdate::progress("Searches planned, starting to search...");

            let summaries = failed_on(
                &run,
                self.guard(async { Ok(self.perform_searches(&plan, &trace).await) }).await,
            )?;
            yield ResearchUpdate::progress("Searches complete, writing report...");

            let report = failed_on(
                &run,
                self.guard(self.write_report(&query, &summaries, &trace)).await,
            )?;

            // The report exists from here on; cancellation only cuts delivery short.
            match &self.delivery {
                Some(delivery) => {
                    yield ResearchUpdate::progress("Report written, sending email...");
                    let sent = self
                        .guard(async { Ok(self.send_report(delivery, &report, &trace).await) })
                        .await;
                    yield ResearchUpdate::progress(match sent {
                        Ok(true) => "Email sent, research complete",
                        Ok(false) => "Email failed, research complete",
                        Err(_) => {
                            warn!("Cancelled during delivery; returning the report");
                            run.log("Delivery cancelled", None);
                            "Email cancelled, research complete"
                        }
                    });
                }
                None => {
                    yield ResearchUpdate::progress(
                        "Report written, email skipped (no delivery configured)",
                    );
                    yield ResearchUpdate::progress("Research complete");
                }
            }

            info!(
                trace_id = %trace.trace_id(),
                elapsed_ms = trace.elapsed().as_millis() as u64,
                "Research complete"
            );
            run.end();
            yield ResearchUpdate::Report(report.markdown_report);
        }
    }

    /// Await `fut` unless the run is cancelled first.
    async fn guard<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                result = fut => result,
            },
            None => fut.await,
        }
    }

    // =========================================================================
    // Stages
    // =========================================================================

    async fn plan_searches(&self, query: &str, trace: &TraceContext) -> Result<WebSearchPlan> {
        let span = trace.begin("plan_searches");
        let input = format!("Query: {}", query);

        let plan = self
            .planner
            .execute(&input, Some(trace))
            .await?
            .parse::<WebSearchPlan>(self.planner.name())?
            .final_output;

        info!(searches = plan.searches.len(), "Will perform searches");
        if plan.searches.is_empty() {
            warn!("Planner returned no searches");
        }
        span.log(
            format!("Will perform {} searches", plan.searches.len()),
            Some(json!({ "searches": plan.searches })),
        );
        span.end();
        Ok(plan)
    }

    /// Run every planned search, returning the successful summaries in plan order.
    async fn perform_searches(&self, plan: &WebSearchPlan, trace: &TraceContext) -> Vec<String> {
        let span = trace.begin("perform_searches");
        let total = plan.searches.len();
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        let searches: Vec<_> = plan
            .searches
            .iter()
            .map(|item| async move {
                let summary = self.search(item, trace).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                info!("Searching... {}/{} completed", done, total);
                summary
            })
            .collect();

        let outcomes: Vec<Option<String>> = match self.max_concurrent_searches {
            Some(limit) => stream::iter(searches).buffered(limit).collect().await,
            None => join_all(searches).await,
        };

        let summaries: Vec<String> = outcomes.into_iter().flatten().collect();
        let failed = total - summaries.len();
        if summaries.is_empty() && total > 0 {
            warn!(total, "Every search failed; writing from an empty result set");
        }
        span.log(
            "Finished searching",
            Some(json!({ "succeeded": summaries.len(), "failed": failed })),
        );
        span.end();
        summaries
    }

    /// Run one search; a failure is logged and yields `None`.
    async fn search(&self, item: &WebSearchItem, trace: &TraceContext) -> Option<String> {
        let input = format!(
            "Search term: {}\nReason for searching: {}",
            item.query, item.reason
        );
        match self.searcher.execute(&input, Some(trace)).await {
            Ok(result) => Some(result.text()),
            Err(e) => {
                warn!(
                    query = %item.query,
                    error = %e,
                    "Search failed, excluding it from the report"
                );
                None
            }
        }
    }

    async fn write_report(
        &self,
        query: &str,
        summaries: &[String],
        trace: &TraceContext,
    ) -> Result<ReportData> {
        let span = trace.begin("write_report");
        info!("Thinking about report...");
        let input = format!(
            "Original query: {}\nSummarized search results: {}",
            query,
            summaries.join("\n\n")
        );

        let report = self
            .writer
            .execute(&input, Some(trace))
            .await?
            .parse::<ReportData>(self.writer.name())?
            .final_output;

        span.log(
            "Report written",
            Some(json!({
                "short_summary": report.short_summary,
                "follow_up_questions": report.follow_up_questions.len(),
            })),
        );
        span.end();
        Ok(report)
    }

    /// Deliver the report; returns whether delivery succeeded.
    async fn send_report(
        &self,
        delivery: &AgentRuntime,
        report: &ReportData,
        trace: &TraceContext,
    ) -> bool {
        let span = trace.begin("send_report");
        let sent = match delivery.execute(&report.markdown_report, Some(trace)).await {
            Ok(result) => {
                span.log("Email sent", Some(result.final_output));
                true
            }
            Err(e) => {
                warn!(error = %e, "Delivery failed; the report is still returned");
                span.log("Email failed", Some(json!({ "error": e.to_string() })));
                false
            }
        };
        span.end();
        sent
    }
}

/// Record a fatal stage error on the run span.
fn failed_on<T>(run: &SpanHandle, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        run.error(e);
    }
    result
}

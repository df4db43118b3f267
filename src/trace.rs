//! Correlation context for one research run.
//!
//! A [`TraceContext`] carries a trace id, a start time and an append-only
//! journal of span events. Every journal entry is also emitted as a
//! `tracing` event tagged with the trace id, so log lines from concurrent
//! runs can be told apart.
//!
//! The context can be passed explicitly, or installed for the duration of a
//! future with [`TraceContext::scope`] and read back with
//! [`TraceContext::current`].
//!
//! # Example
//!
//! ```ignore
//! use quarry::TraceContext;
//!
//! let trace = TraceContext::new();
//! let span = trace.begin("plan_searches");
//! span.log("Planning searches", None);
//! span.end();
//!
//! assert_eq!(trace.spans_begun(), trace.spans_ended());
//! ```

use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_TRACE: TraceContext;
}

/// Kind of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEventKind {
    SpanStarted,
    Log,
    Error,
    SpanEnded,
}

/// One entry in the trace journal.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    /// Name of the span that emitted the event
    pub span: String,
    pub kind: TraceEventKind,
    pub message: String,
    pub data: Option<Value>,
    /// Time since the trace started
    pub at: Duration,
}

#[derive(Debug)]
struct TraceInner {
    trace_id: String,
    started_at: SystemTime,
    clock: Instant,
    begun: AtomicUsize,
    ended: AtomicUsize,
    events: Mutex<Vec<TraceEvent>>,
}

/// Correlation context shared by every call in one pipeline run.
///
/// Cloning is cheap (Arc-based); clones share the journal and counters.
#[derive(Debug, Clone)]
pub struct TraceContext {
    inner: Arc<TraceInner>,
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceContext {
    /// Create a trace with a freshly generated id.
    pub fn new() -> Self {
        Self::with_id(generate_trace_id())
    }

    /// Create a trace with a caller-supplied id.
    pub fn with_id(trace_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TraceInner {
                trace_id: trace_id.into(),
                started_at: SystemTime::now(),
                clock: Instant::now(),
                begun: AtomicUsize::new(0),
                ended: AtomicUsize::new(0),
                events: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.inner.trace_id
    }

    pub fn started_at(&self) -> SystemTime {
        self.inner.started_at
    }

    /// Time elapsed since the trace was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.clock.elapsed()
    }

    /// Start a named span.
    ///
    /// The returned handle closes the span when [`SpanHandle::end`] is
    /// called or when it is dropped, whichever comes first.
    pub fn begin(&self, name: impl Into<String>) -> SpanHandle {
        let name = name.into();
        self.inner.begun.fetch_add(1, Ordering::SeqCst);
        self.record(&name, TraceEventKind::SpanStarted, "started".to_string(), None);
        SpanHandle {
            trace: self.clone(),
            name,
            started: Instant::now(),
            ended: false,
        }
    }

    /// Number of spans started so far.
    pub fn spans_begun(&self) -> usize {
        self.inner.begun.load(Ordering::SeqCst)
    }

    /// Number of spans closed so far.
    pub fn spans_ended(&self) -> usize {
        self.inner.ended.load(Ordering::SeqCst)
    }

    /// Snapshot of the journal.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.inner
            .events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Journal entries of kind [`TraceEventKind::Error`].
    pub fn errors(&self) -> Vec<TraceEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == TraceEventKind::Error)
            .collect()
    }

    /// Run a future with this trace installed as the ambient trace.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        CURRENT_TRACE.scope(self.clone(), fut).await
    }

    /// The ambient trace of the current task, if any.
    pub fn current() -> Option<TraceContext> {
        CURRENT_TRACE.try_with(|trace| trace.clone()).ok()
    }

    fn record(&self, span: &str, kind: TraceEventKind, message: String, data: Option<Value>) {
        let trace_id = self.trace_id();
        match kind {
            TraceEventKind::SpanStarted => {
                tracing::debug!(trace_id = %trace_id, span = %span, "span started")
            }
            TraceEventKind::SpanEnded => {
                tracing::debug!(trace_id = %trace_id, span = %span, "{}", message)
            }
            TraceEventKind::Log => match &data {
                Some(data) => {
                    tracing::info!(trace_id = %trace_id, span = %span, data = %data, "{}", message)
                }
                None => tracing::info!(trace_id = %trace_id, span = %span, "{}", message),
            },
            TraceEventKind::Error => {
                tracing::error!(trace_id = %trace_id, span = %span, error = %message, "span error")
            }
        }

        if let Ok(mut events) = self.inner.events.lock() {
            events.push(TraceEvent {
                span: span.to_string(),
                kind,
                message,
                data,
                at: self.elapsed(),
            });
        }
    }
}

/// Handle to an open span.
#[derive(Debug)]
pub struct SpanHandle {
    trace: TraceContext,
    name: String,
    started: Instant,
    ended: bool,
}

impl SpanHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trace(&self) -> &TraceContext {
        &self.trace
    }

    /// Append a log entry, optionally with structured data.
    pub fn log(&self, message: impl Into<String>, data: Option<Value>) {
        self.trace
            .record(&self.name, TraceEventKind::Log, message.into(), data);
    }

    /// Append an error entry.
    pub fn error(&self, err: &dyn std::error::Error) {
        self.trace
            .record(&self.name, TraceEventKind::Error, err.to_string(), None);
    }

    /// Close the span.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        let elapsed = self.started.elapsed();
        self.trace.inner.ended.fetch_add(1, Ordering::SeqCst);
        self.trace.record(
            &self.name,
            TraceEventKind::SpanEnded,
            format!("completed in {}ms", elapsed.as_millis()),
            None,
        );
    }
}

impl Drop for SpanHandle {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Generate a trace id of the form `trace_<32 hex chars>`.
pub fn generate_trace_id() -> String {
    format!("trace_{}", Uuid::new_v4().simple())
}

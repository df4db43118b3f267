//! Command-line research runner.
//!
//! Usage:
//!   OPENAI_API_KEY=... EXA_API_KEY=... quarry "history of the telegraph"
//!
//! Progress goes to stderr, the finished markdown report to stdout.
//! Set SENDGRID_API_KEY (and optionally FROM_EMAIL / TO_EMAIL) to email it.

use futures::StreamExt;
use quarry::{ResearchConfig, ResearchPipeline, ResearchUpdate};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,quarry=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("Usage: quarry \"Your research query\"");
        return ExitCode::from(2);
    }

    match run(&query).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Research failed");
            eprintln!("Research failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(query: &str) -> quarry::Result<()> {
    let config = ResearchConfig::from_env()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let pipeline = ResearchPipeline::from_config(&config)?.with_cancellation(cancel);

    eprintln!("Starting research for: \"{}\"", query);
    eprintln!("---");

    let mut updates = pipeline.run(query);
    while let Some(update) = updates.next().await {
        match update? {
            ResearchUpdate::Progress(status) => eprintln!("{}", status),
            ResearchUpdate::Report(report) => println!("{}", report),
        }
    }
    Ok(())
}

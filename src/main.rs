use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use wellness_planner::app::{run_surfaces, spawn_http};
use wellness_planner::channels::{Channel, CliChannel};
use wellness_planner::config::PlannerConfig;
use wellness_planner::intake::IntakeWizard;
use wellness_planner::llm::create_provider;
use wellness_planner::render::{PdfRenderer, pdf::PdfLayout};

/// Keeps the non-blocking file writer alive until exit.
struct LogGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<LogGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(LogGuard { _guard: None });
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(LogGuard {
        _guard: Some(guard),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PlannerConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_logging(config.log_file.as_deref())?;

    if config.http_port.is_none() && !config.cli_enabled {
        anyhow::bail!("Nothing to run: set PLANNER_HTTP_PORT or enable PLANNER_CLI");
    }

    eprintln!("🗓️  Wellness Planner v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {} ({})", config.llm.backend, config.llm.model);

    let llm = create_provider(&config.llm).context("Failed to create LLM provider")?;
    let renderer = Arc::new(PdfRenderer::new(PdfLayout::default()));
    let wizard = Arc::new(IntakeWizard::new(llm, renderer, config.wizard.clone()));

    let server = match config.http_port {
        Some(port) => {
            let (addr, handle) = spawn_http(("0.0.0.0", port), Arc::clone(&wizard))
                .await
                .with_context(|| format!("Failed to bind HTTP port {port}"))?;
            eprintln!("   HTTP API: http://{}/api/session", addr);
            Some(handle)
        }
        None => None,
    };

    let cli = config.cli_enabled.then(CliChannel::new);
    if cli.is_some() {
        eprintln!("   Plans saved to: {}", config.output_dir.display());
        eprintln!("   Type your answers and press Enter. /quit to exit.\n");
    }

    run_surfaces(
        &wizard,
        cli.as_ref().map(|c| c as &dyn Channel),
        &config.output_dir,
        server,
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
    )
    .await
}

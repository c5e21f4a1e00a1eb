// SEO analyzer entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config and build the LLM client and flows
// 4. Dispatch: dashboard (TUI + WebSocket server), server only, or a
//    one-shot flow printed to stdout

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use seo_analyzer::app;
use seo_analyzer::config::{self, Config};
use seo_analyzer::flows::{FlowBudgets, SeoFlows};
use seo_analyzer::llm::client::LlmClient;
use seo_analyzer::seo::markdown::{render_markdown, MarkdownExtras};
use seo_analyzer::seo::report::{score_band, score_text};
use seo_analyzer::seo::request::ReportRequest;
use seo_analyzer::tui;
use seo_analyzer::ws_server;

/// LLM-driven SEO and performance analysis for web pages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Without a subcommand the interactive dashboard starts.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run only the WebSocket server for browser clients
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate a report for URL and print it
    Analyze {
        url: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
    /// Score an SEO report read from FILE ("-" for stdin)
    Score { file: PathBuf },
    /// Summarize a performance report read from FILE ("-" for stdin)
    Summarize { file: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("SEO analyzer starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        model = %config.llm.model,
        websocket = config.websocket.enabled,
        port = config.websocket.port,
        "Config loaded"
    );

    let client = LlmClient::from_config(&config);
    let active = client.is_active();
    if active {
        info!("LLM client initialized (API key configured)");
    } else {
        warn!("LLM client disabled (no API key); flows will fail until one is configured");
    }
    let flows = SeoFlows::new(Arc::new(client), FlowBudgets::from_config(&config.llm));

    match cli.command {
        None => run_dashboard(&config, flows).await,
        Some(Command::Serve { port }) => serve(port.unwrap_or(config.websocket.port), flows).await,
        Some(Command::Analyze { url, format }) => {
            require_api_key(active)?;
            analyze(&flows, &url, format).await
        }
        Some(Command::Score { file }) => {
            require_api_key(active)?;
            let report = read_input(&file)?;
            let score = flows.calculate_score(&report, None).await?;
            println!("{} ({})", score_text(score.score), score_band(score.score).label());
            Ok(())
        }
        Some(Command::Summarize { file }) => {
            require_api_key(active)?;
            let performance_report = read_input(&file)?;
            let summary = flows.summarize_performance(&performance_report, None).await?;
            println!("{}", summary.summary);
            Ok(())
        }
    }
}

fn require_api_key(active: bool) -> anyhow::Result<()> {
    if !active {
        bail!("no Anthropic API key configured; set anthropic_api_key in config/credentials.toml");
    }
    Ok(())
}

/// TUI plus, when enabled, the WebSocket server. Returns when the user quits.
async fn run_dashboard(config: &Config, flows: SeoFlows) -> anyhow::Result<()> {
    let (ws_tx, ws_rx) = mpsc::channel(256);
    let (llm_tx, llm_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // A dropped ws_tx closes the channel, which the app loop treats as
    // "no server".
    let ws_handle = if config.websocket.enabled {
        let port = config.websocket.port;
        let server_flows = flows.clone();
        Some(tokio::spawn(async move {
            match ws_server::bind(port).await {
                Ok(listener) => {
                    if let Err(e) = ws_server::run(listener, server_flows, ws_tx).await {
                        error!("WebSocket server error: {e}");
                    }
                }
                Err(e) => error!("Failed to bind WebSocket server on port {port}: {e}"),
            }
        }))
    } else {
        info!("WebSocket server disabled");
        drop(ws_tx);
        None
    };

    let app_state = app::AppState::new(flows, llm_tx);
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, llm_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {e}");
        }
    });

    info!("Application ready");
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {e:#}");
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), app_handle).await;
    if let Some(handle) = ws_handle {
        handle.abort();
    }

    info!("SEO analyzer shut down cleanly");
    Ok(())
}

/// WebSocket server without the TUI. Runs until Ctrl+C.
async fn serve(port: u16, flows: SeoFlows) -> anyhow::Result<()> {
    let listener = ws_server::bind(port)
        .await
        .with_context(|| format!("failed to bind WebSocket server on port {port}"))?;
    println!("Listening on ws://127.0.0.1:{port}");

    let (tx, mut rx) = mpsc::channel(256);
    let server = tokio::spawn(ws_server::run(listener, flows, tx));

    let log_events = async {
        while let Some(event) = rx.recv().await {
            info!(?event, "WebSocket event");
        }
    };

    tokio::select! {
        result = server => {
            result.context("WebSocket server task failed")??;
        }
        _ = log_events => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Interrupted, shutting down");
        }
    }
    Ok(())
}

/// Generate a report for `url` and print it in `format`.
async fn analyze(flows: &SeoFlows, url: &str, format: OutputFormat) -> anyhow::Result<()> {
    let request = ReportRequest::new(url)?;
    let result = flows.generate_report(&request, None).await?;
    let output = match format {
        OutputFormat::Markdown => render_markdown(
            &request.url,
            &result,
            &MarkdownExtras {
                generated_at: Some(Utc::now()),
                ..Default::default()
            },
        ),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&result).context("failed to serialize report")?
        }
    };
    println!("{output}");
    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("failed to read stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("seo-analyzer.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("seo_analyzer=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

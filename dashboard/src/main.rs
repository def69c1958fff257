use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use quant_dashboard::app::{forward_commands, Dashboard, Event};
use quant_dashboard::client::{Backend, BackendClient};
use quant_dashboard::config::Config;
use quant_dashboard::dispatch::{control_request, validate_settings, Command};
use quant_dashboard::document::Document;
use quant_dashboard::render::Renderer;
use quant_dashboard::state::UiState;
use quant_dashboard::types::{ControlAction, SettingsRequest};
use quant_dashboard::view;

#[derive(Parser)]
#[command(name = "quantdash", about = "Monitor and control a remote trading-bot backend")]
struct Cli {
    /// Backend base URL (overrides API_BASE)
    #[arg(long)]
    api_base: Option<String>,

    /// Poll interval in milliseconds (overrides POLL_INTERVAL_MS)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Load config from a specific .env file
    #[arg(long)]
    config_file: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Live dashboard; reads commands from stdin (default)
    Watch,
    /// Fetch one snapshot and print it
    Status,
    /// Start the bot in the given mode
    Start { mode: String },
    /// Stop the bot
    Stop,
    /// Start or stop a single engine, e.g. `toggle gold_1h stop`
    Toggle { target: String, action: ControlAction },
    /// Stop every engine
    StopAll,
    /// Point the backend at a new agent and set risk %
    Settings { ip: String, risk: f64 },
    /// Run the backtest plan and print the results
    Backtest {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        capital: Option<f64>,
        /// Also print the trade list for this widget id
        #[arg(long)]
        trades: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::from_env_file(cli.config_file.as_deref())?;
    if let Some(api_base) = cli.api_base {
        cfg.api_base = api_base.trim_end_matches('/').to_string();
    }
    if let Some(ms) = cli.interval_ms {
        cfg.poll_interval_ms = ms;
    }

    let client = BackendClient::new(&cfg).context("Building HTTP client")?;
    let backend: Arc<dyn Backend> = Arc::new(client);
    let color = std::io::stdout().is_terminal();

    match cli.command.unwrap_or(Cmd::Watch) {
        Cmd::Watch => {
            info!("Dashboard -> {} (poll {}ms)", cfg.api_base, cfg.poll_interval_ms);
            let dashboard = Dashboard::new(cfg, backend).with_redraw(true);
            spawn_stdin_commands(dashboard.sender());
            dashboard.run().await?;
        }
        Cmd::Status => {
            let snap = backend.fetch_status().await.context("Fetching /api/status")?;
            let mut doc = Document::dashboard();
            let mut state = UiState::new();
            Renderer::new(cfg.log_limit).render(&mut doc, &mut state, &snap);
            print!("{}", view::render_frame(&doc, color));
        }
        Cmd::Start { mode } => send_control(backend.as_ref(), Command::Start { mode }).await?,
        Cmd::Stop => send_control(backend.as_ref(), Command::Stop).await?,
        Cmd::Toggle { target, action } => {
            send_control(backend.as_ref(), Command::Toggle { target, action }).await?
        }
        Cmd::StopAll => send_control(backend.as_ref(), Command::StopAll).await?,
        Cmd::Settings { ip, risk } => {
            validate_settings(&ip, risk)?;
            let req = SettingsRequest {
                agent_url: format!("http://{}:{}", ip.trim(), cfg.agent_port),
                risk,
            };
            let ack = backend.update_settings(&req).await.context("Updating settings")?;
            if ack.is_updated() {
                println!("Configuration Updated Successfully! (agent {})", req.agent_url);
            } else {
                anyhow::bail!("Update Failed. (status {:?})", ack.status);
            }
        }
        Cmd::Backtest { days, capital, trades } => {
            let mut dashboard = Dashboard::new(cfg, backend);
            dashboard.run_backtest_to_completion(days, capital).await;
            if let Some(widget_id) = trades {
                dashboard.handle(Event::Command(Command::ShowTrades { widget_id }));
            }
            print!("{}", view::render_frame(dashboard.document(), color));
        }
    }

    Ok(())
}

async fn send_control(backend: &dyn Backend, cmd: Command) -> Result<()> {
    let req = control_request(&cmd).context("not a control command")?;
    backend
        .control(&req)
        .await
        .with_context(|| format!("Control request '{}' failed", req.action))?;
    println!("ok");
    Ok(())
}

/// Stdin gets its own thread so a pending read never holds up exit.
fn spawn_stdin_commands(events: UnboundedSender<Event>) {
    std::thread::spawn(move || forward_commands(std::io::stdin().lock(), events));
}

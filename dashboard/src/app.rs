//! The dashboard event loop.
//!
//! A single task owns the [`Document`] and [`UiState`]; everything that runs
//! elsewhere (poll ticks, control requests, backtests, stdin) talks to it
//! through one channel of [`Event`]s, applied strictly in arrival order.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::backtest;
use crate::client::Backend;
use crate::config::Config;
use crate::dispatch::{self, control_request, Command, Dispatcher, HELP};
use crate::document::Document;
use crate::error::Result;
use crate::modal;
use crate::poller::StatusPoller;
use crate::render::Renderer;
use crate::state::UiState;
use crate::types::{BacktestResult, StatusSnapshot};
use crate::view;

#[derive(Debug)]
pub enum Event {
    Snapshot(Box<StatusSnapshot>),
    Command(Command),
    /// Fetch status once, outside the timer
    Refresh,
    Alert(String),
    BacktestSettled {
        widget_id: String,
        capital: f64,
        outcome: Result<BacktestResult>,
    },
    BacktestFinished,
    SettingsFinished {
        transport_failed: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Dashboard {
    config: Config,
    doc: Document,
    state: UiState,
    renderer: Renderer,
    dispatcher: Dispatcher,
    poller: StatusPoller,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
    /// Print a frame to stdout after every event
    redraw: bool,
}

impl Dashboard {
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            backend.clone(),
            events_tx.clone(),
            config.agent_port,
            config.client_log,
        );
        let poller = StatusPoller::new(backend, events_tx.clone(), config.poll_interval());
        Self {
            renderer: Renderer::new(config.log_limit),
            config,
            doc: Document::dashboard(),
            state: UiState::new(),
            dispatcher,
            poller,
            events_tx,
            events_rx,
            redraw: false,
        }
    }

    pub fn with_redraw(mut self, redraw: bool) -> Self {
        self.redraw = redraw;
        self
    }

    pub fn sender(&self) -> UnboundedSender<Event> {
        self.events_tx.clone()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Back to a freshly loaded dashboard: empty document, no remembered
    /// config or backtest trades.
    pub fn reset(&mut self) {
        self.doc = Document::dashboard();
        self.state.reset();
    }

    /// Run until `quit` or Ctrl-C. Polling starts immediately.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        let stop_tx = shutdown_tx.clone();
        let ctrl_c = tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl-C received, shutting down");
            stop_tx.send(true).ok();
        });
        self.run_until(shutdown_tx).await;
        ctrl_c.abort();
        info!("Dashboard stopped");
        Ok(())
    }

    /// Run until `quit`, or until `true` is sent on `shutdown`.
    pub async fn run_until(mut self, shutdown: watch::Sender<bool>) {
        let mut stop_rx = shutdown.subscribe();
        let poller = tokio::spawn(self.poller.clone().run(shutdown.subscribe()));

        self.dispatcher.report(
            "info",
            "Dashboard initialized",
            serde_json::json!({ "api_base": self.config.api_base }),
        );
        self.draw();

        while !*stop_rx.borrow() {
            tokio::select! {
                event = self.events_rx.recv() => {
                    let Some(event) = event else { break };
                    if self.handle(event) == Flow::Quit {
                        break;
                    }
                    self.draw();
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        shutdown.send(true).ok();
        poller.await.ok();
    }

    /// Apply one event to the document.
    pub fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Snapshot(snap) => self.renderer.render(&mut self.doc, &mut self.state, &snap),
            Event::Command(cmd) => return self.handle_command(cmd),
            Event::Refresh => {
                self.poller.poll_now();
            }
            Event::Alert(message) => self.alert(&message),
            Event::BacktestSettled { widget_id, capital, outcome } => {
                backtest::apply_outcome(&mut self.doc, &mut self.state, &widget_id, capital, outcome);
            }
            Event::SettingsFinished { transport_failed } => {
                dispatch::finish_settings(&mut self.doc, transport_failed);
            }
            Event::BacktestFinished => {
                backtest::finish_run(&mut self.doc, &mut self.state);
                info!("Backtest run complete");
            }
        }
        Flow::Continue
    }

    fn handle_command(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Start { .. } | Command::Stop | Command::Toggle { .. } | Command::StopAll => {
                if let Some(req) = control_request(&cmd) {
                    self.dispatcher.control(req);
                }
            }
            Command::SaveSettings { ip, risk } => {
                self.dispatcher.save_settings(&mut self.doc, &mut self.state, &ip, risk);
            }
            Command::RunBacktest { days, capital } => self.start_backtest(days, capital),
            Command::ShowTrades { widget_id } => modal::show_trades(&mut self.doc, &self.state, &widget_id),
            Command::CloseTrades => modal::close_trades(&mut self.doc),
            Command::Click { element_id } => {
                let bound = self.doc.get(&element_id).and_then(|el| el.on_click.clone());
                match bound {
                    Some(cmd) => return self.handle_command(cmd),
                    None => self.alert(&format!("'{element_id}' is not a button")),
                }
            }
            Command::Refresh => {
                self.poller.poll_now();
            }
            Command::Help => self.alert(HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn start_backtest(&mut self, days: Option<u32>, capital: Option<f64>) {
        if self.state.backtest_running {
            warn!("Backtest already running, ignoring request");
            return;
        }
        let days = days.unwrap_or(self.config.backtest_days);
        let capital = capital.unwrap_or(self.config.backtest_capital);

        backtest::begin_run(&mut self.doc, &mut self.state, days);
        tokio::spawn(backtest::run_all(self.dispatcher.backend(), days, capital, self.dispatcher.events()));
    }

    /// Start a backtest and process events until every entry has settled.
    pub async fn run_backtest_to_completion(&mut self, days: Option<u32>, capital: Option<f64>) {
        self.start_backtest(days, capital);
        while self.state.backtest_running {
            let Some(event) = self.events_rx.recv().await else { break };
            // drop repoll requests; nothing is polling in this mode
            if !matches!(event, Event::Refresh) {
                self.handle(event);
            }
        }
    }

    fn alert(&mut self, message: &str) {
        info!("Alert: {message}");
        if let Some(el) = self.doc.get_mut("alert") {
            el.set_text(message);
            el.hidden = false;
        }
    }

    fn draw(&self) {
        if !self.redraw {
            return;
        }
        let frame = view::render_frame(&self.doc, true);
        let mut stdout = std::io::stdout().lock();
        // clear screen, cursor home
        write!(stdout, "\x1b[2J\x1b[H{frame}").ok();
        stdout.flush().ok();
    }
}

/// Turn input lines into command events until the input ends or the loop
/// goes away. Blocking: run it on its own thread so a pending read never
/// holds up shutdown.
pub fn forward_commands(input: impl BufRead, events: UnboundedSender<Event>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let event = match line.parse::<Command>() {
            Ok(cmd) => Event::Command(cmd),
            Err(e) => Event::Alert(format!("{e}. {HELP}")),
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

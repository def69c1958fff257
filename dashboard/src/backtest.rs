//! Concurrent backtest fan-out across the fixed strategy plan.
//!
//! One request per plan entry, all in flight at once. Each entry settles on
//! its own and only ever touches its own widget; the run as a whole finishes
//! once every entry has settled, successful or not.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::app::Event;
use crate::client::Backend;
use crate::document::Document;
use crate::error::Result;
use crate::state::UiState;
use crate::types::{BacktestRequest, BacktestResult};

#[derive(Debug, Clone, Copy)]
pub struct BacktestTarget {
    /// Widget id addressing `res-`, `wr-` and `pnl-` elements
    pub id: &'static str,
    pub strategy: &'static str,
    pub symbol: &'static str,
    pub timeframe: &'static str,
}

pub const BACKTEST_PLAN: [BacktestTarget; 4] = [
    BacktestTarget { id: "btc-breakout-5m", strategy: "BitcoinBreakout", symbol: "BITCOIN", timeframe: "5m" },
    BacktestTarget { id: "gold-1h", strategy: "GoldTrend", symbol: "GOLD", timeframe: "1h" },
    BacktestTarget { id: "gold-15m", strategy: "GoldSniper", symbol: "GOLD", timeframe: "15m" },
    BacktestTarget { id: "gold-5m", strategy: "GoldFlux", symbol: "GOLD", timeframe: "5m" },
];

const RUN_LABEL: &str = "Run Analysis";
const BUSY_LABEL: &str = "Analyzing...";

/// Synchronous part of a run: reset the trade map and put every widget in
/// its loading state before any request goes out.
pub fn begin_run(doc: &mut Document, state: &mut UiState, days: u32) {
    for label in doc.select_class_mut("bt-label-days") {
        label.set_text(days.to_string());
    }
    if let Some(btn) = doc.get_mut("btn-run-backtest") {
        btn.set_text(BUSY_LABEL);
        btn.disabled = true;
    }

    state.backtest_trades.clear();
    state.backtest_running = true;

    for target in BACKTEST_PLAN {
        if let Some(res) = doc.get_mut(&format!("res-{}", target.id)) {
            res.add_class("loading");
        }
        for prefix in ["wr", "pnl"] {
            if let Some(el) = doc.get_mut(&format!("{prefix}-{}", target.id)) {
                el.set_text("...");
                el.set_classes(&[]);
            }
        }
    }
}

/// Issue every plan request concurrently. Each outcome is delivered as its
/// own [`Event::BacktestSettled`]; [`Event::BacktestFinished`] follows once
/// all of them have settled.
pub async fn run_all(
    backend: Arc<dyn Backend>,
    days: u32,
    capital: f64,
    events: UnboundedSender<Event>,
) {
    info!("Backtest: {} strategies, {days} days, capital {capital:.2}", BACKTEST_PLAN.len());

    let futures = BACKTEST_PLAN.into_iter().map(|target| {
        let backend = backend.clone();
        let events = events.clone();
        async move {
            let req = BacktestRequest {
                strategy: target.strategy.to_string(),
                symbol: target.symbol.to_string(),
                timeframe: target.timeframe.to_string(),
                balance: capital,
                days,
            };
            let outcome = backend.backtest(&req).await;
            if let Err(e) = &outcome {
                warn!("Backtest {} failed: {e}", target.id);
            }
            events
                .send(Event::BacktestSettled { widget_id: target.id.to_string(), capital, outcome })
                .ok();
        }
    });

    join_all(futures).await;
    events.send(Event::BacktestFinished).ok();
}

/// Apply one entry's outcome to its widget.
pub fn apply_outcome(
    doc: &mut Document,
    state: &mut UiState,
    widget_id: &str,
    capital: f64,
    outcome: Result<BacktestResult>,
) {
    let result = match outcome {
        Ok(result) => result,
        Err(_) => {
            if let Some(wr) = doc.get_mut(&format!("wr-{widget_id}")) {
                wr.set_text("Err");
                wr.set_classes(&["error"]);
            }
            return;
        }
    };

    let pnl = result.final_balance - capital;
    let win_rate = if result.total_trades == 0 {
        "-".to_string()
    } else {
        format!("{:.0}%", result.win_rate * 100.0)
    };

    if let Some(res) = doc.get_mut(&format!("res-{widget_id}")) {
        res.remove_class("loading");
    }
    if let Some(wr) = doc.get_mut(&format!("wr-{widget_id}")) {
        wr.set_text(win_rate);
        wr.set_classes(&[]);
    }
    if let Some(el) = doc.get_mut(&format!("pnl-{widget_id}")) {
        el.set_text(signed(pnl));
        el.set_classes(&[if pnl >= 0.0 { "positive" } else { "negative" }]);
    }

    state.backtest_trades.insert(widget_id.to_string(), result.trades);
}

pub fn finish_run(doc: &mut Document, state: &mut UiState) {
    state.backtest_running = false;
    if let Some(btn) = doc.get_mut("btn-run-backtest") {
        btn.set_text(RUN_LABEL);
        btn.disabled = false;
    }
}

/// `+12.50` / `-3.00`
pub fn signed(v: f64) -> String {
    if v >= 0.0 {
        format!("+{v:.2}")
    } else {
        format!("{v:.2}")
    }
}

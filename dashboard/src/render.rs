//! Snapshot → document reconciliation.
//!
//! Every target is rewritten from the snapshot on each pass; rows and log
//! panels are cleared and rebuilt rather than patched, so nothing from an
//! earlier snapshot survives a later one with different content.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dispatch::Command;
use crate::document::{Document, Element, BTC_BREAKOUT, GOLD, GOLD_TIMEFRAMES};
use crate::error::{DashboardError, Result};
use crate::log_style::log_lines;
use crate::state::UiState;
use crate::types::{Account, BackendConfig, ControlAction, EngineStatus, Indicators, StatusSnapshot};

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;
pub const ADX_STRONG_TREND: f64 = 25.0;

/// Engine name the backend uses for the breakout card.
const BTC_BREAKOUT_ENGINE: &str = "btc_breakout_5m";
const BTC_SYMBOL: &str = "BITCOIN";
const GOLD_SYMBOL: &str = "GOLD";
const MISSING: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    pub fn class(self) -> &'static str {
        match self {
            RsiZone::Overbought => "overbought",
            RsiZone::Oversold => "oversold",
            RsiZone::Neutral => "neutral",
        }
    }
}

pub fn rsi_zone(rsi: f64) -> RsiZone {
    if rsi > RSI_OVERBOUGHT {
        RsiZone::Overbought
    } else if rsi < RSI_OVERSOLD {
        RsiZone::Oversold
    } else {
        RsiZone::Neutral
    }
}

pub fn adx_class(adx: f64) -> &'static str {
    if adx > ADX_STRONG_TREND {
        "strong-trend"
    } else {
        "weak-trend"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendBias {
    Bullish,
    Bearish,
}

impl TrendBias {
    pub fn label(self) -> &'static str {
        match self {
            TrendBias::Bullish => "BULLISH",
            TrendBias::Bearish => "BEARISH",
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            TrendBias::Bullish => "bullish",
            TrendBias::Bearish => "bearish",
        }
    }
}

/// Price above the trend EMA reads bullish; anything else bearish.
pub fn trend_bias(price: f64, ema_trend: f64) -> TrendBias {
    if price > ema_trend {
        TrendBias::Bullish
    } else {
        TrendBias::Bearish
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    log_limit: usize,
}

impl Renderer {
    pub fn new(log_limit: usize) -> Self {
        Self { log_limit }
    }

    /// Reconcile `doc` against a freshly fetched snapshot.
    pub fn render(&self, doc: &mut Document, state: &mut UiState, snap: &StatusSnapshot) {
        render_global_status(doc, snap);
        render_market_table(doc, snap);

        if let Some(panel) = doc.get_mut("logs-container") {
            panel.replace_children(log_lines(snap.logs.iter().map(String::as_str), self.log_limit));
        }

        if let Some(engine) = &snap.btc_breakout_5m {
            self.render_btc_breakout(doc, engine);
        }
        if let Some(gold) = &snap.gold {
            self.render_multi_timeframe(doc, GOLD, GOLD_SYMBOL, gold);
        }
        if let Some(account) = &snap.account {
            render_account(doc, account);
        }
        if let Some(config) = &snap.config {
            update_config_ui(doc, state, config);
        }

        debug!(
            "Rendered snapshot: active={} symbols={} logs={}",
            snap.active,
            snap.statuses.len(),
            snap.logs.len()
        );
    }

    fn render_btc_breakout(&self, doc: &mut Document, engine: &EngineStatus) {
        let id = BTC_BREAKOUT;

        if let Some(status) = doc.get_mut(&format!("status-{id}")) {
            if engine.active {
                status.set_text("ACTIVE");
                status.set_classes(&["online", "pulse"]);
            } else {
                status.set_text("STANDBY");
                status.set_classes(&["offline"]);
            }
        }
        if let Some(btn) = doc.get_mut(&format!("btn-{id}")) {
            let (label, class, action) = if engine.active {
                ("DEACTIVATE", "btn-danger", ControlAction::Stop)
            } else {
                ("ACTIVATE", "btn-go", ControlAction::Start)
            };
            btn.set_text(label);
            btn.set_classes(&[class]);
            btn.on_click = Some(Command::Toggle { target: BTC_BREAKOUT_ENGINE.to_string(), action });
        }

        let empty = Indicators::default();
        let mdata = engine.data.get(BTC_SYMBOL).unwrap_or(&empty);

        set_text(doc, &format!("price-{id}"), money_or_missing(mdata.close));
        set_text(doc, &format!("high-{id}"), money_or_missing(mdata.high_n));
        set_text(doc, &format!("low-{id}"), money_or_missing(mdata.low_n));

        if let Some(el) = doc.get_mut(&format!("adx-{id}")) {
            match mdata.adx {
                Some(adx) => {
                    el.set_text(format!("{adx:.1}"));
                    el.set_classes(&[adx_class(adx)]);
                }
                None => {
                    el.set_text(MISSING);
                    el.set_classes(&[]);
                }
            }
        }

        if let Some(el) = doc.get_mut(&format!("signal-{id}")) {
            match (mdata.close, mdata.ema_trend) {
                (Some(close), Some(ema)) => {
                    let bias = trend_bias(close, ema);
                    el.set_text(bias.label());
                    el.set_classes(&[bias.class()]);
                }
                _ => {
                    el.set_text(MISSING);
                    el.set_classes(&[]);
                }
            }
        }

        if let Some(panel) = doc.get_mut(&format!("logs-{id}")) {
            panel.replace_children(log_lines(engine.logs.iter().map(String::as_str), self.log_limit));
        }
    }

    /// Card with one engine per timeframe. Logs are concatenated in timeframe
    /// order (not by timestamp) before slicing.
    fn render_multi_timeframe(
        &self,
        doc: &mut Document,
        section: &str,
        symbol: &str,
        engines: &BTreeMap<String, EngineStatus>,
    ) {
        let mut active_count = 0;
        let mut merged_logs: Vec<String> = Vec::new();

        for tf in GOLD_TIMEFRAMES {
            let Some(engine) = engines.get(tf) else {
                continue;
            };
            if engine.active {
                active_count += 1;
            }
            merged_logs.extend(engine.logs.iter().map(|l| format!("[{tf}] {l}")));

            if let Some(ind) = doc.get_mut(&format!("ind-{section}-{tf}")) {
                ind.set_classes(&[if engine.active { "online" } else { "offline" }]);
            }
            if let Some(status) = doc.get_mut(&format!("status-{section}-{tf}")) {
                status.set_text(if engine.active { "ONLINE" } else { "OFFLINE" });
                status.set_classes(&[if engine.active { "online" } else { "offline" }]);
            }
            if let Some(btn) = doc.get_mut(&format!("btn-{section}-{tf}")) {
                let (label, class, action) = if engine.active {
                    ("Stop", "btn-danger", ControlAction::Stop)
                } else {
                    ("Start", "btn-go", ControlAction::Start)
                };
                btn.set_text(label);
                btn.set_classes(&[class]);
                btn.on_click = Some(Command::Toggle { target: format!("{section}_{tf}"), action });
            }

            let empty = Indicators::default();
            let mdata = engine.data.get(symbol).unwrap_or(&empty);

            set_text(doc, &format!("price-{section}-{tf}"), money_or_missing(mdata.close));
            if let Some(el) = doc.get_mut(&format!("dema-{section}-{tf}")) {
                match mdata.rsi {
                    Some(rsi) => {
                        el.set_text(format!("{rsi:.1}"));
                        el.set_classes(&[rsi_zone(rsi).class()]);
                    }
                    None => {
                        el.set_text(MISSING);
                        el.set_classes(&[]);
                    }
                }
            }
            if let Some(el) = doc.get_mut(&format!("super-{section}-{tf}")) {
                match mdata.adx {
                    Some(adx) => {
                        el.set_text(format!("{adx:.1}"));
                        el.set_classes(&[adx_class(adx)]);
                    }
                    None => {
                        el.set_text(MISSING);
                        el.set_classes(&[]);
                    }
                }
            }
        }

        if let Some(master) = doc.get_mut(&format!("status-{section}")) {
            if active_count == GOLD_TIMEFRAMES.len() {
                master.set_text("SYSTEM ACTIVE");
                master.set_classes(&["online", "pulse"]);
            } else if active_count > 0 {
                master.set_text("PARTIAL ACTIVE");
                master.set_classes(&["partial"]);
            } else {
                master.set_text("STANDBY");
                master.set_classes(&["offline"]);
            }
        }

        if let Some(panel) = doc.get_mut(&format!("logs-{section}")) {
            panel.replace_children(log_lines(merged_logs.iter().map(String::as_str), self.log_limit));
        }
    }
}

fn render_global_status(doc: &mut Document, snap: &StatusSnapshot) {
    if let Some(status) = doc.get_mut("global-status") {
        if snap.active {
            status.set_text(format!("SYSTEM ONLINE // MODE: {}", snap.display_mode()));
            status.remove_class("offline");
            status.add_class("online");
        } else {
            status.set_text("SYSTEM OFFLINE");
            status.remove_class("online");
            status.add_class("offline");
        }
    }

    if let Some(btn) = doc.get_mut("btn-stop") {
        btn.hidden = !snap.active;
    }

    for card in doc.select_class_mut("mode-card") {
        card.remove_class("active");
    }
    if snap.active {
        let mode = snap
            .config
            .as_ref()
            .and_then(|c| c.active_mode.as_deref())
            .unwrap_or("4H1H");
        let card_id = if mode == "4H1H" { "mode-4h" } else { "mode-15m" };
        if let Some(card) = doc.get_mut(card_id) {
            card.add_class("active");
        }
    }
}

fn render_market_table(doc: &mut Document, snap: &StatusSnapshot) {
    let Some(tbody) = doc.get_mut("market-table-body") else {
        return;
    };
    tbody.clear_children();

    let empty = Indicators::default();
    for (symbol, status) in &snap.statuses {
        let mdata = snap.market_data.get(symbol).unwrap_or(&empty);

        let mut row = Element::new().with_class("row");
        row.push_child(Element::text(symbol.as_str()).with_class("symbol"));
        row.push_child(Element::text(money_or_missing(mdata.price)));

        let mut rsi = Element::text(opt_fixed(mdata.rsi, 1));
        if let Some(r) = mdata.rsi {
            rsi.add_class(rsi_zone(r).class());
        }
        row.push_child(rsi);

        let trend = mdata.trend.as_deref().unwrap_or(MISSING);
        row.push_child(
            Element::text(trend).with_class(if trend == "UP" { "trend-up" } else { "trend-down" }),
        );
        row.push_child(Element::text(opt_fixed(mdata.adx, 1)));
        row.push_child(
            Element::text(status.as_str())
                .with_class(if status.contains("Signal") { "signal" } else { "idle" }),
        );

        tbody.push_child(row);
    }
}

fn render_account(doc: &mut Document, account: &Account) {
    let balance = format!("$ {:.2}", account.balance);
    set_text(doc, "header-balance", balance.clone());
    set_text(doc, "val-balance", balance);
    set_text(doc, "val-equity", format!("$ {:.2}", account.equity));
}

/// Populate the settings inputs from the backend config, once.
///
/// Inputs already holding a value are left alone, and after the first
/// successful pass (or a user edit) later snapshots never touch them.
pub fn update_config_ui(doc: &mut Document, state: &mut UiState, config: &BackendConfig) {
    if state.config_loaded {
        return;
    }
    let url = config.agent_url.as_deref().unwrap_or_default();
    let host = match agent_host(url) {
        Ok(host) => host,
        Err(e) => {
            warn!("Error parsing config URL: {e}");
            return;
        }
    };

    if let Some(ip) = doc.get_mut("input-agent-ip") {
        if ip.value.is_empty() {
            ip.value = host;
        }
    }
    if let (Some(input), Some(risk)) = (doc.get_mut("input-risk"), config.risk) {
        if input.value.is_empty() {
            input.value = risk.to_string();
        }
    }
    state.config_loaded = true;
}

/// Hostname part of the agent URL, e.g. `10.0.0.5` for `http://10.0.0.5:8001`.
pub fn agent_host(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| DashboardError::InvalidAgentUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| DashboardError::InvalidAgentUrl {
            url: url.to_string(),
            reason: "no host".to_string(),
        })
}

fn set_text(doc: &mut Document, id: &str, text: impl Into<String>) {
    if let Some(el) = doc.get_mut(id) {
        el.set_text(text);
    }
}

fn money_or_missing(v: Option<f64>) -> String {
    v.map(|v| format!("${v:.2}")).unwrap_or_else(|| MISSING.to_string())
}

fn opt_fixed(v: Option<f64>, decimals: usize) -> String {
    v.map(|v| format!("{v:.decimals$}")).unwrap_or_else(|| MISSING.to_string())
}

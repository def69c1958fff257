use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{DashboardError, Result};

/// Full status payload from `GET /api/status`.
///
/// Every poll returns a complete replacement; nothing here is a delta against
/// the previous snapshot. All fields are optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSnapshot {
    pub active: bool,
    /// Legacy top-level mode, used when `config.active_mode` is absent
    pub mode: Option<String>,
    pub config: Option<BackendConfig>,
    pub statuses: BTreeMap<String, String>,
    pub market_data: BTreeMap<String, Indicators>,
    pub logs: Vec<String>,
    pub account: Option<Account>,
    pub btc_breakout_5m: Option<EngineStatus>,
    /// Timeframe ("1h", "15m", "5m") -> engine
    pub gold: Option<BTreeMap<String, EngineStatus>>,
}

impl StatusSnapshot {
    /// Mode shown on the global status line.
    pub fn display_mode(&self) -> &str {
        self.config
            .as_ref()
            .and_then(|c| c.active_mode.as_deref())
            .or(self.mode.as_deref())
            .unwrap_or("UNKNOWN")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub active_mode: Option<String>,
    pub agent_url: Option<String>,
    pub risk: Option<f64>,
    pub telegram_connected: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub balance: f64,
    pub equity: f64,
}

/// Per-symbol indicator values. Engines publish different subsets, so every
/// field is optional and anything unrecognised lands in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Indicators {
    pub price: Option<f64>,
    pub close: Option<f64>,
    pub rsi: Option<f64>,
    pub adx: Option<f64>,
    pub trend: Option<String>,
    pub ema_trend: Option<f64>,
    pub high_n: Option<f64>,
    pub low_n: Option<f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One strategy engine as reported inside the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineStatus {
    pub active: bool,
    pub status: Option<String>,
    pub data: BTreeMap<String, Indicators>,
    pub logs: Vec<String>,
}

/// Response of `POST /api/backtest`. The backend reports failures in-band via
/// `error`; use [`BacktestResult::into_result`] to surface them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestResult {
    pub final_balance: f64,
    pub win_rate: f64,
    pub total_trades: u32,
    pub trades: Vec<Trade>,
    pub error: Option<String>,
}

impl BacktestResult {
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(err) => Err(DashboardError::Backend(err)),
            None => Ok(self),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    /// Unix seconds; the simulator may emit fractional values
    pub entry_time: f64,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub entry: f64,
    pub exit: f64,
    pub pnl: f64,
    #[serde(default)]
    pub exit_time: Option<f64>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Long,
    Short,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Long => write!(f, "LONG"),
            TradeSide::Short => write!(f, "SHORT"),
        }
    }
}

// ── Request bodies ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Start,
    Stop,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlAction::Start => write!(f, "start"),
            ControlAction::Stop => write!(f, "stop"),
        }
    }
}

impl std::str::FromStr for ControlAction {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(ControlAction::Start),
            "stop" => Ok(ControlAction::Stop),
            other => Err(DashboardError::InvalidInput(format!(
                "unknown action '{other}' (expected start|stop)"
            ))),
        }
    }
}

/// Body of `POST /api/control`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlRequest {
    pub action: ControlAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsRequest {
    pub agent_url: String,
    pub risk: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsAck {
    pub status: Option<String>,
    pub persisted: Option<bool>,
}

impl SettingsAck {
    pub fn is_updated(&self) -> bool {
        self.status.as_deref() == Some("updated")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestRequest {
    pub strategy: String,
    pub symbol: String,
    pub timeframe: String,
    pub balance: f64,
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientLogRequest {
    pub level: String,
    pub message: String,
    pub context: Value,
}

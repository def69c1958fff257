//! User actions: parsing them from input lines and forwarding them to the
//! backend as one-shot requests.
//!
//! Every request runs in its own task and reports back to the event loop;
//! control and settings requests always end with an [`Event::Refresh`] so the
//! document catches up without waiting for the next timer tick.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::Event;
use crate::client::Backend;
use crate::document::Document;
use crate::error::{DashboardError, Result};
use crate::state::UiState;
use crate::types::{ClientLogRequest, ControlAction, ControlRequest, SettingsRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start { mode: String },
    Stop,
    Toggle { target: String, action: ControlAction },
    StopAll,
    SaveSettings { ip: String, risk: f64 },
    RunBacktest { days: Option<u32>, capital: Option<f64> },
    ShowTrades { widget_id: String },
    CloseTrades,
    /// Activate whatever the element's button is currently bound to
    Click { element_id: String },
    Refresh,
    Help,
    Quit,
}

const SAVE_LABEL: &str = "SAVE SETTINGS";
const SAVING_LABEL: &str = "UPDATING...";
const SAVE_FAILED_LABEL: &str = "UPDATE FAILED";

pub const HELP: &str = "commands: start <mode> | stop | toggle <target> <start|stop> | stop-all | \
settings <ip> <risk> | backtest [days] [capital] | trades <widget-id> | close | \
click <element-id> | refresh | help | quit";

impl FromStr for Command {
    type Err = DashboardError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(DashboardError::InvalidInput("empty command".into()));
        };
        let args: Vec<&str> = words.collect();

        let cmd = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("start", [mode]) => Command::Start { mode: mode.to_string() },
            ("stop", []) => Command::Stop,
            ("toggle", [target, action]) => Command::Toggle {
                target: target.to_string(),
                action: action.parse()?,
            },
            ("stop-all" | "stopall", []) => Command::StopAll,
            ("settings", [ip, risk]) => Command::SaveSettings {
                ip: ip.to_string(),
                risk: risk
                    .parse()
                    .map_err(|_| DashboardError::InvalidInput(format!("risk '{risk}' is not a number")))?,
            },
            ("backtest", rest) if rest.len() <= 2 => {
                let days = match rest.first() {
                    Some(d) => Some(d.parse().map_err(|_| {
                        DashboardError::InvalidInput(format!("days '{d}' is not a whole number"))
                    })?),
                    None => None,
                };
                let capital = match rest.get(1) {
                    Some(c) => Some(c.parse().map_err(|_| {
                        DashboardError::InvalidInput(format!("capital '{c}' is not a number"))
                    })?),
                    None => None,
                };
                Command::RunBacktest { days, capital }
            }
            ("trades", [id]) => Command::ShowTrades { widget_id: id.to_string() },
            ("close", []) => Command::CloseTrades,
            ("click", [id]) => Command::Click { element_id: id.to_string() },
            ("refresh", []) => Command::Refresh,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit" | "q", []) => Command::Quit,
            _ => {
                return Err(DashboardError::InvalidInput(format!(
                    "unrecognised command '{}'",
                    line.trim()
                )))
            }
        };
        Ok(cmd)
    }
}

/// Build the control body for a start/stop style command.
pub fn control_request(cmd: &Command) -> Option<ControlRequest> {
    let req = match cmd {
        Command::Start { mode } => ControlRequest {
            action: ControlAction::Start,
            mode: Some(mode.clone()),
            target: None,
        },
        Command::Stop => ControlRequest { action: ControlAction::Stop, mode: None, target: None },
        Command::Toggle { target, action } => ControlRequest {
            action: *action,
            mode: None,
            target: Some(target.clone()),
        },
        Command::StopAll => ControlRequest {
            action: ControlAction::Stop,
            mode: None,
            target: Some("all".to_string()),
        },
        _ => return None,
    };
    Some(req)
}

pub fn validate_settings(ip: &str, risk: f64) -> Result<()> {
    if ip.trim().is_empty() {
        return Err(DashboardError::InvalidInput("Please enter a valid IP address.".into()));
    }
    if !risk.is_finite() || risk <= 0.0 {
        return Err(DashboardError::InvalidInput("Please enter a valid Risk %.".into()));
    }
    Ok(())
}

/// Sends user actions to the backend. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    events: UnboundedSender<Event>,
    agent_port: u16,
    client_log: bool,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn Backend>,
        events: UnboundedSender<Event>,
        agent_port: u16,
        client_log: bool,
    ) -> Self {
        Self { backend, events, agent_port, client_log }
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    pub fn events(&self) -> UnboundedSender<Event> {
        self.events.clone()
    }

    /// POST a control request, then ask for a repoll whatever the outcome.
    pub fn control(&self, req: ControlRequest) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            info!("Control: {} mode={:?} target={:?}", req.action, req.mode, req.target);
            if let Err(e) = this.backend.control(&req).await {
                warn!("Control request failed: {e}");
                this.alert("API Connection Error");
                this.report("error", "control request failed", json!({
                    "action": req.action, "target": req.target, "mode": req.mode, "error": e.to_string(),
                }));
            }
            this.events.send(Event::Refresh).ok();
        })
    }

    /// Validate, record the inputs as a user edit, and POST the settings.
    ///
    /// Returns `None` when validation fails; nothing is sent in that case.
    pub fn save_settings(
        &self,
        doc: &mut Document,
        state: &mut UiState,
        ip: &str,
        risk: f64,
    ) -> Option<JoinHandle<()>> {
        if let Err(e) = validate_settings(ip, risk) {
            let msg = match e {
                DashboardError::InvalidInput(msg) => msg,
                other => other.to_string(),
            };
            self.alert(&msg);
            return None;
        }

        let ip = ip.trim().to_string();
        if let Some(input) = doc.get_mut("input-agent-ip") {
            input.value = ip.clone();
        }
        if let Some(input) = doc.get_mut("input-risk") {
            input.value = risk.to_string();
        }
        // the user owns these inputs now
        state.config_loaded = true;
        if let Some(btn) = doc.get_mut("btn-save-settings") {
            btn.set_text(SAVING_LABEL);
            btn.disabled = true;
        }

        let req = SettingsRequest { agent_url: format!("http://{ip}:{}", self.agent_port), risk };
        let this = self.clone();
        Some(tokio::spawn(async move {
            info!("Updating settings: agent={} risk={}", req.agent_url, req.risk);
            let mut transport_failed = false;
            match this.backend.update_settings(&req).await {
                Ok(ack) if ack.is_updated() => this.alert("Configuration Updated Successfully!"),
                Ok(ack) => {
                    warn!("Settings not applied: {:?}", ack.status);
                    this.alert("Update Failed.");
                }
                Err(e) => {
                    transport_failed = true;
                    warn!("Settings request failed: {e}");
                    this.alert("Connection Error.");
                    this.report("error", "settings update failed", json!({
                        "agent_url": req.agent_url, "error": e.to_string(),
                    }));
                }
            }
            this.events.send(Event::SettingsFinished { transport_failed }).ok();
            this.events.send(Event::Refresh).ok();
        }))
    }

    pub fn alert(&self, message: &str) {
        self.events.send(Event::Alert(message.to_string())).ok();
    }

    /// Fire-and-forget diagnostic to `/api/client_log`.
    pub fn report(&self, level: &str, message: &str, context: serde_json::Value) {
        if !self.client_log {
            return;
        }
        let backend = self.backend.clone();
        let req = ClientLogRequest { level: level.to_string(), message: message.to_string(), context };
        tokio::spawn(async move {
            if let Err(e) = backend.client_log(&req).await {
                debug!("client_log dropped: {e}");
            }
        });
    }
}

/// Re-enable the settings button once the request has settled.
pub fn finish_settings(doc: &mut Document, transport_failed: bool) {
    if let Some(btn) = doc.get_mut("btn-save-settings") {
        btn.set_text(if transport_failed { SAVE_FAILED_LABEL } else { SAVE_LABEL });
        btn.disabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use tokio::sync::mpsc;

    #[test]
    fn test_parse_commands() {
        assert_eq!("start 4H1H".parse::<Command>().unwrap(), Command::Start { mode: "4H1H".into() });
        assert_eq!("STOP".parse::<Command>().unwrap(), Command::Stop);
        assert_eq!(
            "toggle gold_1h stop".parse::<Command>().unwrap(),
            Command::Toggle { target: "gold_1h".into(), action: ControlAction::Stop }
        );
        assert_eq!("stop-all".parse::<Command>().unwrap(), Command::StopAll);
        assert_eq!(
            "settings 10.0.0.5 5".parse::<Command>().unwrap(),
            Command::SaveSettings { ip: "10.0.0.5".into(), risk: 5.0 }
        );
        assert_eq!(
            "backtest 60".parse::<Command>().unwrap(),
            Command::RunBacktest { days: Some(60), capital: None }
        );
        assert_eq!(
            "trades gold-1h".parse::<Command>().unwrap(),
            Command::ShowTrades { widget_id: "gold-1h".into() }
        );
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("".parse::<Command>().is_err());
        assert!("toggle gold_1h pause".parse::<Command>().is_err());
        assert!("settings 10.0.0.5 lots".parse::<Command>().is_err());
        assert!("backtest thirty".parse::<Command>().is_err());
        assert!("launch rockets".parse::<Command>().is_err());
    }

    #[test]
    fn test_control_request_bodies() {
        let stop_all = control_request(&Command::StopAll).unwrap();
        assert_eq!(serde_json::to_value(&stop_all).unwrap(), json!({"action": "stop", "target": "all"}));
        let stop = control_request(&Command::Stop).unwrap();
        assert_eq!(serde_json::to_value(&stop).unwrap(), json!({"action": "stop"}));
        assert!(control_request(&Command::Refresh).is_none());
    }

    #[test]
    fn test_validate_settings() {
        assert!(validate_settings("10.0.0.5", 5.0).is_ok());
        assert!(validate_settings("  ", 5.0).is_err());
        assert!(validate_settings("10.0.0.5", 0.0).is_err());
        assert!(validate_settings("10.0.0.5", f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_control_failure_alerts_and_still_repolls() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_control(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(backend.clone(), tx, 8001, false);

        dispatcher.control(control_request(&Command::Stop).unwrap()).await.unwrap();

        assert!(matches!(rx.recv().await, Some(Event::Alert(msg)) if msg == "API Connection Error"));
        assert!(matches!(rx.recv().await, Some(Event::Refresh)));
    }

    #[tokio::test]
    async fn test_settings_posts_agent_url_and_marks_inputs_owned() {
        let backend = Arc::new(FakeBackend::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(backend.clone(), tx, 8001, false);
        let mut doc = Document::dashboard();
        let mut state = UiState::new();

        let handle = dispatcher.save_settings(&mut doc, &mut state, "10.0.0.5", 5.0).unwrap();
        handle.await.unwrap();

        assert!(state.config_loaded);
        assert_eq!(doc.text_of("btn-save-settings"), Some("UPDATING..."));
        assert!(doc.get("btn-save-settings").unwrap().disabled);
        assert_eq!(doc.get("input-agent-ip").unwrap().value, "10.0.0.5");
        assert_eq!(
            backend.settings_requests(),
            vec![SettingsRequest { agent_url: "http://10.0.0.5:8001".into(), risk: 5.0 }]
        );
        assert!(matches!(rx.recv().await, Some(Event::Alert(msg)) if msg == "Configuration Updated Successfully!"));
        assert!(matches!(rx.recv().await, Some(Event::SettingsFinished { transport_failed: false })));
        assert!(matches!(rx.recv().await, Some(Event::Refresh)));

        finish_settings(&mut doc, false);
        assert_eq!(doc.text_of("btn-save-settings"), Some("SAVE SETTINGS"));
        assert!(!doc.get("btn-save-settings").unwrap().disabled);
    }

    #[tokio::test]
    async fn test_settings_transport_error_marks_button_failed() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_settings(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(backend.clone(), tx, 8001, false);
        let mut doc = Document::dashboard();
        let mut state = UiState::new();

        dispatcher.save_settings(&mut doc, &mut state, "10.0.0.5", 2.0).unwrap().await.unwrap();

        assert!(matches!(rx.recv().await, Some(Event::Alert(msg)) if msg == "Connection Error."));
        let Some(Event::SettingsFinished { transport_failed }) = rx.recv().await else {
            panic!("expected SettingsFinished");
        };
        assert!(transport_failed);
        assert!(matches!(rx.recv().await, Some(Event::Refresh)));

        finish_settings(&mut doc, transport_failed);
        assert_eq!(doc.text_of("btn-save-settings"), Some("UPDATE FAILED"));
        assert!(!doc.get("btn-save-settings").unwrap().disabled);
    }

    #[tokio::test]
    async fn test_invalid_settings_send_nothing() {
        let backend = Arc::new(FakeBackend::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(backend.clone(), tx, 8001, false);
        let mut doc = Document::dashboard();
        let mut state = UiState::new();

        assert!(dispatcher.save_settings(&mut doc, &mut state, "", 5.0).is_none());
        assert!(backend.settings_requests().is_empty());
        assert!(!state.config_loaded);
        assert!(matches!(rx.recv().await, Some(Event::Alert(msg)) if msg.contains("IP address")));
    }
}

//! In-memory backend for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::Backend;
use crate::error::{DashboardError, Result};
use crate::types::{
    BacktestRequest, BacktestResult, ClientLogRequest, ControlRequest, SettingsAck,
    SettingsRequest, StatusSnapshot,
};

#[derive(Default)]
pub struct FakeBackend {
    snapshot: Mutex<Option<StatusSnapshot>>,
    fail_control: Mutex<bool>,
    fail_settings: Mutex<bool>,
    settings_status: Mutex<Option<String>>,
    /// strategy name -> canned response; missing entries fail with a 500
    backtests: Mutex<HashMap<String, std::result::Result<BacktestResult, String>>>,
    controls: Mutex<Vec<ControlRequest>>,
    settings: Mutex<Vec<SettingsRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let fake = Self::default();
        *fake.settings_status.lock().unwrap() = Some("updated".to_string());
        fake
    }

    pub fn set_snapshot(&self, snap: StatusSnapshot) {
        *self.snapshot.lock().unwrap() = Some(snap);
    }

    pub fn fail_control(&self, fail: bool) {
        *self.fail_control.lock().unwrap() = fail;
    }

    pub fn fail_settings(&self, fail: bool) {
        *self.fail_settings.lock().unwrap() = fail;
    }

    pub fn set_settings_status(&self, status: &str) {
        *self.settings_status.lock().unwrap() = Some(status.to_string());
    }

    pub fn set_backtest(&self, strategy: &str, result: BacktestResult) {
        self.backtests.lock().unwrap().insert(strategy.to_string(), Ok(result));
    }

    /// Make `strategy` answer with an in-band `error` field.
    pub fn set_backtest_error(&self, strategy: &str, error: &str) {
        self.backtests.lock().unwrap().insert(strategy.to_string(), Err(error.to_string()));
    }

    pub fn control_requests(&self) -> Vec<ControlRequest> {
        self.controls.lock().unwrap().clone()
    }

    pub fn settings_requests(&self) -> Vec<SettingsRequest> {
        self.settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_status(&self) -> Result<StatusSnapshot> {
        self.snapshot.lock().unwrap().clone().ok_or_else(|| DashboardError::Status {
            status: 503,
            body: "no snapshot".into(),
        })
    }

    async fn control(&self, req: &ControlRequest) -> Result<()> {
        self.controls.lock().unwrap().push(req.clone());
        if *self.fail_control.lock().unwrap() {
            return Err(DashboardError::Status { status: 500, body: "engine crashed".into() });
        }
        Ok(())
    }

    async fn update_settings(&self, req: &SettingsRequest) -> Result<SettingsAck> {
        self.settings.lock().unwrap().push(req.clone());
        if *self.fail_settings.lock().unwrap() {
            return Err(DashboardError::Status { status: 502, body: "bad gateway".into() });
        }
        Ok(SettingsAck { status: self.settings_status.lock().unwrap().clone(), persisted: Some(true) })
    }

    async fn backtest(&self, req: &BacktestRequest) -> Result<BacktestResult> {
        let canned = self.backtests.lock().unwrap().get(&req.strategy).cloned();
        match canned {
            Some(Ok(result)) => Ok(result),
            Some(Err(error)) => Err(DashboardError::Backend(error)),
            None => Err(DashboardError::Status { status: 500, body: "simulator down".into() }),
        }
    }

    async fn client_log(&self, _req: &ClientLogRequest) -> Result<()> {
        Ok(())
    }
}

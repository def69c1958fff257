use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::types::{
    BacktestRequest, BacktestResult, ClientLogRequest, ControlRequest, SettingsAck,
    SettingsRequest, StatusSnapshot,
};

/// The remote trading backend as seen by the dashboard.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_status(&self) -> Result<StatusSnapshot>;
    async fn control(&self, req: &ControlRequest) -> Result<()>;
    async fn update_settings(&self, req: &SettingsRequest) -> Result<SettingsAck>;
    async fn backtest(&self, req: &BacktestRequest) -> Result<BacktestResult>;
    async fn client_log(&self, req: &ClientLogRequest) -> Result<()>;
}

/// HTTP client for the backend's JSON API.
#[derive(Clone)]
pub struct BackendClient {
    api_base: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.client.get(self.url(path)).send().await?;
        decode(resp).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        decode(resp).await
    }
}

/// Non-success statuses become `DashboardError::Status`; the body must parse
/// as JSON in full or the whole response is rejected.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(DashboardError::Status {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl Backend for BackendClient {
    async fn fetch_status(&self) -> Result<StatusSnapshot> {
        self.get_json("/api/status").await
    }

    async fn control(&self, req: &ControlRequest) -> Result<()> {
        let ack: serde_json::Value = self.post_json("/api/control", req).await?;
        debug!("Control {:?} acknowledged: {ack}", req.action);
        Ok(())
    }

    async fn update_settings(&self, req: &SettingsRequest) -> Result<SettingsAck> {
        self.post_json("/api/settings", req).await
    }

    async fn backtest(&self, req: &BacktestRequest) -> Result<BacktestResult> {
        let result: BacktestResult = self.post_json("/api/backtest", req).await?;
        debug!(
            "Backtest {} {} {}: {} trades",
            req.strategy, req.symbol, req.timeframe, result.total_trades
        );
        result.into_result()
    }

    async fn client_log(&self, req: &ClientLogRequest) -> Result<()> {
        let resp = self.client.post(self.url("/api/client_log")).json(req).send().await?;
        if !resp.status().is_success() {
            return Err(DashboardError::Status { status: resp.status().as_u16(), body: String::new() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ControlAction;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    /// Serve `router` on an ephemeral port and return a client pointed at it.
    async fn serve(router: Router) -> BackendClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let config = Config { api_base: format!("http://{addr}"), ..Config::default() };
        BackendClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_status() {
        let router = Router::new().route(
            "/api/status",
            get(|| async {
                Json(serde_json::json!({
                    "active": true,
                    "config": {"active_mode": "4H1H", "agent_url": "http://10.0.0.5:8001", "risk": 5.0},
                    "statuses": {"BITCOIN": "Scanning"},
                    "logs": ["[SCAN] ok"]
                }))
            }),
        );
        let client = serve(router).await;
        let snap = client.fetch_status().await.unwrap();
        assert!(snap.active);
        assert_eq!(snap.statuses["BITCOIN"], "Scanning");
    }

    #[tokio::test]
    async fn test_non_json_body_is_an_error() {
        let router = Router::new().route("/api/status", get(|| async { "<html>oops</html>" }));
        let client = serve(router).await;
        assert!(matches!(client.fetch_status().await, Err(DashboardError::Json(_))));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let router = Router::new().route(
            "/api/status",
            get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let client = serve(router).await;
        match client.fetch_status().await {
            Err(DashboardError::Status { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_control_posts_body() {
        let seen: Arc<Mutex<Option<serde_json::Value>>> = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let router = Router::new().route(
            "/api/control",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some(body);
                    Json(serde_json::json!({"status": "ok"}))
                }
            }),
        );
        let client = serve(router).await;
        let req = ControlRequest { action: ControlAction::Start, mode: Some("4H1H".into()), target: None };
        client.control(&req).await.unwrap();
        assert_eq!(
            seen.lock().unwrap().clone(),
            Some(serde_json::json!({"action": "start", "mode": "4H1H"}))
        );
    }

    #[tokio::test]
    async fn test_backtest_error_field_is_surfaced() {
        let router = Router::new().route(
            "/api/backtest",
            post(|| async { Json(serde_json::json!({"error": "No Data"})) }),
        );
        let client = serve(router).await;
        let req = BacktestRequest {
            strategy: "GoldTrend".into(),
            symbol: "GOLD".into(),
            timeframe: "1h".into(),
            balance: 1000.0,
            days: 30,
        };
        assert!(matches!(client.backtest(&req).await, Err(DashboardError::Backend(_))));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let config = Config { api_base: "http://127.0.0.1:9".into(), ..Config::default() };
        let client = BackendClient::new(&config).unwrap();
        assert!(matches!(client.fetch_status().await, Err(DashboardError::Http(_))));
    }
}

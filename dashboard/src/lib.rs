//! Terminal dashboard for a remote trading-bot backend.
//!
//! Polls `/api/status`, reconciles a keyed element tree against each
//! snapshot, and forwards start/stop/settings/backtest actions to the backend.

pub mod app;
pub mod backtest;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod log_style;
pub mod modal;
pub mod poller;
pub mod render;
pub mod state;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

use std::collections::HashMap;

use crate::types::Trade;

/// Client-local state that does not live in the document itself.
///
/// Owned by the event loop. `reset()` returns it to the freshly started state
/// (used when the dashboard reinitialises).
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Set once the settings inputs were populated from a snapshot or edited
    /// by the user; later snapshots never touch them again.
    pub config_loaded: bool,
    /// Widget id -> trades from the latest backtest run. Cleared at the start
    /// of every run.
    pub backtest_trades: HashMap<String, Vec<Trade>>,
    pub backtest_running: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn trades_for(&self, widget_id: &str) -> Option<&[Trade]> {
        self.backtest_trades.get(widget_id).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TradeSide;

    #[test]
    fn test_reset_clears_everything() {
        let mut state = UiState::new();
        state.config_loaded = true;
        state.backtest_running = true;
        state.backtest_trades.insert(
            "gold-1h".into(),
            vec![Trade {
                entry_time: 1.0,
                side: TradeSide::Long,
                entry: 1.0,
                exit: 2.0,
                pnl: 1.0,
                exit_time: None,
                size: None,
                note: None,
            }],
        );
        assert_eq!(state.trades_for("gold-1h").map(|t| t.len()), Some(1));

        state.reset();
        assert!(!state.config_loaded);
        assert!(!state.backtest_running);
        assert!(state.trades_for("gold-1h").is_none());
    }
}

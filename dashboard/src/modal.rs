use chrono::{DateTime, Local, Utc};

use crate::backtest::signed;
use crate::document::{Document, Element};
use crate::state::UiState;
use crate::types::{Trade, TradeSide};

const EMPTY_MESSAGE: &str = "No trades recorded for this period.";

/// Fill the trade modal for `widget_id` and open it.
///
/// Stored trades are assumed chronological, so the latest entry is shown
/// first by reversing them; `entry_time` is not used for ordering.
pub fn show_trades(doc: &mut Document, state: &UiState, widget_id: &str) {
    let rows: Vec<Element> = match state.trades_for(widget_id) {
        Some(trades) if !trades.is_empty() => trades.iter().rev().map(trade_row).collect(),
        _ => vec![Element::text(EMPTY_MESSAGE).with_class("placeholder")],
    };

    let Some(tbody) = doc.get_mut("trades-table-body") else {
        return;
    };
    tbody.replace_children(rows);

    if let Some(title) = doc.get_mut("trades-title") {
        title.set_text(format!("Trades: {widget_id}"));
    }
    if let Some(modal) = doc.get_mut("trades-modal") {
        modal.hidden = false;
    }
}

pub fn close_trades(doc: &mut Document) {
    if let Some(modal) = doc.get_mut("trades-modal") {
        modal.hidden = true;
    }
}

pub fn trade_row(trade: &Trade) -> Element {
    let mut row = Element::new().with_class("row");
    row.push_child(Element::text(format_entry_time(trade.entry_time)).with_class("time"));
    row.push_child(Element::text(trade.side.to_string()).with_class(match trade.side {
        TradeSide::Long => "long",
        TradeSide::Short => "short",
    }));
    row.push_child(Element::text(format!("${:.2}", trade.entry)));
    row.push_child(Element::text(format!("${:.2}", trade.exit)));
    row.push_child(
        Element::text(signed(trade.pnl)).with_class(if trade.pnl >= 0.0 { "positive" } else { "negative" }),
    );
    row
}

/// Local date/time for a unix-seconds timestamp.
pub fn format_entry_time(secs: f64) -> String {
    if !secs.is_finite() {
        return "--".to_string();
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    match DateTime::<Utc>::from_timestamp(whole as i64, nanos) {
        Some(utc) => utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(t: f64, side: TradeSide, pnl: f64) -> Trade {
        Trade { entry_time: t, side, entry: 100.0, exit: 100.0 + pnl, pnl, exit_time: None, size: None, note: None }
    }

    #[test]
    fn test_latest_trade_first() {
        let mut doc = Document::dashboard();
        let mut state = UiState::new();
        state.backtest_trades.insert(
            "gold-1h".into(),
            vec![trade(1.0, TradeSide::Long, 5.0), trade(2.0, TradeSide::Short, -3.0)],
        );

        show_trades(&mut doc, &state, "gold-1h");

        let rows = doc.get("trades-table-body").unwrap().children();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].children()[0].text, format_entry_time(2.0));
        assert_eq!(rows[0].children()[4].text, "-3.00");
        assert!(rows[0].children()[4].has_class("negative"));
        assert!(rows[0].children()[1].has_class("short"));
        assert_eq!(rows[1].children()[4].text, "+5.00");
        assert!(rows[1].children()[1].has_class("long"));
        assert!(!doc.get("trades-modal").unwrap().hidden);
    }

    #[test]
    fn test_missing_or_empty_shows_placeholder() {
        let mut doc = Document::dashboard();
        let mut state = UiState::new();
        show_trades(&mut doc, &state, "gold-5m");
        let rows = doc.get("trades-table-body").unwrap().children();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, EMPTY_MESSAGE);

        state.backtest_trades.insert("gold-5m".into(), vec![]);
        show_trades(&mut doc, &state, "gold-5m");
        assert_eq!(doc.get("trades-table-body").unwrap().children()[0].text, EMPTY_MESSAGE);
    }

    #[test]
    fn test_close_hides_modal() {
        let mut doc = Document::dashboard();
        let state = UiState::new();
        show_trades(&mut doc, &state, "x");
        close_trades(&mut doc);
        assert!(doc.get("trades-modal").unwrap().hidden);
    }

    #[test]
    fn test_format_entry_time() {
        let expected = DateTime::<Utc>::from_timestamp(1_700_000_000, 0)
            .unwrap()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(format_entry_time(1_700_000_000.0), expected);
        assert_eq!(format_entry_time(f64::NAN), "--");
    }
}

//! Plain-text rendering of the document for the terminal.

use std::fmt::Write;

use crate::backtest::BACKTEST_PLAN;
use crate::document::{Document, Element, BTC_BREAKOUT, GOLD, GOLD_TIMEFRAMES};

const RESET: &str = "\x1b[0m";

/// ANSI colour for an element, from the first class that maps to one.
fn ansi(el: &Element) -> Option<&'static str> {
    el.classes().find_map(|class| match class {
        "online" | "bullish" | "trend-up" | "positive" | "oversold" | "strong-trend" | "log-signal"
        | "long" | "active" => Some("\x1b[32m"),
        "offline" | "bearish" | "trend-down" | "negative" | "overbought" | "log-error" | "error"
        | "short" => Some("\x1b[31m"),
        "log-trade" => Some("\x1b[34m"),
        "log-exit" | "log-warn" | "partial" | "weak-trend" => Some("\x1b[33m"),
        "neutral" => Some("\x1b[36m"),
        "log-scan" | "log-dim" | "idle" | "loading" | "placeholder" => Some("\x1b[2m"),
        "signal" => Some("\x1b[1m"),
        _ => None,
    })
}

fn paint(el: &Element, color: bool) -> String {
    match (color, ansi(el)) {
        (true, Some(code)) => format!("{code}{}{RESET}", el.text),
        _ => el.text.clone(),
    }
}

fn cell(doc: &Document, id: &str, color: bool) -> String {
    doc.get(id).map(|el| paint(el, color)).unwrap_or_default()
}

fn lines(doc: &Document, id: &str, color: bool, out: &mut String) {
    if let Some(panel) = doc.get(id) {
        for line in panel.children() {
            let _ = writeln!(out, "  {}", paint(line, color));
        }
    }
}

pub fn render_frame(doc: &Document, color: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{}   balance {}   equity {}",
        cell(doc, "global-status", color),
        cell(doc, "header-balance", color),
        cell(doc, "val-equity", color),
    );
    let modes: Vec<String> = ["mode-4h", "mode-15m"]
        .iter()
        .filter_map(|id| doc.get(id))
        .map(|el| {
            let marker = if el.has_class("active") { "*" } else { " " };
            format!("[{marker}] {}", paint(el, color))
        })
        .collect();
    let _ = writeln!(out, "{}", modes.join("  "));
    if doc.get("btn-stop").is_some_and(|b| !b.hidden) {
        let _ = writeln!(out, "(stop-all available)");
    }

    let _ = writeln!(out, "\nMARKET");
    let _ = writeln!(out, "  {:<10} {:>12} {:>8} {:>6} {:>8}  STATUS", "SYMBOL", "PRICE", "RSI", "TREND", "ADX");
    if let Some(tbody) = doc.get("market-table-body") {
        for row in tbody.children() {
            let c = row.children();
            if c.len() < 6 {
                continue;
            }
            // pad on the raw text so colour codes don't skew the columns
            let _ = writeln!(
                out,
                "  {:<10} {:>12} {} {} {:>8}  {}",
                c[0].text,
                c[1].text,
                pad_left(&c[2], 8, color),
                pad_left(&c[3], 6, color),
                c[4].text,
                paint(&c[5], color),
            );
        }
    }
    let _ = writeln!(out, "\nLOGS");
    lines(doc, "logs-container", color, &mut out);

    let id = BTC_BREAKOUT;
    let _ = writeln!(
        out,
        "\nBTC BREAKOUT 5M  {}  [{}]",
        cell(doc, &format!("status-{id}"), color),
        cell(doc, &format!("btn-{id}"), false),
    );
    let _ = writeln!(
        out,
        "  price {}  high {}  low {}  adx {}  {}",
        cell(doc, &format!("price-{id}"), color),
        cell(doc, &format!("high-{id}"), color),
        cell(doc, &format!("low-{id}"), color),
        cell(doc, &format!("adx-{id}"), color),
        cell(doc, &format!("signal-{id}"), color),
    );
    lines(doc, &format!("logs-{id}"), color, &mut out);

    let _ = writeln!(out, "\nGOLD  {}", cell(doc, &format!("status-{GOLD}"), color));
    for tf in GOLD_TIMEFRAMES {
        let _ = writeln!(
            out,
            "  {tf:<4} {}  price {}  rsi {}  adx {}  [{}]",
            cell(doc, &format!("status-{GOLD}-{tf}"), color),
            cell(doc, &format!("price-{GOLD}-{tf}"), color),
            cell(doc, &format!("dema-{GOLD}-{tf}"), color),
            cell(doc, &format!("super-{GOLD}-{tf}"), color),
            cell(doc, &format!("btn-{GOLD}-{tf}"), false),
        );
    }
    lines(doc, &format!("logs-{GOLD}"), color, &mut out);

    let _ = writeln!(
        out,
        "\nBACKTEST ({} days)  [{}]",
        cell(doc, "bt-label-days-header", false),
        cell(doc, "btn-run-backtest", false),
    );
    for target in BACKTEST_PLAN {
        let _ = writeln!(
            out,
            "  {:<16} win {}  pnl {}",
            target.id,
            cell(doc, &format!("wr-{}", target.id), color),
            cell(doc, &format!("pnl-{}", target.id), color),
        );
    }

    if doc.get("trades-modal").is_some_and(|m| !m.hidden) {
        let _ = writeln!(out, "\n{}", cell(doc, "trades-title", false));
        if let Some(tbody) = doc.get("trades-table-body") {
            for row in tbody.children() {
                if row.children().is_empty() {
                    let _ = writeln!(out, "  {}", paint(row, color));
                    continue;
                }
                let cols: Vec<String> = row.children().iter().map(|c| paint(c, color)).collect();
                let _ = writeln!(out, "  {}", cols.join("  "));
            }
        }
    }

    if let Some(alert) = doc.get("alert").filter(|a| !a.hidden) {
        let _ = writeln!(out, "\n! {}", alert.text);
    }

    out
}

fn pad_left(el: &Element, width: usize, color: bool) -> String {
    let pad = width.saturating_sub(el.text.chars().count());
    format!("{}{}", " ".repeat(pad), paint(el, color))
}

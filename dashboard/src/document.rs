//! Keyed element tree the renderer reconciles against.
//!
//! Stand-in for the browser DOM: a flat map from element id to [`Element`],
//! where table bodies and log panels hold their rows as child elements.
//! Lookups on ids that the layout does not define return `None`, and the
//! renderer skips them silently.

use std::collections::{BTreeSet, HashMap};

use crate::backtest::BACKTEST_PLAN;
use crate::dispatch::Command;

/// Widget id of the single-engine Bitcoin breakout card.
pub const BTC_BREAKOUT: &str = "btc-breakout-5m";
/// Section name of the multi-timeframe gold card.
pub const GOLD: &str = "gold";
pub const GOLD_TIMEFRAMES: [&str; 3] = ["1h", "15m", "5m"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub text: String,
    /// Current value of an input field
    pub value: String,
    pub hidden: bool,
    pub disabled: bool,
    pub on_click: Option<Command>,
    classes: BTreeSet<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn hidden_initially(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Replace the whole class list.
    pub fn set_classes(&mut self, classes: &[&str]) {
        self.classes = classes.iter().map(|c| c.to_string()).collect();
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn replace_children(&mut self, children: Vec<Element>) {
        self.children = children;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: HashMap<String, Element>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dashboard's fixed set of targets.
    pub fn dashboard() -> Self {
        let mut doc = Self::new();

        // Header and global controls
        doc.insert("global-status", Element::text("CONNECTING..."));
        doc.insert("btn-stop", Element::text("STOP ALL").hidden_initially());
        doc.insert("mode-4h", Element::text("4H / 1H SWING").with_class("mode-card"));
        doc.insert("mode-15m", Element::text("15M SCALP").with_class("mode-card"));
        doc.insert("header-balance", Element::text("$ --"));
        doc.insert("val-balance", Element::text("$ --"));
        doc.insert("val-equity", Element::text("$ --"));
        doc.insert("market-table-body", Element::new());
        doc.insert("logs-container", Element::new());
        doc.insert("alert", Element::new().hidden_initially());

        // Settings inputs
        doc.insert("input-agent-ip", Element::new());
        doc.insert("input-risk", Element::new());
        doc.insert("btn-save-settings", Element::text("SAVE SETTINGS"));

        // Bitcoin breakout card
        for prefix in ["status", "btn", "price", "high", "low", "adx", "signal", "logs"] {
            doc.insert(&format!("{prefix}-{BTC_BREAKOUT}"), Element::text(placeholder(prefix)));
        }

        // Gold multi-timeframe card
        doc.insert(&format!("status-{GOLD}"), Element::text("STANDBY"));
        doc.insert(&format!("logs-{GOLD}"), Element::new());
        for tf in GOLD_TIMEFRAMES {
            for prefix in ["ind", "status", "btn", "price", "dema", "super"] {
                doc.insert(&format!("{prefix}-{GOLD}-{tf}"), Element::text(placeholder(prefix)));
            }
        }

        // Backtest panel
        doc.insert("btn-run-backtest", Element::text("Run Analysis"));
        doc.insert("bt-label-days-header", Element::text("--").with_class("bt-label-days"));
        doc.insert("bt-label-days-table", Element::text("--").with_class("bt-label-days"));
        for item in BACKTEST_PLAN {
            doc.insert(&format!("res-{}", item.id), Element::new());
            doc.insert(&format!("wr-{}", item.id), Element::text("--"));
            doc.insert(&format!("pnl-{}", item.id), Element::text("--"));
        }

        // Trade modal
        doc.insert("trades-modal", Element::new().hidden_initially());
        doc.insert("trades-title", Element::new());
        doc.insert("trades-table-body", Element::new());

        doc
    }

    pub fn insert(&mut self, id: &str, element: Element) {
        self.elements.insert(id.to_string(), element);
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn text_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|e| e.text.as_str())
    }

    /// Every element carrying `class`, in no particular order.
    pub fn select_class_mut(&mut self, class: &str) -> impl Iterator<Item = &mut Element> + '_ {
        let class = class.to_string();
        self.elements.values_mut().filter(move |e| e.has_class(&class))
    }
}

fn placeholder(prefix: &str) -> &'static str {
    match prefix {
        "logs" | "ind" | "btn" => "",
        "status" => "STANDBY",
        _ => "--",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_operations() {
        let mut el = Element::new().with_class("mode-card");
        el.add_class("active");
        assert!(el.has_class("active"));
        el.remove_class("active");
        assert!(!el.has_class("active"));
        el.set_classes(&["online"]);
        assert_eq!(el.classes().collect::<Vec<_>>(), vec!["online"]);
    }

    #[test]
    fn test_dashboard_layout_targets() {
        let doc = Document::dashboard();
        assert!(doc.get("global-status").is_some());
        assert!(doc.get("btn-stop").unwrap().hidden);
        assert!(doc.get("dema-gold-15m").is_some());
        assert!(doc.get("wr-gold-5m").is_some());
        assert_eq!(doc.text_of("btn-save-settings"), Some("SAVE SETTINGS"));
        assert!(doc.get("does-not-exist").is_none());
    }

    #[test]
    fn test_select_class() {
        let mut doc = Document::dashboard();
        for el in doc.select_class_mut("mode-card") {
            el.add_class("active");
        }
        assert!(doc.get("mode-4h").unwrap().has_class("active"));
        assert!(doc.get("mode-15m").unwrap().has_class("active"));
        assert!(!doc.get("global-status").unwrap().has_class("active"));
    }
}

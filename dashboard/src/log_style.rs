use crate::document::Element;

/// Visual style of one log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    Signal,
    Trade,
    Exit,
    Error,
    Warn,
    Scan,
    Dim,
}

impl LogStyle {
    pub fn class(self) -> &'static str {
        match self {
            LogStyle::Signal => "log-signal",
            LogStyle::Trade => "log-trade",
            LogStyle::Exit => "log-exit",
            LogStyle::Error => "log-error",
            LogStyle::Warn => "log-warn",
            LogStyle::Scan => "log-scan",
            LogStyle::Dim => "log-dim",
        }
    }
}

/// Tag → style, evaluated top to bottom; first substring hit wins.
pub const LOG_RULES: &[(&str, LogStyle)] = &[
    ("[SIGNAL]", LogStyle::Signal),
    ("[TRADE]", LogStyle::Trade),
    ("[EXIT]", LogStyle::Exit),
    ("[ERROR]", LogStyle::Error),
    ("[WARN]", LogStyle::Warn),
    ("[SCAN]", LogStyle::Scan),
];

pub fn classify(line: &str) -> LogStyle {
    LOG_RULES
        .iter()
        .find(|(tag, _)| line.contains(tag))
        .map(|&(_, style)| style)
        .unwrap_or(LogStyle::Dim)
}

pub fn log_line(line: &str) -> Element {
    Element::text(line).with_class(classify(line).class())
}

/// First `limit` lines as styled panel rows.
pub fn log_lines<'a, I>(lines: I, limit: usize) -> Vec<Element>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().take(limit).map(log_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_tag() {
        assert_eq!(classify("12:00 [SIGNAL] long BITCOIN"), LogStyle::Signal);
        assert_eq!(classify("[TRADE] filled"), LogStyle::Trade);
        assert_eq!(classify("[EXIT] tp hit"), LogStyle::Exit);
        assert_eq!(classify("[ERROR] agent down"), LogStyle::Error);
        assert_eq!(classify("[WARN] slow"), LogStyle::Warn);
        assert_eq!(classify("[SCAN] nothing"), LogStyle::Scan);
        assert_eq!(classify("plain text"), LogStyle::Dim);
    }

    #[test]
    fn test_priority_order() {
        // both tags present: SIGNAL outranks ERROR
        assert_eq!(classify("[ERROR] retry after [SIGNAL]"), LogStyle::Signal);
        assert_eq!(classify("[SCAN] [WARN] stale candle"), LogStyle::Warn);
    }

    #[test]
    fn test_tag_match_is_case_sensitive() {
        assert_eq!(classify("[signal] lowercase"), LogStyle::Dim);
    }

    #[test]
    fn test_log_lines_caps_at_limit() {
        let raw: Vec<String> = (0..50).map(|i| format!("[SCAN] tick {i}")).collect();
        let rows = log_lines(raw.iter().map(String::as_str), 20);
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0].text, "[SCAN] tick 0");
        assert!(rows[0].has_class("log-scan"));

        assert!(log_lines(std::iter::empty(), 20).is_empty());
    }
}

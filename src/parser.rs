/// Metric extraction from free-form experiment logs.
///
/// Two formats are recognized, tried in priority order:
/// - Dictionary: `test result: {'recall@10': 0.1234, 'ndcg@10': 0.0567}`
/// - Line/inline: `recall@10 : 0.1234` or `ndcg@10=0.0567` anywhere on a line
///
/// The first strategy that yields at least one pair is authoritative for the
/// whole text; lower-priority strategies are not consulted.
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `test result` header followed by a brace-delimited block (case-insensitive).
static DICT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)test result[:\s]*\{([^}]*)\}").unwrap());

/// `key@N: value` inside a dictionary block, key optionally quoted.
static DICT_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]?(\w+@\d+)['"]?\s*:\s*([\d.]+(?:[eE][+-]?\d+)?)"#).unwrap()
});

/// `key@N: value` or `key@N = value` anywhere on a line.
static LINE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+@\d+)\s*[:=]\s*([\d.]+(?:[eE][+-]?\d+)?)").unwrap());

/// Which recognition strategy produced a set of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `test result: {...}` block.
    Dictionary,
    /// Line-by-line `key@N : value` scan.
    Line,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Dictionary => write!(f, "dictionary"),
            Strategy::Line => write!(f, "line"),
        }
    }
}

/// Metrics found in one text, with the strategy that found them.
#[derive(Debug, Default)]
pub struct ParsedMetrics {
    /// `None` when nothing recognizable was found.
    pub strategy: Option<Strategy>,
    pub metrics: BTreeMap<String, f64>,
}

/// Extract metric key/value pairs from raw log text.
///
/// Never fails: unrecognizable text yields an empty map.
pub fn parse(text: &str) -> BTreeMap<String, f64> {
    parse_with_strategy(text).metrics
}

/// Like [`parse`], but also reports which strategy matched.
pub fn parse_with_strategy(text: &str) -> ParsedMetrics {
    let metrics = parse_dictionary(text);
    if !metrics.is_empty() {
        return ParsedMetrics {
            strategy: Some(Strategy::Dictionary),
            metrics,
        };
    }

    let metrics = parse_lines(text);
    if !metrics.is_empty() {
        return ParsedMetrics {
            strategy: Some(Strategy::Line),
            metrics,
        };
    }

    ParsedMetrics::default()
}

/// Scan every `test result: {...}` block in text order.
fn parse_dictionary(text: &str) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    for block in DICT_BLOCK.captures_iter(text) {
        let body = &block[1];
        for pair in DICT_PAIR.captures_iter(body) {
            insert_pair(&mut metrics, &pair[1], &pair[2]);
        }
    }
    metrics
}

fn parse_lines(text: &str) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    for line in text.lines() {
        for pair in LINE_PAIR.captures_iter(line) {
            insert_pair(&mut metrics, &pair[1], &pair[2]);
        }
    }
    metrics
}

/// Normalize the key and record the value; later inserts overwrite earlier ones.
fn insert_pair(metrics: &mut BTreeMap<String, f64>, key: &str, raw_value: &str) {
    match parse_value(raw_value) {
        Some(value) => {
            metrics.insert(key.to_lowercase(), value);
        }
        None => {
            tracing::debug!(key, value = raw_value, "dropping malformed metric value");
        }
    }
}

/// Parse a captured number. One trailing `.` is sentence punctuation
/// (`recall@10: 0.1234.`), not part of the value.
fn parse_value(raw: &str) -> Option<f64> {
    let raw = match raw.strip_suffix('.') {
        Some(trimmed) if !trimmed.ends_with('.') => trimmed,
        _ => raw,
    };
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

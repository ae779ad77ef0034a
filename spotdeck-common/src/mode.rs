//! Operating mode detection from free-text spot annotations

use regex::Regex;
use std::sync::LazyLock;

/// Keyword patterns in priority order. The first match wins, so digital
/// modes are checked before the generic voice/CW words that often appear
/// next to them in cluster comments.
static MODE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("FT8", r"\bFT-?8\b"),
        ("FT4", r"\bFT-?4\b"),
        ("JT65", r"\bJT-?65[ABC]?\b"),
        ("JT9", r"\bJT-?9\b"),
        ("WSPR", r"\bWSPR\b"),
        ("MSK144", r"\bMSK-?144\b"),
        ("Q65", r"\bQ65[A-E]?\b"),
        ("JS8", r"\bJS8(CALL)?\b"),
        ("PSK31", r"\b(BPSK|PSK)-?31\b"),
        ("PSK63", r"\b(BPSK|PSK)-?63\b"),
        ("RTTY", r"\bRTTY\b"),
        ("SSTV", r"\bSSTV\b"),
        ("CW", r"\bCW\b"),
        ("SSB", r"\b(SSB|USB|LSB)\b"),
        ("FM", r"\bFM\b"),
        ("AM", r"\bAM\b"),
    ]
    .into_iter()
    .filter_map(|(mode, pattern)| Regex::new(pattern).ok().map(|re| (mode, re)))
    .collect()
});

/// Detect the operating mode mentioned in an annotation such as a cluster
/// comment ("FT8 -12dB") or a telemetry mode field ("ft8").
pub fn detect_mode(annotation: &str) -> Option<&'static str> {
    let text = annotation.to_ascii_uppercase();
    if text.trim().is_empty() {
        return None;
    }
    MODE_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&text))
        .map(|(mode, _)| *mode)
}

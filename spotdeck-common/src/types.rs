//! Shared data types for both spot pipelines and the views they publish

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::band::Band;

/// Two telemetry frequencies closer than this collapse into one report
pub const DEDUP_BUCKET_HZ: u64 = 1_000;

/// Convert a kHz frequency into integer Hz, rounding to the nearest Hz.
pub fn khz_to_hz(freq_khz: f64) -> u64 {
    if freq_khz.is_finite() && freq_khz > 0.0 {
        (freq_khz * 1000.0).round() as u64
    } else {
        0
    }
}

/// One DX-cluster spot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    /// Station that was heard, e.g. "JA1ABC"
    pub dx_call: String,
    /// Station that reported hearing it, e.g. "W1AW"
    pub spotter_call: String,
    /// Frequency in kHz
    pub freq_khz: f64,
    pub comment: String,
    /// Time label reported by the cluster itself, if any
    pub timestamp: Option<String>,
    /// Last time this spot appeared in a fetched snapshot
    pub last_seen: DateTime<Utc>,
}

/// Identity of a spot across successive snapshots
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpotKey {
    pub dx_call: String,
    pub freq_hz: u64,
    pub spotter_call: String,
}

impl Spot {
    pub fn key(&self) -> SpotKey {
        SpotKey {
            dx_call: self.dx_call.clone(),
            freq_hz: khz_to_hz(self.freq_khz),
            spotter_call: self.spotter_call.clone(),
        }
    }

    pub fn band(&self) -> Band {
        Band::from_khz(self.freq_khz)
    }
}

/// Which of the two telemetry sets a report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDirection {
    /// The operator transmitted and the counterparty heard it
    HeardByOthers,
    /// The operator received the counterparty
    HeardByMe,
}

/// One classified telemetry observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub direction: ReportDirection,
    pub counterparty_call: String,
    pub counterparty_grid: Option<String>,
    pub freq_hz: u64,
    pub band: Band,
    pub mode: String,
    /// Signal report in dB
    pub snr: Option<i32>,
    pub observed_at_ms: i64,
    /// Whole minutes since `observed_at_ms`, refreshed by the aging sweep
    pub age_minutes: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl Report {
    /// Recompute `age_minutes` relative to `now_ms`. Timestamps from the
    /// future (clock skew) count as age zero.
    pub fn refresh_age(&mut self, now_ms: i64) {
        self.age_minutes = (now_ms - self.observed_at_ms).max(0) / 60_000;
    }

    /// Whether two reports fall into the same dedup bucket
    pub fn same_bucket(&self, other: &Report) -> bool {
        self.counterparty_call
            .eq_ignore_ascii_case(&other.counterparty_call)
            && self.freq_hz.abs_diff(other.freq_hz) < DEDUP_BUCKET_HZ
    }
}

/// Connection / polling status shown next to each view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disabled,
    Connecting,
    Connected,
    Offline,
    Reconnecting,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disabled => "disabled",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Offline => "offline",
            ConnectionStatus::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Materialized cluster view handed to consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterView {
    /// Filtered spots, newest first
    pub spots: Vec<Spot>,
    /// Spots held before filtering
    pub total: usize,
    /// Spots left after filtering
    pub shown: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub status: ConnectionStatus,
    pub active_source: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

/// Materialized telemetry view handed to consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PskView {
    pub operator: Option<String>,
    pub heard_by_others: Vec<Report>,
    pub heard_by_me: Vec<Report>,
    pub heard_by_others_count: usize,
    pub heard_by_me_count: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub status: ConnectionStatus,
    pub last_update: Option<DateTime<Utc>>,
}

impl PskView {
    pub fn disabled() -> Self {
        Self {
            operator: None,
            heard_by_others: Vec::new(),
            heard_by_me: Vec::new(),
            heard_by_others_count: 0,
            heard_by_me_count: 0,
            loading: false,
            error: None,
            status: ConnectionStatus::Disabled,
            last_update: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(call: &str, freq_hz: u64) -> Report {
        Report {
            direction: ReportDirection::HeardByMe,
            counterparty_call: call.to_string(),
            counterparty_grid: None,
            freq_hz,
            band: Band::from_hz(freq_hz),
            mode: "FT8".to_string(),
            snr: None,
            observed_at_ms: 0,
            age_minutes: 0,
            lat: None,
            lon: None,
        }
    }

    #[test]
    fn test_spot_key_uses_hz() {
        let spot = Spot {
            dx_call: "JA1ABC".to_string(),
            spotter_call: "W1AW".to_string(),
            freq_khz: 14074.0,
            comment: "FT8".to_string(),
            timestamp: None,
            last_seen: Utc::now(),
        };
        let key = spot.key();
        assert_eq!(key.dx_call, "JA1ABC");
        assert_eq!(key.freq_hz, 14_074_000);
        assert_eq!(key.spotter_call, "W1AW");
        assert_eq!(spot.band(), Band::M20);
    }

    #[test]
    fn test_same_bucket() {
        let a = report("W1AW", 14_074_000);
        assert!(a.same_bucket(&report("w1aw", 14_074_300)));
        assert!(a.same_bucket(&report("W1AW", 14_073_001)));
        assert!(!a.same_bucket(&report("W1AW", 14_075_000)));
        assert!(!a.same_bucket(&report("K1ABC", 14_074_000)));
    }

    #[test]
    fn test_refresh_age() {
        let mut r = report("W1AW", 14_074_000);
        r.observed_at_ms = 1_000_000;
        r.refresh_age(1_000_000 + 59_999);
        assert_eq!(r.age_minutes, 0);
        r.refresh_age(1_000_000 + 5 * 60_000 + 1);
        assert_eq!(r.age_minutes, 5);
        r.refresh_age(0);
        assert_eq!(r.age_minutes, 0);
    }
}

//! Heard-by-others / heard-by-me report sets
//!
//! Each set keeps its newest arrival at the front, holds at most one report
//! per dedup bucket (same counterparty, frequencies under 1 kHz apart) and
//! only reports observed inside the rolling window.

use spotdeck_common::{Band, Report, ReportDirection, grid_to_lat_lon};

use super::message::TelemetryMessage;

/// Which sets a message landed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classified {
    pub heard_by_others: bool,
    pub heard_by_me: bool,
}

impl Classified {
    pub fn any(&self) -> bool {
        self.heard_by_others || self.heard_by_me
    }
}

#[derive(Debug, Clone)]
pub struct ReportStore {
    heard_by_others: Vec<Report>,
    heard_by_me: Vec<Report>,
    window_ms: i64,
    capacity: usize,
}

impl ReportStore {
    pub fn new(window_minutes: u64, capacity: usize) -> Self {
        Self {
            heard_by_others: Vec::new(),
            heard_by_me: Vec::new(),
            window_ms: window_ms(window_minutes),
            capacity,
        }
    }

    pub fn heard_by_others(&self) -> &[Report] {
        &self.heard_by_others
    }

    pub fn heard_by_me(&self) -> &[Report] {
        &self.heard_by_me
    }

    pub fn is_empty(&self) -> bool {
        self.heard_by_others.is_empty() && self.heard_by_me.is_empty()
    }

    pub fn clear(&mut self) {
        self.heard_by_others.clear();
        self.heard_by_me.clear();
    }

    /// Classify a message against the operator callsign and file it.
    ///
    /// Sender and receiver are checked independently, so a station hearing
    /// itself ends up in both sets.
    pub fn ingest(&mut self, msg: &TelemetryMessage, operator: &str, now_ms: i64) -> Classified {
        let mut classified = Classified::default();

        if msg.sender_call.eq_ignore_ascii_case(operator) {
            let report = build_report(
                ReportDirection::HeardByOthers,
                &msg.receiver_call,
                msg.receiver_locator.as_deref(),
                msg,
                now_ms,
            );
            classified.heard_by_others =
                insert(&mut self.heard_by_others, report, now_ms, self.window_ms, self.capacity);
        }

        if msg.receiver_call.eq_ignore_ascii_case(operator) {
            let report = build_report(
                ReportDirection::HeardByMe,
                &msg.sender_call,
                msg.sender_locator.as_deref(),
                msg,
                now_ms,
            );
            classified.heard_by_me =
                insert(&mut self.heard_by_me, report, now_ms, self.window_ms, self.capacity);
        }

        classified
    }

    /// Refresh every report's age and drop the ones outside the window.
    /// Returns how many were dropped.
    pub fn sweep(&mut self, now_ms: i64) -> usize {
        sweep_set(&mut self.heard_by_others, now_ms, self.window_ms)
            + sweep_set(&mut self.heard_by_me, now_ms, self.window_ms)
    }

    pub fn set_window(&mut self, window_minutes: u64, now_ms: i64) -> usize {
        self.window_ms = window_ms(window_minutes);
        self.sweep(now_ms)
    }
}

fn window_ms(minutes: u64) -> i64 {
    i64::try_from(minutes).unwrap_or(i64::MAX / 60_000).saturating_mul(60_000)
}

fn build_report(
    direction: ReportDirection,
    counterparty: &str,
    counterparty_grid: Option<&str>,
    msg: &TelemetryMessage,
    now_ms: i64,
) -> Report {
    let position = counterparty_grid.and_then(grid_to_lat_lon);
    let observed_at_ms = msg.timestamp.map(|t| t.saturating_mul(1000)).unwrap_or(now_ms);

    let mut report = Report {
        direction,
        counterparty_call: counterparty.to_ascii_uppercase(),
        counterparty_grid: counterparty_grid.map(str::to_string),
        freq_hz: msg.freq_hz,
        band: Band::from_hz(msg.freq_hz),
        mode: msg.mode.clone().unwrap_or_else(|| "Unknown".to_string()),
        snr: msg.snr,
        observed_at_ms,
        age_minutes: 0,
        lat: position.map(|p| p.lat),
        lon: position.map(|p| p.lon),
    };
    report.refresh_age(now_ms);
    report
}

fn is_fresh(report: &Report, now_ms: i64, window_ms: i64) -> bool {
    now_ms - report.observed_at_ms < window_ms
}

/// Put `report` at the front, collapse its bucket, evict by age, then cap.
/// Returns false when the report was not kept (already stale, or an entry
/// in its bucket was observed later).
fn insert(set: &mut Vec<Report>, report: Report, now_ms: i64, window_ms: i64, capacity: usize) -> bool {
    if !is_fresh(&report, now_ms, window_ms) {
        return false;
    }
    if set
        .iter()
        .any(|r| r.same_bucket(&report) && r.observed_at_ms > report.observed_at_ms)
    {
        return false;
    }

    set.retain(|r| !r.same_bucket(&report));
    set.insert(0, report);
    set.retain(|r| is_fresh(r, now_ms, window_ms));

    while set.len() > capacity {
        // least recently observed goes first; on ties, the one furthest back
        let oldest = set
            .iter()
            .enumerate()
            .rev()
            .min_by_key(|(_, r)| r.observed_at_ms)
            .map(|(i, _)| i);
        match oldest {
            Some(i) => {
                set.remove(i);
            }
            None => break,
        }
    }
    true
}

fn sweep_set(set: &mut Vec<Report>, now_ms: i64, window_ms: i64) -> usize {
    let before = set.len();
    set.retain(|r| is_fresh(r, now_ms, window_ms));
    for report in set.iter_mut() {
        report.refresh_age(now_ms);
    }
    before - set.len()
}

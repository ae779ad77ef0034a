//! Callsign geography lookup contract
//!
//! The zone tables themselves live outside this crate. Consumers supply an
//! implementation of [`CallsignGeography`]; [`PrefixGeography`] covers the
//! common case of a configured prefix table.

use serde::{Deserialize, Serialize};

/// Continent and zones a callsign belongs to. Every field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub continent: Option<String>,
    pub cq_zone: Option<u8>,
    pub itu_zone: Option<u8>,
}

/// Pure callsign → geography lookup
pub trait CallsignGeography: Send + Sync {
    fn lookup(&self, callsign: &str) -> GeoInfo;
}

/// Lookup that knows nothing; every callsign resolves to [`GeoInfo::default`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeography;

impl CallsignGeography for NoGeography {
    fn lookup(&self, _callsign: &str) -> GeoInfo {
        GeoInfo::default()
    }
}

/// One row of a prefix table, as read from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixEntry {
    pub prefix: String,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default)]
    pub cq_zone: Option<u8>,
    #[serde(default)]
    pub itu_zone: Option<u8>,
}

const OPERATING_SUFFIXES: &[&str] = &["P", "M", "MM", "AM", "A", "QRP"];

/// Longest-prefix match over a table of callsign prefixes
#[derive(Debug, Clone, Default)]
pub struct PrefixGeography {
    /// Sorted longest prefix first
    entries: Vec<PrefixEntry>,
}

impl PrefixGeography {
    pub fn new(entries: Vec<PrefixEntry>) -> Self {
        let mut entries: Vec<PrefixEntry> = entries
            .into_iter()
            .filter(|e| !e.prefix.trim().is_empty())
            .map(|mut e| {
                e.prefix = e.prefix.trim().to_ascii_uppercase();
                e.continent = e.continent.map(|c| c.trim().to_ascii_uppercase());
                e
            })
            .collect();
        entries.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick the part of a portable callsign that carries the location.
    ///
    /// "EA8/W1AW" operates from EA8, "W1AW/P" from W1AW. Operating
    /// indicators ("/P", "/MM", "/3") never name the location; otherwise the
    /// shorter segment is the location prefix.
    fn home_segment(callsign: &str) -> String {
        let call = callsign.trim().to_ascii_uppercase();
        let segments: Vec<&str> = call.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => String::new(),
            [single] => single.to_string(),
            [first, second, ..] => {
                let indicator = OPERATING_SUFFIXES.contains(second)
                    || second.chars().all(|c| c.is_ascii_digit());
                if indicator || first.len() <= second.len() {
                    first.to_string()
                } else {
                    second.to_string()
                }
            }
        }
    }
}

impl CallsignGeography for PrefixGeography {
    fn lookup(&self, callsign: &str) -> GeoInfo {
        let call = Self::home_segment(callsign);
        if call.is_empty() {
            return GeoInfo::default();
        }
        self.entries
            .iter()
            .find(|e| call.starts_with(&e.prefix))
            .map(|e| GeoInfo {
                continent: e.continent.clone(),
                cq_zone: e.cq_zone,
                itu_zone: e.itu_zone,
            })
            .unwrap_or_default()
    }
}

//! Filter predicate evaluation
//!
//! [`FilterConfig`] enumerates every recognised criterion. An empty list (or
//! `None` for the free-text search) means "no constraint"; all active
//! criteria are ANDed. Evaluation is pure: the same item, config and lookup
//! always give the same answer.

use serde::{Deserialize, Serialize};

use crate::band::Band;
use crate::geo::{CallsignGeography, GeoInfo};
use crate::mode::detect_mode;
use crate::types::{Report, Spot, khz_to_hz};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Originating station's continent must be one of these
    pub continents: Vec<String>,
    /// Originating station's CQ zone must be one of these
    pub cq_zones: Vec<u8>,
    /// Originating station's ITU zone must be one of these
    pub itu_zones: Vec<u8>,

    /// Target station's continent must not be one of these
    pub exclude_continents: Vec<String>,
    pub exclude_cq_zones: Vec<u8>,
    pub exclude_itu_zones: Vec<u8>,

    /// Hide targets whose callsign starts with any of these prefixes
    pub exclude_dx_calls: Vec<String>,
    /// Hide originators whose callsign starts with any of these prefixes
    pub exclude_de_calls: Vec<String>,

    pub watchlist: Vec<String>,
    /// Only show targets matching the watchlist
    pub watchlist_only: bool,

    pub bands: Vec<Band>,
    /// Mode names as produced by [`detect_mode`], e.g. "FT8", "CW", "SSB"
    pub modes: Vec<String>,

    /// Quick search over both callsigns
    pub callsign: Option<String>,
}

impl FilterConfig {
    /// True when no criterion is active
    pub fn is_empty(&self) -> bool {
        self.continents.is_empty()
            && self.cq_zones.is_empty()
            && self.itu_zones.is_empty()
            && self.exclude_continents.is_empty()
            && self.exclude_cq_zones.is_empty()
            && self.exclude_itu_zones.is_empty()
            && self.exclude_dx_calls.is_empty()
            && self.exclude_de_calls.is_empty()
            && !(self.watchlist_only && !self.watchlist.is_empty())
            && self.bands.is_empty()
            && self.modes.is_empty()
            && search_term(&self.callsign).is_none()
    }
}

/// Anything the filter can be evaluated against
pub trait Filterable {
    /// Station being reported (the DX)
    fn target_call(&self) -> &str;
    /// Station doing the reporting (the DE)
    fn origin_call(&self) -> &str;
    fn freq_hz(&self) -> u64;
    /// Free text the mode is detected from
    fn annotation(&self) -> &str;
}

impl Filterable for Spot {
    fn target_call(&self) -> &str {
        &self.dx_call
    }

    fn origin_call(&self) -> &str {
        &self.spotter_call
    }

    fn freq_hz(&self) -> u64 {
        khz_to_hz(self.freq_khz)
    }

    fn annotation(&self) -> &str {
        &self.comment
    }
}

// A report only names one station besides the operator, so it is both the
// origin and the target for filtering purposes.
impl Filterable for Report {
    fn target_call(&self) -> &str {
        &self.counterparty_call
    }

    fn origin_call(&self) -> &str {
        &self.counterparty_call
    }

    fn freq_hz(&self) -> u64 {
        self.freq_hz
    }

    fn annotation(&self) -> &str {
        &self.mode
    }
}

fn search_term(callsign: &Option<String>) -> Option<String> {
    callsign
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_uppercase)
}

fn starts_with_any(call: &str, prefixes: &[String]) -> bool {
    let call = call.to_ascii_uppercase();
    prefixes
        .iter()
        .map(|p| p.trim().to_ascii_uppercase())
        .any(|p| !p.is_empty() && call.starts_with(&p))
}

fn contains_any(call: &str, needles: &[String]) -> bool {
    let call = call.to_ascii_uppercase();
    needles
        .iter()
        .map(|n| n.trim().to_ascii_uppercase())
        .any(|n| !n.is_empty() && call.contains(&n))
}

fn continent_in(info: &GeoInfo, set: &[String]) -> bool {
    info.continent
        .as_deref()
        .is_some_and(|c| set.iter().any(|s| s.trim().eq_ignore_ascii_case(c)))
}

/// Origin-side include checks: an unknown value never satisfies an include list.
fn origin_included(info: &GeoInfo, filter: &FilterConfig) -> bool {
    if !filter.continents.is_empty() && !continent_in(info, &filter.continents) {
        return false;
    }
    if !filter.cq_zones.is_empty() && !info.cq_zone.is_some_and(|z| filter.cq_zones.contains(&z)) {
        return false;
    }
    if !filter.itu_zones.is_empty() && !info.itu_zone.is_some_and(|z| filter.itu_zones.contains(&z)) {
        return false;
    }
    true
}

/// Target-side exclude checks: an unknown value is never excluded.
fn target_excluded(info: &GeoInfo, filter: &FilterConfig) -> bool {
    (!filter.exclude_continents.is_empty() && continent_in(info, &filter.exclude_continents))
        || info.cq_zone.is_some_and(|z| filter.exclude_cq_zones.contains(&z))
        || info.itu_zone.is_some_and(|z| filter.exclude_itu_zones.contains(&z))
}

fn needs_origin_geo(filter: &FilterConfig) -> bool {
    !(filter.continents.is_empty() && filter.cq_zones.is_empty() && filter.itu_zones.is_empty())
}

fn needs_target_geo(filter: &FilterConfig) -> bool {
    !(filter.exclude_continents.is_empty()
        && filter.exclude_cq_zones.is_empty()
        && filter.exclude_itu_zones.is_empty())
}

/// Evaluate one item against the filter.
pub fn matches<T: Filterable + ?Sized>(
    item: &T,
    filter: &FilterConfig,
    geography: &dyn CallsignGeography,
) -> bool {
    let target = item.target_call();
    let origin = item.origin_call();

    if filter.watchlist_only && !filter.watchlist.is_empty() && !contains_any(target, &filter.watchlist) {
        return false;
    }

    if needs_origin_geo(filter) && !origin_included(&geography.lookup(origin), filter) {
        return false;
    }

    if needs_target_geo(filter) && target_excluded(&geography.lookup(target), filter) {
        return false;
    }

    if !filter.exclude_dx_calls.is_empty() && starts_with_any(target, &filter.exclude_dx_calls) {
        return false;
    }

    if !filter.exclude_de_calls.is_empty() && starts_with_any(origin, &filter.exclude_de_calls) {
        return false;
    }

    if !filter.bands.is_empty() && !filter.bands.contains(&Band::from_hz(item.freq_hz())) {
        return false;
    }

    if !filter.modes.is_empty() {
        let detected = detect_mode(item.annotation());
        let allowed = detected.is_some_and(|mode| filter.modes.iter().any(|m| m.trim().eq_ignore_ascii_case(mode)));
        if !allowed {
            return false;
        }
    }

    if let Some(search) = search_term(&filter.callsign) {
        let hit = target.to_ascii_uppercase().contains(&search) || origin.to_ascii_uppercase().contains(&search);
        if !hit {
            return false;
        }
    }

    true
}

/// Clone out every item that passes the filter, preserving order.
pub fn apply_filter<T: Filterable + Clone>(
    items: &[T],
    filter: &FilterConfig,
    geography: &dyn CallsignGeography,
) -> Vec<T> {
    if filter.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| matches(*item, filter, geography))
        .cloned()
        .collect()
}

//! Shared types and pure helpers for spotdeck
//!
//! Everything here is free of I/O: band and mode classification, locator
//! resolution, the geography lookup contract and the filter evaluator used
//! by both spot pipelines.

pub mod band;
pub mod filter;
pub mod geo;
pub mod locator;
pub mod mode;
pub mod types;

pub use band::Band;
pub use filter::{FilterConfig, Filterable, apply_filter, matches};
pub use geo::{CallsignGeography, GeoInfo, NoGeography, PrefixEntry, PrefixGeography};
pub use locator::{LatLon, grid_to_lat_lon};
pub use mode::detect_mode;
pub use types::*;

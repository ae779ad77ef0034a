//! DX cluster polling pipeline
//!
//! Polls an HTTP cluster feed on a fixed interval, merges each snapshot into
//! a retained, de-duplicated spot set and serves filtered views of it.

pub mod aggregator;
pub mod parser;
pub mod source;

pub use aggregator::{ClusterAggregator, MergeStats, PollOutcome, SpotStore};
pub use parser::{ClusterSpot, parse_cluster_json};
pub use source::{ClusterSource, HttpClusterSource};

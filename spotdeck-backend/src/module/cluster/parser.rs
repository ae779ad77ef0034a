//! DX cluster JSON parser
//!
//! The cluster endpoint returns a JSON array of spot objects
//! (`{ call, spotter, freq, comment, time, ... }`). A malformed element is
//! skipped on its own; only a body that is not an array fails the snapshot.

use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::utils::{value_as_f64, value_as_string};

/// One spot as it came off the wire, before it is stamped with `last_seen`
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSpot {
    pub dx_call: String,
    pub spotter_call: String,
    pub freq_khz: f64,
    pub comment: String,
    pub timestamp: Option<String>,
}

fn parse_spot(value: &Value) -> Option<ClusterSpot> {
    let obj = value.as_object()?;

    let dx_call = obj.get("call").and_then(value_as_string)?;
    let spotter_call = obj.get("spotter").and_then(value_as_string)?;
    let freq_khz = obj.get("freq").and_then(value_as_f64).filter(|f| *f > 0.0)?;
    let comment = obj
        .get("comment")
        .and_then(Value::as_str)
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let timestamp = obj.get("time").and_then(value_as_string);

    Some(ClusterSpot {
        dx_call: dx_call.to_ascii_uppercase(),
        spotter_call: spotter_call.to_ascii_uppercase(),
        freq_khz,
        comment,
        timestamp,
    })
}

/// Parse a cluster response body into spots, in the order received.
pub fn parse_cluster_json(json: &str) -> PipelineResult<Vec<ClusterSpot>> {
    let body: Value = serde_json::from_str(json)?;
    let items = body
        .as_array()
        .ok_or_else(|| PipelineError::Decode("cluster response is not a JSON array".to_string()))?;

    let spots: Vec<ClusterSpot> = items.iter().filter_map(parse_spot).collect();

    if spots.len() < items.len() {
        debug!("Skipped {} malformed cluster spots", items.len() - spots.len());
    }

    Ok(spots)
}

//! PSKReporter MQTT payloads and topics
//!
//! Payloads are JSON objects with short keys:
//! `sa` sender call, `sl` sender locator, `ra` receiver call,
//! `rl` receiver locator, `f` frequency (Hz), `md` mode, `rp` SNR (dB),
//! `t` epoch seconds.

use serde_json::Value;

use crate::error::{PipelineError, PipelineResult};
use crate::utils::{value_as_i64, value_as_string};

/// A decoded telemetry message
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryMessage {
    pub sender_call: String,
    pub sender_locator: Option<String>,
    pub receiver_call: String,
    pub receiver_locator: Option<String>,
    pub freq_hz: u64,
    pub mode: Option<String>,
    pub snr: Option<i32>,
    /// Epoch seconds as reported by the broker
    pub timestamp: Option<i64>,
}

pub fn decode_message(payload: &[u8]) -> PipelineResult<TelemetryMessage> {
    let body: Value = serde_json::from_slice(payload)?;
    let obj = body
        .as_object()
        .ok_or_else(|| PipelineError::Decode("telemetry payload is not an object".to_string()))?;

    let field = |key: &str| obj.get(key).and_then(value_as_string);

    let sender_call = field("sa").ok_or_else(|| PipelineError::Decode("missing sender callsign".to_string()))?;
    let receiver_call = field("ra").ok_or_else(|| PipelineError::Decode("missing receiver callsign".to_string()))?;

    Ok(TelemetryMessage {
        sender_call,
        sender_locator: field("sl"),
        receiver_call,
        receiver_locator: field("rl"),
        freq_hz: obj
            .get("f")
            .and_then(value_as_i64)
            .and_then(|f| u64::try_from(f).ok())
            .unwrap_or(0),
        mode: field("md"),
        snr: obj
            .get("rp")
            .and_then(value_as_i64)
            .and_then(|v| i32::try_from(v).ok()),
        timestamp: obj.get("t").and_then(value_as_i64).filter(|t| *t > 0),
    })
}

/// Topic matching messages where `callsign` is the transmitting station
pub fn heard_by_others_topic(prefix: &str, callsign: &str) -> String {
    format!("{}/+/+/{}/#", prefix.trim_end_matches('/'), callsign)
}

/// Topic matching messages where `callsign` is the receiving station
pub fn heard_by_me_topic(prefix: &str, callsign: &str) -> String {
    format!("{}/+/+/+/+/{}/#", prefix.trim_end_matches('/'), callsign)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_message() {
        let payload = br#"{"sa":"K1ABC","sl":"FN42aa","ra":"W1AW","rl":"FN31pr","f":14074000,"md":"FT8","rp":-5,"t":1700000000}"#;
        let msg = decode_message(payload).unwrap();
        assert_eq!(msg.sender_call, "K1ABC");
        assert_eq!(msg.sender_locator.as_deref(), Some("FN42aa"));
        assert_eq!(msg.receiver_call, "W1AW");
        assert_eq!(msg.receiver_locator.as_deref(), Some("FN31pr"));
        assert_eq!(msg.freq_hz, 14_074_000);
        assert_eq!(msg.mode.as_deref(), Some("FT8"));
        assert_eq!(msg.snr, Some(-5));
        assert_eq!(msg.timestamp, Some(1_700_000_000));
    }

    #[test]
    fn test_decode_loose_types() {
        let payload = br#"{"sa":"K1ABC","ra":"W1AW","f":"7074000","rp":"-12","t":"1700000000"}"#;
        let msg = decode_message(payload).unwrap();
        assert_eq!(msg.freq_hz, 7_074_000);
        assert_eq!(msg.snr, Some(-12));
        assert_eq!(msg.timestamp, Some(1_700_000_000));
        assert_eq!(msg.sender_locator, None);
        assert_eq!(msg.mode, None);
    }

    #[test]
    fn test_missing_callsigns_rejected() {
        assert!(matches!(
            decode_message(br#"{"ra":"W1AW","f":14074000}"#),
            Err(PipelineError::Decode(_))
        ));
        assert!(matches!(
            decode_message(br#"{"sa":"K1ABC","ra":"","f":14074000}"#),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(decode_message(b"not json").is_err());
        assert!(decode_message(b"[1,2,3]").is_err());
        assert!(decode_message(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_topics() {
        assert_eq!(heard_by_others_topic("pskr/filter/v2", "K1ABC"), "pskr/filter/v2/+/+/K1ABC/#");
        assert_eq!(heard_by_me_topic("pskr/filter/v2/", "K1ABC"), "pskr/filter/v2/+/+/+/+/K1ABC/#");
    }
}

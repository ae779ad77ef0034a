use chrono::{DateTime, Utc};
use serde_json::Value;

/// Source of "now" for the pipelines. Production code uses [`system_clock`];
/// tests swap in a controllable one.
pub type Clock = fn() -> DateTime<Utc>;

pub fn system_clock() -> DateTime<Utc> {
    Utc::now()
}

/// Feeds send numbers either as JSON numbers or as numeric strings.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        }
        _ => None,
    }
}

/// Non-empty trimmed string, from either a string or a number.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(value_as_f64(&json!(14074)), Some(14074.0));
        assert_eq!(value_as_f64(&json!("14074.5")), Some(14074.5));
        assert_eq!(value_as_f64(&json!("abc")), None);
        assert_eq!(value_as_f64(&Value::Null), None);

        assert_eq!(value_as_i64(&json!(-5)), Some(-5));
        assert_eq!(value_as_i64(&json!("-12")), Some(-12));
        assert_eq!(value_as_i64(&json!(14074000.0)), Some(14_074_000));
        assert_eq!(value_as_i64(&json!(true)), None);
    }

    #[test]
    fn test_strings() {
        assert_eq!(value_as_string(&json!(" W1AW ")), Some("W1AW".to_string()));
        assert_eq!(value_as_string(&json!("")), None);
        assert_eq!(value_as_string(&json!(1700000000)), Some("1700000000".to_string()));
        assert_eq!(value_as_string(&json!(null)), None);
    }
}

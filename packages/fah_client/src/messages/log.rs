use serde::Serialize;
use serde_json::Value;

use crate::convert;
use crate::error::MaterializeError;
use crate::registry::TypedMessage;

/// Full log text; everything previously received is stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogRestart {
    pub text: String,
}

/// Log text appended since the last update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogUpdate {
    pub text: String,
}

fn log_text(payload: &Value, field: &str) -> Result<String, MaterializeError> {
    payload
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MaterializeError {
            field: field.to_string(),
            raw: payload.to_string(),
            source: convert::unexpected("string", payload),
        })
}

impl TypedMessage for LogRestart {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        log_text(payload, "log-restart").map(|text| Self { text })
    }
}

impl TypedMessage for LogUpdate {
    fn from_payload(payload: &Value) -> Result<Self, MaterializeError> {
        log_text(payload, "log-update").map(|text| Self { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_payload_is_a_string() {
        let update = LogUpdate::from_payload(&json!("12:00:01:WU01:FS01:0x22:Completed 1%\n")).unwrap();
        assert!(update.text.ends_with("Completed 1%\n"));

        let err = LogRestart::from_payload(&json!(["not", "text"])).unwrap_err();
        assert_eq!(err.field, "log-restart");
    }
}

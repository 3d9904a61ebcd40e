use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::kind::MessageKind;

/// One decoded block: its kind and the untyped payload tree.
///
/// Immutable once built; the cache shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawMessage {
    key: MessageKind,
    payload: Value,
    received_at: DateTime<Utc>,
}

impl RawMessage {
    pub fn new(key: MessageKind, payload: Value) -> Self {
        Self::received(key, payload, Utc::now())
    }

    pub fn received(key: MessageKind, payload: Value, received_at: DateTime<Utc>) -> Self {
        Self {
            key,
            payload,
            received_at,
        }
    }

    pub fn key(&self) -> MessageKind {
        self.key
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

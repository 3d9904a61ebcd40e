//! Error types for extraction, conversion and binding.
//!
//! Nothing here is fatal: every error is scoped to one block, one field or one
//! request, and the caller decides whether to propagate it.

use crate::kind::MessageKind;

/// A single wire value could not be converted to its semantic type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unrecognized timestamp: {value:?}")]
    InvalidTimestamp { value: String },

    #[error("epoch seconds out of range: {value}")]
    EpochOutOfRange { value: i64 },

    #[error("invalid network address {value:?}: {source}")]
    InvalidAddress {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("unknown status token: {value:?}")]
    UnknownStatus { value: String },

    #[error("expected {expected}, found {value}")]
    UnexpectedValue {
        expected: &'static str,
        value: String,
    },
}

impl FormatError {
    pub fn error_code(&self) -> &str {
        match self {
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
            Self::EpochOutOfRange { .. } => "epoch_out_of_range",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::UnknownStatus { .. } => "unknown_status",
            Self::UnexpectedValue { .. } => "unexpected_value",
        }
    }
}

/// A block was delimited correctly but could not become a `RawMessage`.
///
/// Extraction continues with the next block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("unknown message kind {name:?} in block header")]
    UnknownKind { name: String },

    #[error("failed to decode {kind} payload: {message}")]
    Decode {
        kind: MessageKind,
        message: String,
        payload: String,
    },
}

impl ExtractError {
    pub fn error_code(&self) -> &str {
        match self {
            Self::UnknownKind { .. } => "unknown_kind",
            Self::Decode { .. } => "decode_failed",
        }
    }
}

/// A field of a typed message could not be built from the cached payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}` has unusable value {raw}: {source}")]
pub struct MaterializeError {
    /// Dotted path of the field, e.g. `slots[0].status`.
    pub field: String,
    /// The raw wire value, rendered as JSON.
    pub raw: String,
    #[source]
    pub source: FormatError,
}

/// Failure to satisfy a typed `get` request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("no message kind is registered for type {type_name}")]
    Unresolved { type_name: &'static str },

    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

impl BindError {
    pub fn error_code(&self) -> &str {
        match self {
            Self::Unresolved { .. } => "unresolved_type",
            Self::Materialize(_) => "materialize_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(
            FormatError::UnknownStatus {
                value: "BOGUS".into()
            }
            .error_code(),
            "unknown_status"
        );
        assert_eq!(
            ExtractError::UnknownKind { name: "x".into() }.error_code(),
            "unknown_kind"
        );
        assert_eq!(
            BindError::Unresolved { type_name: "T" }.error_code(),
            "unresolved_type"
        );
    }

    #[test]
    fn materialize_error_names_field_and_value() {
        let err = MaterializeError {
            field: "slots[1].status".into(),
            raw: r#""BOGUS""#.into(),
            source: FormatError::UnknownStatus {
                value: "BOGUS".into(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("slots[1].status"));
        assert!(text.contains("BOGUS"));
    }
}

#![forbid(unsafe_code)]

//! Error type shared by every store operation.

use serde_json::Value;
use thiserror::Error;

use crate::record::RecordId;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by record validation, mutations, and configuration.
///
/// Every variant except [`StoreError::InvalidConfig`] points at malformed
/// input from the caller. Missing ids are not errors: updating or removing an
/// id that is not loaded is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record has no `id` field")]
    MissingId,

    #[error("record id must be an integer, found {found}")]
    MalformedId { found: &'static str },

    #[error("duplicate record id {id}")]
    DuplicateId { id: RecordId },

    #[error("patch for record {target} carries a different id {found}")]
    IdMismatch { target: RecordId, found: RecordId },

    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl StoreError {
    /// Build a [`StoreError::MalformedId`] describing `value`.
    #[must_use]
    pub fn malformed(value: &Value) -> Self {
        Self::MalformedId {
            found: json_kind(value),
        }
    }

    /// Build a [`StoreError::NotAnObject`] describing `value`.
    #[must_use]
    pub fn not_an_object(value: &Value) -> Self {
        Self::NotAnObject {
            found: json_kind(value),
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the error was caused by malformed input handed to a mutation.
    #[must_use]
    pub const fn is_caller_bug(&self) -> bool {
        !matches!(self, Self::InvalidConfig { .. })
    }
}

/// Short name of a JSON value's type, for error messages.
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

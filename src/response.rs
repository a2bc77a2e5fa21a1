//! Result envelope returned to front ends
//!
//! Every operation answers with `{success, data?, message?}`. Errors never
//! escape as anything other than `success = false` plus a readable message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Wrap an operation result. Unit results carry no `data`.
    pub fn from_result<T: Serialize>(result: Result<T>) -> Self {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(Value::Null) => Self::ok(None),
                Ok(data) => Self::ok(Some(data)),
                Err(e) => Self::error(format!("failed to encode result: {e}")),
            },
            Err(e) => {
                warn!(error = %e, "Operation failed");
                Self::error(e.to_string())
            }
        }
    }

    /// Wrap a value-returning operation that cannot fail
    pub fn from_value<T: Serialize>(value: T) -> Self {
        Self::from_result(Ok(value))
    }
}

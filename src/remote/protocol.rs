//! Newline-delimited JSON messages exchanged with the manager.
//!
//! Every request is answered by exactly one response on the same connection.

use crate::atomic::{Kind, TypedAtomic};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A call forwarded to the hosted cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// `get()`
    Get,
    /// `set(value)`
    Set {
        /// New value.
        value: Value,
    },
    /// `get_and_set(value)`
    GetAndSet {
        /// New value.
        value: Value,
    },
    /// `compare_and_set(expect, update)`
    CompareAndSet {
        /// Value the cell must hold for the update to happen.
        expect: Value,
        /// Value stored on success.
        update: Value,
    },
    /// Display accessor: the hosted value and its kind.
    Describe,
}

/// The manager's answer to one [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    /// Result of `get`, `set` and `get_and_set`.
    Value {
        /// Returned value.
        value: Value,
    },
    /// Result of `compare_and_set`.
    Flag {
        /// Whether the update happened.
        flag: bool,
    },
    /// Result of `describe`.
    Text {
        /// Rendered cell.
        text: String,
    },
    /// The call was rejected; the cell is unchanged.
    Error {
        /// Why.
        error: WireError,
    },
}

/// Failures that travel over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum WireError {
    /// The offered value does not match the hosted cell's kind.
    TypeMismatch {
        /// Declared kind of the hosted cell.
        expected: Kind,
        /// Kind of the rejected value.
        found: Kind,
    },
    /// The request could not be parsed or carried nothing usable.
    Malformed {
        /// Parser message.
        message: String,
    },
}

impl Response {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Error {
            error: WireError::Malformed {
                message: message.into(),
            },
        }
    }
}

impl WireError {
    /// Converts a rejected call back into the caller-side error.
    pub(crate) fn into_error(self) -> Error {
        match self {
            Self::TypeMismatch { expected, found } => Error::TypeMismatch {
                expected: expected.name(),
                found: found.name(),
            },
            Self::Malformed { message } => Error::Protocol(message),
        }
    }
}

/// Executes `request` against `cell`.
pub(crate) fn apply(cell: &TypedAtomic, request: Request) -> Response {
    let result = match request {
        Request::Get => Ok(Response::Value { value: cell.get() }),
        Request::Set { value } => cell.set(value).map(|value| Response::Value { value }),
        Request::GetAndSet { value } => {
            cell.get_and_set(value).map(|value| Response::Value { value })
        }
        Request::CompareAndSet { expect, update } => cell
            .compare_and_set(&expect, update)
            .map(|flag| Response::Flag { flag }),
        Request::Describe => Ok(Response::Text {
            text: cell.describe(),
        }),
    };

    result.unwrap_or_else(|err| match err {
        Error::TypeMismatch { expected, found } => Response::Error {
            error: WireError::TypeMismatch {
                expected: expected.parse().unwrap_or_default(),
                found: found.parse().unwrap_or_default(),
            },
        },
        other => Response::malformed(other.to_string()),
    })
}

//! Runtime-typed atomic cell over JSON values.

use super::reference::AtomicReference;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The declared element type of a [`TypedAtomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Accepts every value.
    #[default]
    Any,
    /// `null`.
    Null,
    /// `true` / `false`.
    Bool,
    /// Numbers without a fractional part that fit in `i64` or `u64`.
    Integer,
    /// Floating point numbers.
    Float,
    /// Strings.
    String,
    /// Arrays.
    Array,
    /// Objects.
    Object,
}

impl Kind {
    /// The concrete kind of `value`. Never returns [`Kind::Any`].
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_f64() => Self::Float,
            Value::Number(_) => Self::Integer,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Returns `true` if a cell of this kind may hold `value`.
    pub fn accepts(self, value: &Value) -> bool {
        self == Self::Any || self == Self::of(value)
    }

    /// The value a cell of this kind starts with when none is given.
    pub fn default_value(self) -> Value {
        match self {
            Self::Any | Self::Null => Value::Null,
            Self::Bool => Value::Bool(false),
            Self::Integer => Value::from(0_i64),
            Self::Float => Value::from(0.0_f64),
            Self::String => Value::String(String::new()),
            Self::Array => Value::Array(Vec::new()),
            Self::Object => Value::Object(serde_json::Map::new()),
        }
    }

    /// Lower-case name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Rejects `value` unless this kind accepts it.
    pub fn check(self, value: &Value) -> Result<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: self.name(),
                found: Self::of(value).name(),
            })
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names no [`Kind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind `{0}`")]
pub struct ParseKindError(String);

impl FromStr for Kind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "any" => Ok(Self::Any),
            "null" => Ok(Self::Null),
            "bool" | "boolean" => Ok(Self::Bool),
            "integer" | "int" | "long" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "string" => Ok(Self::String),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

/// An [`AtomicReference`] over JSON values with a declared [`Kind`].
///
/// Every write path checks the incoming value first; a value of the wrong
/// kind is rejected with [`Error::TypeMismatch`] and the cell is unchanged.
/// This is the cell hosted by the manager process, where values arrive
/// without a static type.
///
/// # Example
///
/// ```rust
/// use atomos::{Kind, TypedAtomic};
/// use serde_json::json;
///
/// let flag = TypedAtomic::with_default(Kind::Bool);
/// assert_eq!(flag.get(), json!(false));
/// assert!(flag.set(json!(1)).unwrap_err().is_type_mismatch());
/// assert_eq!(flag.get(), json!(false));
/// ```
#[derive(Debug)]
pub struct TypedAtomic {
    kind: Kind,
    cell: AtomicReference<Value>,
}

impl TypedAtomic {
    /// Creates a cell of `kind` holding `initial`.
    pub fn new(kind: Kind, initial: Value) -> Result<Self> {
        kind.check(&initial)?;
        Ok(Self {
            kind,
            cell: AtomicReference::new(initial),
        })
    }

    /// Creates a cell of `kind` holding that kind's default value.
    pub fn with_default(kind: Kind) -> Self {
        Self {
            kind,
            cell: AtomicReference::new(kind.default_value()),
        }
    }

    /// Creates an untyped cell.
    pub fn any(initial: Value) -> Self {
        Self {
            kind: Kind::Any,
            cell: AtomicReference::new(initial),
        }
    }

    /// Declared kind.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> Value {
        self.cell.get()
    }

    /// Atomically sets the value, returning `value`.
    pub fn set(&self, value: Value) -> Result<Value> {
        self.kind.check(&value)?;
        Ok(self.cell.set(value))
    }

    /// Atomically replaces the value, returning the old one.
    pub fn get_and_set(&self, value: Value) -> Result<Value> {
        self.kind.check(&value)?;
        Ok(self.cell.get_and_set(value))
    }

    /// Atomically sets `update` if the current value equals `expect`.
    ///
    /// An `update` of the wrong kind is an error even if the comparison would fail.
    pub fn compare_and_set(&self, expect: &Value, update: Value) -> Result<bool> {
        self.kind.check(&update)?;
        Ok(self.cell.compare_and_set(expect, update))
    }

    /// Renders the cell for display in another process, e.g. `integer(42)`.
    pub fn describe(&self) -> String {
        self.cell.with(|value| format!("{}({value})", self.kind))
    }
}

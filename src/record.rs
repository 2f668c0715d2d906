//! Record abstraction: the unit of validation.
//!
//! Records are externally owned and never mutated by the engine. A record
//! only needs a stable string identity (for diagnostics) and the ability to
//! expose a top-level attribute by name; dotted-path navigation is derived
//! from that in terms of the generic [`Value`] tree.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// A dynamically-typed value obtained while navigating a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(l) => write!(f, "{l:?}"),
            Value::Map(m) => write!(f, "{m:?}"),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            JsonValue::String(s) => Value::Str(s),
            JsonValue::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            JsonValue::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Errors raised while navigating a record by dotted path.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordError {
    #[error("attribute '{path}' not found on {record_class}(id={record_id})")]
    MissingAttribute {
        record_id: String,
        record_class: &'static str,
        path: String,
    },
    #[error(
        "attribute '{path}' on {record_class}(id={record_id}) is not navigable (not a map)"
    )]
    NotNavigable {
        record_id: String,
        record_class: &'static str,
        path: String,
    },
}

/// The unit of validation. Implementors are externally owned; the engine
/// only ever reads through this trait, never mutates.
#[cfg_attr(test, mockall::automock)]
pub trait Record: Send + Sync {
    /// Stable identity used in diagnostics.
    fn get_id(&self) -> String;

    /// Class name used in the `DataSet: <class>(id=..)` diagnostic line.
    fn class_name(&self) -> &'static str {
        "Record"
    }

    /// Looks up a single top-level attribute. `None` means absent.
    fn get_attr(&self, name: &str) -> Option<Value>;

    /// Walks a dotted path (`"a.b.c"`) starting from a top-level attribute.
    fn get_path(&self, path: &str) -> Result<Value, RecordError> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or(path);
        let mut current = self.get_attr(first).ok_or_else(|| RecordError::MissingAttribute {
            record_id: self.get_id(),
            record_class: self.class_name(),
            path: first.to_string(),
        })?;
        let mut consumed = first.to_string();

        for segment in segments {
            consumed.push('.');
            consumed.push_str(segment);
            current = match &current {
                Value::Map(m) => m.get(segment).cloned().ok_or_else(|| RecordError::MissingAttribute {
                    record_id: self.get_id(),
                    record_class: self.class_name(),
                    path: consumed.clone(),
                })?,
                _ => {
                    return Err(RecordError::NotNavigable {
                        record_id: self.get_id(),
                        record_class: self.class_name(),
                        path: consumed,
                    })
                }
            };
        }

        Ok(current)
    }
}

/// Reference `Record` implementation backed by a `serde_json::Value` object,
/// the way a migrated row would typically arrive off the wire.
#[derive(Debug, Clone)]
pub struct JsonRecord {
    id: String,
    data: Value,
}

impl JsonRecord {
    pub fn new(id: impl Into<String>, data: JsonValue) -> Self {
        Self {
            id: id.into(),
            data: Value::from(data),
        }
    }
}

impl Record for JsonRecord {
    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn class_name(&self) -> &'static str {
        "JsonRecord"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.data.as_map().and_then(|m| m.get(name)).cloned()
    }
}

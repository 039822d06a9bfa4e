//! Dynamic value model for mapped record graphs
//!
//! Mapped data travels through the engine as `Value` trees. Records are
//! reference-counted cells so that a graph can contain shared references and
//! cycles, and so that two values can be compared by identity - the property
//! the reference-preservation scope is built on. Converters to and from
//! `serde_json::Value` are provided for construction and inspection; JSON has
//! no notion of identity, so round-tripping through it always produces a
//! fresh, unshared graph.
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A dynamically typed mapped value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Record(RecordRef),
}

/// Shared handle to a record cell; cloning shares identity
pub type RecordRef = Rc<RefCell<Record>>;

/// Identity of a record cell within one mapping call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(usize);

/// A record instance: a runtime type tag plus named fields
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record of the given runtime type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// The runtime type tag, used for derived-type dispatch
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Read a field, if present
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a field, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Iterate fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Wrap this record into a shared value
    pub fn into_value(self) -> Value {
        Value::Record(Rc::new(RefCell::new(self)))
    }
}

impl Value {
    /// Build a record value from a type tag and field pairs
    pub fn record<I, K>(type_name: impl Into<String>, fields: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut record = Record::new(type_name);
        for (name, value) in fields {
            record.set(name, value);
        }
        record.into_value()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The runtime type tag of a record value
    pub fn type_tag(&self) -> Option<String> {
        match self {
            Value::Record(cell) => Some(cell.borrow().type_name().to_string()),
            _ => None,
        }
    }

    /// Identity of a record value; scalars and lists have none
    pub fn identity(&self) -> Option<RecordId> {
        match self {
            Value::Record(cell) => Some(RecordId(Rc::as_ptr(cell) as usize)),
            _ => None,
        }
    }

    /// Whether two values are the same record cell
    pub fn same_instance(a: &Value, b: &Value) -> bool {
        match (a.identity(), b.identity()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    /// Read a record member; `None` for absent fields or non-record values
    pub fn get_member(&self, name: &str) -> Option<Value> {
        match self {
            Value::Record(cell) => cell.borrow().get(name).cloned(),
            _ => None,
        }
    }

    /// Write a record member in place
    pub fn set_member(&self, name: &str, value: Value) -> Result<()> {
        match self {
            Value::Record(cell) => {
                cell.borrow_mut().set(name, value);
                Ok(())
            }
            other => Err(Error::execution(format!(
                "cannot assign member '{}' on non-record value {:?}",
                name, other
            ))),
        }
    }

    /// Convert to a `serde_json::Value`, losing record identity and type tags
    ///
    /// Cyclic graphs cannot be represented in JSON; callers convert acyclic
    /// values only.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Record(cell) => {
                let record = cell.borrow();
                let mut map = serde_json::Map::new();
                for (name, value) in record.fields() {
                    map.insert(name.clone(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }

    /// Build a value from JSON, tagging every object with `type_name`
    ///
    /// Intended for flat fixtures; nested objects receive the same tag, so
    /// heterogeneous graphs should be assembled with [`Value::record`]
    /// instead.
    pub fn from_json(type_name: &str, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(
                items
                    .iter()
                    .map(|item| Value::from_json(type_name, item))
                    .collect(),
            ),
            serde_json::Value::Object(map) => {
                let mut record = Record::new(type_name);
                for (name, value) in map {
                    record.set(name.clone(), Value::from_json(type_name, value));
                }
                record.into_value()
            }
        }
    }
}

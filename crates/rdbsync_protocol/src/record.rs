//! ResultsDB record types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// The `data` bag of a result: free-form key/value annotations.
pub type ResultData = BTreeMap<String, DataValue>;

/// The moment a store accepted a result.
///
/// Stores disagree on the representation: ResultsDB returns ISO-8601
/// strings, other deployments use numeric timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmitTime {
    /// Numeric timestamp.
    Integer(i64),
    /// Textual timestamp (usually ISO-8601).
    Text(String),
}

impl SubmitTime {
    /// Returns true if both timestamps render to the same value.
    ///
    /// A numeric submit time that went through a store's `data` bag comes
    /// back as a string, so `Integer(5)` matches `Text("5")`.
    pub fn same_instant(&self, other: &SubmitTime) -> bool {
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for SubmitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitTime::Integer(value) => write!(f, "{value}"),
            SubmitTime::Text(value) => f.write_str(value),
        }
    }
}

impl Ord for SubmitTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SubmitTime::Integer(a), SubmitTime::Integer(b)) => a.cmp(b),
            (SubmitTime::Text(a), SubmitTime::Text(b)) => a.cmp(b),
            (SubmitTime::Integer(_), SubmitTime::Text(_)) => Ordering::Less,
            (SubmitTime::Text(_), SubmitTime::Integer(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for SubmitTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&str> for SubmitTime {
    fn from(value: &str) -> Self {
        SubmitTime::Text(value.to_string())
    }
}

impl From<String> for SubmitTime {
    fn from(value: String) -> Self {
        SubmitTime::Text(value)
    }
}

impl From<i64> for SubmitTime {
    fn from(value: i64) -> Self {
        SubmitTime::Integer(value)
    }
}

/// A single value in a result's `data` bag.
///
/// Variant order matters for untagged deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// String value.
    Text(String),
    /// List of values; ResultsDB wraps every filterable value in one.
    List(Vec<DataValue>),
    /// Anything else, kept verbatim.
    Other(Value),
}

impl DataValue {
    /// Unwraps a single-element list to its only element.
    ///
    /// Any other value, including longer lists, is returned unchanged.
    pub fn unwrap_single(&self) -> &DataValue {
        match self {
            DataValue::List(items) if items.len() == 1 => items[0].unwrap_single(),
            other => other,
        }
    }

    /// Returns the integer value, parsing decimal text if needed.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            DataValue::Integer(value) => Some(*value),
            DataValue::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the boolean value, accepting the textual forms stores emit.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(value) => Some(*value),
            DataValue::Text(value) => match value.as_str() {
                "True" | "true" | "1" => Some(true),
                "False" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Renders the value the way a query parameter would carry it.
    ///
    /// Booleans use the capitalised form ResultsDB stores them as.
    pub fn to_query_value(&self) -> String {
        match self {
            DataValue::Bool(true) => "True".to_string(),
            DataValue::Bool(false) => "False".to_string(),
            DataValue::Integer(value) => value.to_string(),
            DataValue::Text(value) => value.clone(),
            DataValue::List(items) => items
                .iter()
                .map(DataValue::to_query_value)
                .collect::<Vec<_>>()
                .join(","),
            DataValue::Other(value) => value.to_string(),
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Integer(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

impl From<SubmitTime> for DataValue {
    fn from(value: SubmitTime) -> Self {
        match value {
            SubmitTime::Integer(value) => DataValue::Integer(value),
            SubmitTime::Text(value) => DataValue::Text(value),
        }
    }
}

/// A result as stored in (and returned by) a ResultsDB instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Identifier, unique within the origin store.
    pub id: i64,
    /// When the origin store accepted the result.
    pub submit_time: SubmitTime,
    /// Key/value annotations.
    #[serde(default)]
    pub data: ResultData,
    /// Every other field (`outcome`, `testcase`, `note`, ...), copied as-is.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl ResultRecord {
    /// Creates a record with an empty data bag.
    pub fn new(id: i64, submit_time: impl Into<SubmitTime>) -> Self {
        Self {
            id,
            submit_time: submit_time.into(),
            data: ResultData::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a `data` entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Adds a top-level field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

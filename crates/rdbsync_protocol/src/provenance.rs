//! Provenance annotations written onto every copied result.
//!
//! A copied result carries its source identity inside its own `data` bag:
//!
//! - `centos_ci_resultsdb = true` marks it as copied
//! - `centos_ci_resultsdb_id` is the source `id`
//! - `centos_ci_resultsdb_submit_time` is the source `submit_time`
//!
//! The destination assigns its own `id` and `submit_time`, so these three
//! keys are the only link back to the source and double as the resume
//! cursor.

use crate::record::{DataValue, ResultData, ResultRecord, SubmitTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Marks a result as copied from the source store.
pub const ORIGIN_FLAG_KEY: &str = "centos_ci_resultsdb";
/// Source `id` of a copied result.
pub const ORIGIN_ID_KEY: &str = "centos_ci_resultsdb_id";
/// Source `submit_time` of a copied result.
pub const ORIGIN_SUBMIT_TIME_KEY: &str = "centos_ci_resultsdb_submit_time";

/// Value the flag filter is queried with; ResultsDB stores booleans as text.
pub const ORIGIN_FLAG_QUERY_VALUE: &str = "True";

/// Reserved keys, in the order they are written.
pub const PROVENANCE_KEYS: [&str; 3] = [ORIGIN_FLAG_KEY, ORIGIN_ID_KEY, ORIGIN_SUBMIT_TIME_KEY];

/// Errors reading provenance annotations back out of a result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProvenanceError {
    /// A reserved key is absent.
    #[error("missing provenance key {key}")]
    Missing {
        /// The absent key.
        key: &'static str,
    },

    /// A reserved key holds a value of the wrong shape.
    #[error("invalid provenance value for {key}: {value}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// The value as found.
        value: String,
    },
}

/// Identity of the source result a copy was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Source `id`.
    pub source_id: i64,
    /// Source `submit_time`.
    pub source_submit_time: SubmitTime,
}

impl Provenance {
    /// Reads the annotations without modifying `data`.
    ///
    /// Values may come back list-wrapped or stringified; both are accepted.
    pub fn extract(data: &ResultData) -> Result<Self, ProvenanceError> {
        let flag = lookup(data, ORIGIN_FLAG_KEY)?;
        if flag.as_bool() != Some(true) {
            return Err(ProvenanceError::Invalid {
                key: ORIGIN_FLAG_KEY,
                value: flag.to_query_value(),
            });
        }

        let id = lookup(data, ORIGIN_ID_KEY)?;
        let source_id = id.as_integer().ok_or_else(|| ProvenanceError::Invalid {
            key: ORIGIN_ID_KEY,
            value: id.to_query_value(),
        })?;

        let source_submit_time = submit_time_of(lookup(data, ORIGIN_SUBMIT_TIME_KEY)?)?;

        Ok(Self {
            source_id,
            source_submit_time,
        })
    }

    /// Reads the annotations and returns `data` with all three removed.
    pub fn strip(mut data: ResultData) -> Result<(Self, ResultData), ProvenanceError> {
        let provenance = Self::extract(&data)?;
        for key in PROVENANCE_KEYS {
            data.remove(key);
        }
        Ok((provenance, data))
    }

    /// Reads only the source submit time, the piece cursor discovery needs.
    pub fn submit_time(data: &ResultData) -> Result<SubmitTime, ProvenanceError> {
        submit_time_of(lookup(data, ORIGIN_SUBMIT_TIME_KEY)?)
    }
}

fn lookup<'a>(data: &'a ResultData, key: &'static str) -> Result<&'a DataValue, ProvenanceError> {
    data.get(key)
        .map(DataValue::unwrap_single)
        .ok_or(ProvenanceError::Missing { key })
}

fn submit_time_of(value: &DataValue) -> Result<SubmitTime, ProvenanceError> {
    match value {
        DataValue::Integer(value) => Ok(SubmitTime::Integer(*value)),
        DataValue::Text(value) => Ok(SubmitTime::Text(value.clone())),
        other => Err(ProvenanceError::Invalid {
            key: ORIGIN_SUBMIT_TIME_KEY,
            value: other.to_query_value(),
        }),
    }
}

/// The body POSTed to create a copy of a source result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResult {
    /// Source `data` plus the three provenance annotations.
    pub data: ResultData,
    /// Remaining source fields, unchanged.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    /// Write credential; the field is left out entirely when absent.
    #[serde(
        rename = "_auth_token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_token: Option<String>,
}

impl NewResult {
    /// Applies the field remapping to a source result.
    ///
    /// `id` and `submit_time` are moved into `data` as provenance
    /// annotations; the destination assigns fresh values for both.
    pub fn from_source(record: ResultRecord, auth_token: Option<String>) -> Self {
        let ResultRecord {
            id,
            submit_time,
            mut data,
            fields,
        } = record;

        data.insert(ORIGIN_FLAG_KEY.to_string(), DataValue::Bool(true));
        data.insert(ORIGIN_ID_KEY.to_string(), DataValue::Integer(id));
        data.insert(ORIGIN_SUBMIT_TIME_KEY.to_string(), submit_time.into());

        Self {
            data,
            fields,
            auth_token,
        }
    }
}

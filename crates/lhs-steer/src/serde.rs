use std::collections::BTreeMap;

use ::serde::{Deserialize, Serialize};
use lhs_core::{ErrorInfo, LhsError};
use serde_json::{Map, Value};

fn serde_error(code: &str, err: impl ToString) -> LhsError {
    LhsError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, val)| (key, canonicalize(val)))
                .collect();
            Value::Object(ordered.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes `value` as JSON with object keys in sorted order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, LhsError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json-encode", err))?;
    serde_json::to_vec(&canonicalize(value)).map_err(|err| serde_error("json-write", err))
}

/// Reads a value back from JSON bytes.
pub fn from_json_slice<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, LhsError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json-read", err))
}

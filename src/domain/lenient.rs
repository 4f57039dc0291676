//! Field deserializers for documents read back from disk.
//!
//! A malformed field degrades to its default instead of failing the whole
//! document. Pair with `#[serde(default)]` so missing fields behave the same.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize `T`, or fall back to `T::default()` if the value has the
/// wrong shape
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(T::deserialize(raw).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Doc {
        #[serde(default, deserialize_with = "or_default")]
        count: Option<i64>,
        #[serde(default, deserialize_with = "or_default")]
        name: String,
    }

    #[test]
    fn test_wrong_shapes_fall_back() {
        let doc: Doc = serde_json::from_str(r#"{"count": "x", "name": 5}"#).unwrap();
        assert_eq!(doc.count, None);
        assert_eq!(doc.name, "");
    }

    #[test]
    fn test_valid_and_missing_fields() {
        let doc: Doc = serde_json::from_str(r#"{"count": 3}"#).unwrap();
        assert_eq!(doc.count, Some(3));
        assert_eq!(doc.name, "");
    }
}

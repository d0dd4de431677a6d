// Canonical JSON: serde_json::Value keeps object keys in a BTreeMap, so
// routing through Value yields key-sorted output regardless of field order.
use crate::error::Result;
use serde::Serialize;

/// Serialize with object keys sorted lexicographically at every depth
pub fn to_canonical_json<T: Serialize>(data: &T) -> Result<String> {
    let value = serde_json::to_value(data)?;
    Ok(serde_json::to_string(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Unordered {
        zeta: u32,
        alpha: String,
        mid: Vec<u8>,
    }

    #[test]
    fn test_keys_are_sorted() {
        let data = Unordered {
            zeta: 1,
            alpha: "a".to_string(),
            mid: vec![1, 2],
        };
        let json = to_canonical_json(&data).unwrap();
        assert_eq!(json, r#"{"alpha":"a","mid":[1,2],"zeta":1}"#);
    }

    #[test]
    fn test_nested_keys_are_sorted() {
        let value = serde_json::json!({"b": {"y": 1, "x": 2}, "a": null});
        let json = to_canonical_json(&value).unwrap();
        assert_eq!(json, r#"{"a":null,"b":{"x":2,"y":1}}"#);
    }
}

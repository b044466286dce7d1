//! Conversion between plain JSON and Firestore's typed REST value encoding.

use serde_json::{json, Map, Number, Value};

use crate::store::{Document, StoreError};

/// Encodes top-level document fields as a Firestore `fields` map.
pub fn encode_fields(document: &Document) -> Value {
    Value::Object(
        document
            .iter()
            .map(|(k, v)| (k.clone(), encode(v)))
            .collect(),
    )
}

pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Decodes a Firestore `fields` map. An absent map decodes to an empty document.
pub fn decode_fields(fields: Option<&Value>) -> Result<Document, StoreError> {
    let Some(fields) = fields else {
        return Ok(Map::new());
    };
    let fields = fields
        .as_object()
        .ok_or_else(|| StoreError::Malformed("`fields` is not an object".to_string()))?;
    fields
        .iter()
        .map(|(k, v)| decode(v).map(|v| (k.clone(), v)))
        .collect()
}

pub fn decode(value: &Value) -> Result<Value, StoreError> {
    let typed = value
        .as_object()
        .and_then(|m| m.iter().next())
        .map(|(kind, inner)| (kind.as_str(), inner))
        .ok_or_else(|| StoreError::Malformed(format!("untyped value: {value}")))?;

    match typed {
        ("nullValue", _) => Ok(Value::Null),
        ("booleanValue", b) => Ok(Value::Bool(b.as_bool().unwrap_or_default())),
        ("integerValue", i) => {
            let parsed = match i {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(|n| Value::Number(n.into()))
                .ok_or_else(|| StoreError::Malformed(format!("bad integerValue: {i}")))
        }
        // NaN and the infinities arrive as strings and have no JSON form.
        ("doubleValue", d) => Ok(d
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        ("stringValue" | "timestampValue" | "referenceValue" | "bytesValue", s) => Ok(s.clone()),
        ("geoPointValue", p) => Ok(p.clone()),
        ("arrayValue", a) => a
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(decode).collect::<Result<Vec<_>, _>>())
            .transpose()
            .map(|items| Value::Array(items.unwrap_or_default())),
        ("mapValue", m) => decode_fields(m.get("fields")).map(Value::Object),
        (kind, _) => Err(StoreError::Malformed(format!("unknown value kind '{kind}'"))),
    }
}

/// Field paths for a merge-write: one per leaf, descending into non-empty maps.
/// Segments that are not plain identifiers are quoted with backticks.
pub fn leaf_field_paths(document: &Document) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(document, "", &mut paths);
    paths
}

fn collect_paths(map: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            quote_segment(key)
        } else {
            format!("{prefix}.{}", quote_segment(key))
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => collect_paths(inner, &path, out),
            _ => out.push(path),
        }
    }
}

pub fn quote_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    let simple = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub mod user;

/// Accepts a JSON string or number as a `String`; `null` becomes empty.
/// Stored documents and model output are both loose about this.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

//! Output-shape constraints (`responseSchema`) in the OpenAPI subset Gemini accepts.

use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

impl SchemaType {
    fn as_str(self) -> &'static str {
        match self {
            SchemaType::Object => "OBJECT",
            SchemaType::Array => "ARRAY",
            SchemaType::String => "STRING",
            SchemaType::Number => "NUMBER",
            SchemaType::Integer => "INTEGER",
            SchemaType::Boolean => "BOOLEAN",
        }
    }
}

/// A JSON shape the model must produce. Object properties keep their declaration
/// order, which is also sent as `propertyOrdering`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    kind: SchemaType,
    description: Option<String>,
    properties: Vec<(String, Schema)>,
    required: Vec<String>,
    items: Option<Box<Schema>>,
}

impl Schema {
    fn of(kind: SchemaType) -> Self {
        Self {
            kind,
            description: None,
            properties: Vec::new(),
            required: Vec::new(),
            items: None,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn number() -> Self {
        Self::of(SchemaType::Number)
    }

    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaType::Boolean)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(SchemaType::Array)
        }
    }

    pub fn object<K, R>(
        properties: impl IntoIterator<Item = (K, Schema)>,
        required: impl IntoIterator<Item = R>,
    ) -> Self
    where
        K: Into<String>,
        R: Into<String>,
    {
        Self {
            properties: properties.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            required: required.into_iter().map(Into::into).collect(),
            ..Self::of(SchemaType::Object)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

struct Properties<'a>(&'a [(String, Schema)]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind.as_str())?;
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        if !self.properties.is_empty() {
            map.serialize_entry("properties", &Properties(&self.properties))?;
            let ordering: Vec<&str> = self.properties.iter().map(|(k, _)| k.as_str()).collect();
            map.serialize_entry("propertyOrdering", &ordering)?;
        }
        if !self.required.is_empty() {
            map.serialize_entry("required", &self.required)?;
        }
        if let Some(items) = &self.items {
            map.serialize_entry("items", items.as_ref())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_schema_serializes() {
        let schema = Schema::object(
            [
                ("from", Schema::string()),
                ("to", Schema::string().describe("node id")),
            ],
            ["from", "to"],
        );
        let list = Schema::array(schema);

        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "from": {"type": "STRING"},
                        "to": {"type": "STRING", "description": "node id"}
                    },
                    "propertyOrdering": ["from", "to"],
                    "required": ["from", "to"]
                }
            })
        );
    }

    #[test]
    fn test_property_order_is_preserved() {
        let schema = Schema::object(
            [("zeta", Schema::number()), ("alpha", Schema::boolean())],
            Vec::<String>::new(),
        );
        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
        assert!(!text.contains("required"));
    }
}

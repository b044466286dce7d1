use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Self-reported proficiency. The closed set the UI offers, plus whatever else
/// an older document may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProficiencyLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Other(String),
}

impl From<String> for ProficiencyLevel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Beginner" => ProficiencyLevel::Beginner,
            "Intermediate" => ProficiencyLevel::Intermediate,
            "Advanced" => ProficiencyLevel::Advanced,
            _ => ProficiencyLevel::Other(value),
        }
    }
}

impl From<ProficiencyLevel> for String {
    fn from(level: ProficiencyLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProficiencyLevel::Beginner => f.write_str("Beginner"),
            ProficiencyLevel::Intermediate => f.write_str("Intermediate"),
            ProficiencyLevel::Advanced => f.write_str("Advanced"),
            ProficiencyLevel::Other(s) => f.write_str(s),
        }
    }
}

/// The profile document stored under `users/{uid}`.
///
/// The uid is the document key and is never stored as a field. Fields this struct
/// does not model (e.g. `questProgress`) are carried in `extra` so a stored document
/// round-trips unchanged.
///
/// Reading is lenient: `null` reads as empty, scalars are coerced to the field's
/// type, and a value the field cannot hold at all is left in `extra` under its own
/// key. Such a raw value is written back as-is until the field is given a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub target_role: String,
    pub skills: Vec<String>,
    pub graduation_year: String,
    pub current_level: ProficiencyLevel,
    pub extra: Map<String, Value>,
}

impl UserProfile {
    fn typed_fields(&self) -> [(&'static str, Value); 7] {
        [
            ("name", Value::from(self.name.as_str())),
            ("email", Value::from(self.email.as_str())),
            ("avatar", Value::from(self.avatar.as_str())),
            ("targetRole", Value::from(self.target_role.as_str())),
            ("skills", Value::from(self.skills.clone())),
            ("graduationYear", Value::from(self.graduation_year.as_str())),
            ("currentLevel", Value::from(self.current_level.to_string())),
        ]
    }

    /// Builds a profile from raw document fields. Never fails.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let name = take_string(&mut fields, "name");
        let email = take_string(&mut fields, "email");
        let avatar = take_string(&mut fields, "avatar");
        let target_role = take_string(&mut fields, "targetRole");
        let skills = take_skills(&mut fields);
        let graduation_year = take_string(&mut fields, "graduationYear");
        let current_level = match take_string(&mut fields, "currentLevel") {
            level if level.is_empty() => ProficiencyLevel::Beginner,
            level => ProficiencyLevel::from(level),
        };
        Self {
            name,
            email,
            avatar,
            target_role,
            skills,
            graduation_year,
            current_level,
            extra: fields,
        }
    }

    /// The document form of this profile.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = self.extra.clone();
        let defaults = UserProfile::default().typed_fields();
        for ((key, value), (_, default)) in self.typed_fields().into_iter().zip(defaults) {
            if value == default && fields.contains_key(key) {
                continue;
            }
            fields.insert(key.to_string(), value);
        }
        fields
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> String {
    let Some(value) = fields.remove(key) else {
        return String::new();
    };
    if value.is_null() {
        return String::new();
    }
    match scalar_to_string(&value) {
        Some(s) => s,
        None => {
            fields.insert(key.to_string(), value);
            String::new()
        }
    }
}

/// `skills` as a list of scalars (nulls dropped) or a single bare string.
fn take_skills(fields: &mut Map<String, Value>) -> Vec<String> {
    let Some(value) = fields.remove("skills") else {
        return Vec::new();
    };
    let skills = match &value {
        Value::Null => Some(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Some(Vec::new()),
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(scalar_to_string)
            .collect::<Option<Vec<_>>>(),
        _ => None,
    };
    skills.unwrap_or_else(|| {
        fields.insert("skills".to_string(), value);
        Vec::new()
    })
}

impl Serialize for UserProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_fields().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UserProfile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(UserProfile::from_fields)
    }
}

/// Opaque progress payload owned by the prep planner. Written to the
/// `questProgress` field of the user's document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestProgress(pub Value);

/// Document field that holds [`QuestProgress`].
pub const QUEST_PROGRESS_FIELD: &str = "questProgress";

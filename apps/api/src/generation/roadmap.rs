//! Skill roadmap generation in the roadmap.sh style.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::generation::prompts::ROADMAP_PROMPT_TEMPLATE;
use crate::llm_client::{parse_json_or_default, GenerationRequest, LlmError, Schema, TextGenerator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadmapData {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub roadmap_style: String,
    #[serde(default)]
    pub sections: Vec<RoadmapSection>,
    #[serde(default)]
    pub dependencies: Vec<RoadmapDependency>,
    #[serde(default)]
    pub learning_notes: LearningNotes,
    /// Fields the model added beyond the schema, returned as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapSection {
    pub section_name: String,
    pub learning_stage: String,
    #[serde(default)]
    pub nodes: Vec<RoadmapNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapNode {
    pub id: String,
    pub label: String,
    /// Kept as the raw JSON number so the model's value survives unchanged.
    pub order: Number,
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Edge `from` → `to` between node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapDependency {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningNotes {
    #[serde(default)]
    pub order_not_strict: bool,
    #[serde(default)]
    pub beginner_friendly: bool,
}

/// Output-shape constraint sent with every roadmap request.
pub fn roadmap_schema() -> Schema {
    let node = Schema::object(
        [
            ("id", Schema::string()),
            ("label", Schema::string()),
            ("order", Schema::number().describe("Position within the section, starting at 1")),
            ("mandatory", Schema::boolean()),
            ("description", Schema::string().describe("Short reasoning why this matters")),
        ],
        ["id", "label", "order", "mandatory"],
    );
    let section = Schema::object(
        [
            ("section_name", Schema::string()),
            ("learning_stage", Schema::string()),
            ("nodes", Schema::array(node)),
        ],
        ["section_name", "learning_stage", "nodes"],
    );
    let dependency = Schema::object(
        [("from", Schema::string()), ("to", Schema::string())],
        ["from", "to"],
    );
    let notes = Schema::object(
        [
            ("order_not_strict", Schema::boolean()),
            ("beginner_friendly", Schema::boolean()),
        ],
        ["order_not_strict", "beginner_friendly"],
    );

    Schema::object(
        [
            ("role", Schema::string()),
            ("roadmap_style", Schema::string()),
            ("sections", Schema::array(section)),
            ("dependencies", Schema::array(dependency)),
            ("learning_notes", notes),
        ],
        ["role", "roadmap_style", "sections", "dependencies", "learning_notes"],
    )
}

/// Generates a full roadmap for `role`. An empty model answer yields an empty roadmap.
pub async fn generate_dynamic_roadmap(
    llm: &dyn TextGenerator,
    role: &str,
) -> Result<RoadmapData, LlmError> {
    let prompt = ROADMAP_PROMPT_TEMPLATE.replace("{role}", role);
    let request = GenerationRequest::prompt(prompt).with_schema(roadmap_schema());
    let response = llm.generate(request).await?;
    parse_json_or_default(response.text())
}

//! Gamified prep plans: a multi-day quest and the quests for a single day.

use serde::{Deserialize, Serialize};

use crate::generation::prompts::{DAILY_QUESTS_PROMPT_TEMPLATE, PREP_PLAN_PROMPT_TEMPLATE};
use crate::llm_client::{parse_json_or_default, GenerationRequest, LlmError, Schema, TextGenerator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepPlan {
    #[serde(default)]
    pub quest_name: String,
    #[serde(default)]
    pub main_objective: String,
    #[serde(default)]
    pub daily_quests: Vec<DailyQuest>,
    #[serde(default)]
    pub boss_battle: BossBattle,
    #[serde(default)]
    pub debuffs: Vec<Debuff>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyQuest {
    #[serde(default, deserialize_with = "crate::models::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub xp: u32,
    #[serde(default, deserialize_with = "crate::models::string_or_number")]
    pub bonus: String,
}

/// The end-of-plan challenge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BossBattle {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub rewards: Vec<String>,
}

/// A common pitfall and how to counter it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Debuff {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub fix: String,
}

fn daily_quest_schema() -> Schema {
    Schema::object(
        [
            ("id", Schema::string()),
            ("title", Schema::string()),
            ("xp", Schema::integer().describe("Experience points awarded on completion")),
            ("bonus", Schema::string()),
        ],
        ["id", "title", "xp"],
    )
}

pub fn prep_plan_schema() -> Schema {
    Schema::object(
        [
            ("questName", Schema::string()),
            ("mainObjective", Schema::string()),
            ("dailyQuests", Schema::array(daily_quest_schema())),
            (
                "bossBattle",
                Schema::object(
                    [
                        ("name", Schema::string()),
                        ("requirements", Schema::array(Schema::string())),
                        ("rewards", Schema::array(Schema::string())),
                    ],
                    ["name", "requirements", "rewards"],
                ),
            ),
            (
                "debuffs",
                Schema::array(Schema::object(
                    [
                        ("title", Schema::string()),
                        ("desc", Schema::string()),
                        ("fix", Schema::string()),
                    ],
                    ["title", "desc", "fix"],
                )),
            ),
        ],
        ["questName", "mainObjective", "dailyQuests", "bossBattle", "debuffs"],
    )
}

pub fn daily_quests_schema() -> Schema {
    Schema::array(daily_quest_schema())
}

/// Generates a `days`-long quest for `target_role`. An empty answer yields an empty plan.
pub async fn generate_prep_plan(
    llm: &dyn TextGenerator,
    target_role: &str,
    days: u32,
    current_level: &str,
) -> Result<PrepPlan, LlmError> {
    let prompt = PREP_PLAN_PROMPT_TEMPLATE
        .replace("{days}", &days.to_string())
        .replace("{target_role}", target_role)
        .replace("{current_level}", current_level);
    let request = GenerationRequest::prompt(prompt).with_schema(prep_plan_schema());
    let response = llm.generate(request).await?;
    parse_json_or_default(response.text())
}

/// Generates the quests for one day of a plan. An empty answer yields no quests.
pub async fn generate_daily_quests(
    llm: &dyn TextGenerator,
    target_role: &str,
    day_number: u32,
    current_level: &str,
) -> Result<Vec<DailyQuest>, LlmError> {
    let prompt = DAILY_QUESTS_PROMPT_TEMPLATE
        .replace("{day_number}", &day_number.to_string())
        .replace("{target_role}", target_role)
        .replace("{current_level}", current_level);
    let request = GenerationRequest::prompt(prompt).with_schema(daily_quests_schema());
    let response = llm.generate(request).await?;
    parse_json_or_default(response.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::{CannedLlm, DownLlm};
    use serde_json::json;

    #[tokio::test]
    async fn test_prep_plan_prompt_and_parse() {
        let llm = CannedLlm::replying(
            &json!({
                "questName": "Operation Backend",
                "mainObjective": "Ship a REST API",
                "dailyQuests": [{"id": 1, "title": "Learn HTTP", "xp": 50, "bonus": "Read RFC 9110"}],
                "bossBattle": {"name": "Mock Interview", "requirements": ["APIs"], "rewards": ["Badge"]},
                "debuffs": [{"title": "Tutorial hell", "desc": "Watching only", "fix": "Build things"}]
            })
            .to_string(),
        );

        let plan = generate_prep_plan(&llm, "Backend Engineer", 30, "Beginner").await.unwrap();
        assert_eq!(plan.quest_name, "Operation Backend");
        assert_eq!(plan.daily_quests[0].id, "1");
        assert_eq!(plan.daily_quests[0].xp, 50);
        assert_eq!(plan.boss_battle.rewards, vec!["Badge".to_string()]);
        assert_eq!(plan.debuffs[0].fix, "Build things");

        let prompt = llm.last_request().contents[0].parts[0].text.clone();
        assert!(prompt.starts_with(r#"Generate a 30-day gamified quest for "Backend Engineer" (Beginner level)."#));
    }

    #[tokio::test]
    async fn test_prep_plan_empty_response_is_empty_plan() {
        let plan = generate_prep_plan(&CannedLlm::silent(), "SRE", 7, "Advanced").await.unwrap();
        assert_eq!(plan, PrepPlan::default());
    }

    #[tokio::test]
    async fn test_daily_quests_prompt_and_parse() {
        let llm = CannedLlm::replying(
            r#"[{"id":"d3-1","title":"Index a table","xp":30,"bonus":"Explain the plan"},{"id":"d3-2","title":"Write a join","xp":20}]"#,
        );
        let quests = generate_daily_quests(&llm, "Data Engineer", 3, "Intermediate").await.unwrap();

        assert_eq!(quests.len(), 2);
        assert_eq!(quests[1].bonus, "");
        let request = llm.last_request();
        assert!(request.contents[0].parts[0]
            .text
            .starts_with("Generate 5 daily quests for Day 3 of Data Engineer prep (Intermediate level)."));
        assert_eq!(request.response_schema, Some(daily_quests_schema()));
    }

    #[tokio::test]
    async fn test_daily_quests_empty_response_is_empty_list() {
        let quests = generate_daily_quests(&CannedLlm::replying(""), "SRE", 1, "Beginner").await.unwrap();
        assert!(quests.is_empty());
    }

    #[tokio::test]
    async fn test_endpoint_failure_propagates() {
        let err = generate_daily_quests(&DownLlm, "SRE", 1, "Beginner").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
    }
}

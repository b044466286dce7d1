// All LLM prompt constants for the Generation module.
// Templates use `{placeholder}` markers replaced before sending.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

/// Roadmap prompt. Replace `{role}` before sending.
pub const ROADMAP_PROMPT_TEMPLATE: &str = r#"You are an expert curriculum architect. Generate a complete skill roadmap for the job role: "{role}", inspired by roadmap.sh.

This roadmap must:
- Match industry expectations
- Be beginner-friendly but complete
- Follow clear learning progression
- Be structured as a visual roadmap / mind map

OUTPUT FORMAT (STRICT JSON ONLY):
{
  "role": "{role}",
  "roadmap_style": "roadmap.sh",
  "sections": [
    {
      "section_name": "Internet",
      "learning_stage": "Early",
      "nodes": [
        {
          "id": "internet_basics",
          "label": "How the Internet Works",
          "order": 1,
          "mandatory": true,
          "description": "Short reasoning why this matters."
        }
      ]
    }
  ],
  "dependencies": [
    { "from": "node_id", "to": "node_id" }
  ],
  "learning_notes": {
    "order_not_strict": true,
    "beginner_friendly": true
  }
}

Ensure you include mandatory sections like Foundations, Core Languages, Frameworks, Tooling, Deployment, etc. appropriate for the role."#;

/// Career advisor persona for the advice chat.
pub const CAREER_ADVICE_SYSTEM: &str =
    "You are PathPilot AI, a personalized career advisor. Help the student with placement strategies.";

/// Prep plan prompt. Replace `{days}`, `{target_role}`, `{current_level}`.
pub const PREP_PLAN_PROMPT_TEMPLATE: &str = r#"Generate a {days}-day gamified quest for "{target_role}" ({current_level} level).

Return JSON with: questName, mainObjective, dailyQuests (5-7 tasks with id, title, xp, bonus), bossBattle (name, requirements, rewards), debuffs (title, desc, fix)."#;

/// Daily quest prompt. Replace `{day_number}`, `{target_role}`, `{current_level}`.
pub const DAILY_QUESTS_PROMPT_TEMPLATE: &str = r#"Generate 5 daily quests for Day {day_number} of {target_role} prep ({current_level} level).

Return JSON array with: id, title, xp, bonus."#;

/// ATS prompt. Replace `{target_role}`, `{context}`, `{resume_json}`, `{resume_text}`.
pub const ATS_PROMPT_TEMPLATE: &str = r#"Analyze this resume for {target_role}.{context}

RESUME DATA:
{resume_json}
{resume_text}
Score it the way an applicant tracking system would. Return JSON with:
ats_score (total 0-100, keyword_match, formatting, impact, skills_alignment),
strengths, weaknesses, missing_keywords, suggestions (each a list of strings)."#;

/// Resume assistant persona for the resume chat.
pub const RESUME_CHAT_SYSTEM: &str = "You are a Resume Assistant. The user has received an ATS analysis. \
    Help them improve their resume based on the analysis. Be specific and actionable.";

/// Resume chat message. Replace `{user_message}` and `{ats_total}`.
pub const RESUME_CHAT_MESSAGE_TEMPLATE: &str =
    "User Query: {user_message}\n\nATS Score: {ats_total}%\n\nProvide a helpful, specific answer.";

pub fn with_json_only(prompt: String) -> String {
    format!("{prompt}\n\n{JSON_ONLY_INSTRUCTION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_carry_their_placeholders() {
        assert!(ROADMAP_PROMPT_TEMPLATE.matches("{role}").count() == 2);
        for marker in ["{days}", "{target_role}", "{current_level}"] {
            assert!(PREP_PLAN_PROMPT_TEMPLATE.contains(marker), "{marker}");
        }
        for marker in ["{day_number}", "{target_role}", "{current_level}"] {
            assert!(DAILY_QUESTS_PROMPT_TEMPLATE.contains(marker), "{marker}");
        }
        for marker in ["{target_role}", "{context}", "{resume_json}", "{resume_text}"] {
            assert!(ATS_PROMPT_TEMPLATE.contains(marker), "{marker}");
        }
    }

    #[test]
    fn test_with_json_only_appends_instruction() {
        let prompt = with_json_only("Do it.".to_string());
        assert!(prompt.starts_with("Do it."));
        assert!(prompt.ends_with(JSON_ONLY_INSTRUCTION));
    }
}

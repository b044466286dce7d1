// Prompt/response adapter over the hosted model.
// Every model call goes through llm_client::TextGenerator.

pub mod advice;
pub mod ats;
pub mod handlers;
pub mod prompts;
pub mod quests;
pub mod resume_file;
pub mod roadmap;
#[cfg(test)]
pub(crate) mod testing;

// Analysis pipeline: resume text → job titles → live postings → ranked matches.
// Also parses resumes into structured sections. All LLM calls go through
// llm_client via the capability traits.

pub mod capabilities;
pub mod fixtures;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod ranking;

pub use capabilities::LlmCapabilities;
pub use orchestrator::{Pipeline, PipelineMode};

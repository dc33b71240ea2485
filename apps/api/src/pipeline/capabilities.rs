//! External capabilities used by the pipeline: job title suggestion,
//! resume/posting match scoring and structured resume parsing.
//!
//! The pipeline holds them as `Arc<dyn TitleSuggester>`, `Arc<dyn MatchScorer>`
//! and `Arc<dyn ResumeParser>`; production wires all three to `LlmCapabilities`,
//! tests use in-memory fakes.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::prompts::{
    PARSE_RESUME_PROMPT, PARSE_RESUME_SYSTEM, SCORE_INSTRUCTIONS, SCORE_POSTINGS_TURN,
    SCORE_RESUME_TURN, SUGGEST_TITLES_PROMPT,
};
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{parse_json_reply, LlmClient, LlmError};
use crate::models::{ParsedResume, Posting};

pub const TITLE_STAGE: &str = "Job title suggestion failed";
pub const SCORE_STAGE: &str = "Job match scoring failed";
pub const PARSE_STAGE: &str = "Resume parsing failed";

/// Logs the upstream failure and returns an error naming only the stage.
pub fn upstream_failure(stage: &'static str, e: LlmError) -> AppError {
    error!(stage, "LLM call failed: {e}");
    AppError::Llm(stage.to_string())
}

/// One scored posting as returned by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    #[serde(deserialize_with = "job_id_from_number_or_string")]
    pub job_id: u64,
    pub match_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub missing_requirements: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

fn job_id_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Float(f64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        RawId::Float(f) => Err(serde::de::Error::custom(format!("jobId {f} is not an id"))),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("jobId '{s}' is not a number"))),
    }
}

#[async_trait]
pub trait TitleSuggester: Send + Sync {
    /// Ordered, de-duplicated job titles for a resume. May be empty.
    async fn suggest_titles(&self, resume_text: &str) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait MatchScorer: Send + Sync {
    async fn score_matches(
        &self,
        resume_text: &str,
        postings: &[Posting],
    ) -> Result<Vec<MatchScore>, AppError>;
}

#[async_trait]
pub trait ResumeParser: Send + Sync {
    async fn parse_resume(&self, resume_text: &str) -> Result<ParsedResume, AppError>;
}

/// Every capability backed by the shared `LlmClient`.
pub struct LlmCapabilities {
    llm: LlmClient,
}

impl LlmCapabilities {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[derive(Debug, Deserialize)]
struct TitleReply {
    #[serde(default)]
    jobs: Vec<String>,
}

#[async_trait]
impl TitleSuggester for LlmCapabilities {
    async fn suggest_titles(&self, resume_text: &str) -> Result<Vec<String>, AppError> {
        let prompt = SUGGEST_TITLES_PROMPT.replace("{resume_text}", resume_text);
        let text = self
            .llm
            .complete_text(JSON_ONLY_SYSTEM, &[&prompt])
            .await
            .or_else(|e| match e {
                LlmError::EmptyContent => Ok(String::new()),
                other => Err(other),
            })
            .map_err(|e| upstream_failure(TITLE_STAGE, e))?;

        match parse_json_reply::<TitleReply>(&text) {
            Ok(reply) => Ok(clean_titles(reply.jobs)),
            Err(e) => {
                warn!("Title suggestion reply was not usable, continuing with no titles: {e}");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl MatchScorer for LlmCapabilities {
    async fn score_matches(
        &self,
        resume_text: &str,
        postings: &[Posting],
    ) -> Result<Vec<MatchScore>, AppError> {
        if postings.is_empty() {
            return Ok(Vec::new());
        }

        let listed: Vec<_> = postings
            .iter()
            .map(|p| {
                json!({
                    "jobId": p.sequence_id,
                    "title": p.title,
                    "company": p.company,
                    "location": p.location,
                    "description": p.description,
                })
            })
            .collect();
        let listed = serde_json::to_string(&listed)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to encode postings: {e}")))?;

        let resume_turn = SCORE_RESUME_TURN.replace("{resume_text}", resume_text);
        let postings_turn = SCORE_POSTINGS_TURN.replace("{postings}", &listed);
        let text = self
            .llm
            .complete_text(
                JSON_ONLY_SYSTEM,
                &[&resume_turn, &postings_turn, SCORE_INSTRUCTIONS],
            )
            .await
            .map_err(|e| upstream_failure(SCORE_STAGE, e))?;
        let scores = decode_scores(&text).map_err(|e| upstream_failure(SCORE_STAGE, e))?;

        debug!(postings = postings.len(), scores = scores.len(), "Scoring reply parsed");
        Ok(scores)
    }
}

#[async_trait]
impl ResumeParser for LlmCapabilities {
    async fn parse_resume(&self, resume_text: &str) -> Result<ParsedResume, AppError> {
        let prompt = PARSE_RESUME_PROMPT.replace("{resume_text}", resume_text);
        let reply: Value = self
            .llm
            .complete_json(PARSE_RESUME_SYSTEM, &[&prompt])
            .await
            .map_err(|e| upstream_failure(PARSE_STAGE, e))?;

        let Some(fields) = reply.as_object() else {
            error!(stage = PARSE_STAGE, "Resume parsing reply was not a JSON object");
            return Err(AppError::Llm(PARSE_STAGE.to_string()));
        };
        debug!(keys = ?fields.keys().collect::<Vec<_>>(), "Resume parsing reply received");
        Ok(ParsedResume::from_reply(&reply))
    }
}

/// Decodes a scoring reply entry by entry. The reply must be a JSON array;
/// entries without a usable `jobId` or `matchScore` are skipped.
pub fn decode_scores(text: &str) -> Result<Vec<MatchScore>, LlmError> {
    let entries: Vec<Value> = parse_json_reply(text)?;
    let total = entries.len();
    let scores: Vec<MatchScore> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(score) => Some(score),
            Err(e) => {
                debug!(index, "Skipping unusable score entry: {e}");
                None
            }
        })
        .collect();
    if scores.len() < total {
        debug!(kept = scores.len(), total, "Dropped malformed score entries");
    }
    Ok(scores)
}

/// Trims titles, drops blanks and case-insensitive repeats. Order is kept.
pub fn clean_titles(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

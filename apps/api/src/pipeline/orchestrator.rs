//! Pipeline Orchestrator: runs one analysis from resume to ranked matches
//! and reports every stage on the progress bus.
//!
//! Per-run state machine:
//! `Start → TextExtracted → TitlesSuggested → Acquired → (Scored →) Done`,
//! with `Errored` absorbing from any non-terminal state.

use std::sync::Arc;

use anyhow::anyhow;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::capabilities::{MatchScorer, ResumeParser, TitleSuggester};
use super::fixtures::{fixture_parsed_resume, fixture_postings, fixture_scores};
use super::ranking::rank_matches;
use crate::acquisition::{AcquisitionEngine, AcquisitionRequest};
use crate::errors::AppError;
use crate::extraction::{extract_text, UploadedDocument};
use crate::models::{ParsedResume, RankedMatch};
use crate::progress::{ProgressBus, ProgressStage};

const MAX_REQUEST_ID_LEN: usize = 128;
pub const NO_JOBS_MESSAGE: &str = "No job postings were found for the suggested titles";

pub enum ResumeSource {
    Text(String),
    Document(UploadedDocument),
}

pub struct AnalysisInput {
    pub source: ResumeSource,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    #[serde(rename_all = "camelCase")]
    Matched {
        request_id: String,
        total_jobs: usize,
        matched_jobs: usize,
        matches: Vec<RankedMatch>,
    },
    /// Acquisition came back empty; scoring was skipped.
    #[serde(rename_all = "camelCase")]
    NoJobs {
        request_id: String,
        matches: Vec<RankedMatch>,
        message: String,
    },
}

/// Where the pipeline gets its titles, scores and parsed resumes from.
pub enum PipelineMode {
    Live {
        titles: Arc<dyn TitleSuggester>,
        scorer: Arc<dyn MatchScorer>,
        parser: Arc<dyn ResumeParser>,
    },
    /// Fixtures only, whatever the input; no capability or network call.
    Testing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    TextExtracted,
    TitlesSuggested,
    Acquired,
    Scored,
    Done,
    Errored,
}

impl PipelineState {
    fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Start, TextExtracted)
                | (TextExtracted, TitlesSuggested)
                | (TitlesSuggested, Acquired)
                | (Acquired, Scored)
                | (Acquired, Done)
                | (Scored, Done)
        ) || (next == Errored && !matches!(self, Done | Errored))
    }
}

/// Tracks one run's state and tags its events with the run's request id.
struct RunTracker {
    request_id: String,
    state: PipelineState,
    bus: ProgressBus,
}

impl RunTracker {
    fn new(request_id: String, bus: ProgressBus) -> Self {
        Self {
            request_id,
            state: PipelineState::Start,
            bus,
        }
    }

    fn advance(&mut self, next: PipelineState) -> Result<(), AppError> {
        if !self.state.can_advance_to(next) {
            return Err(AppError::Internal(anyhow!(
                "illegal pipeline transition {:?} -> {:?}",
                self.state,
                next
            )));
        }
        self.state = next;
        Ok(())
    }

    fn emit(&self, stage: ProgressStage, message: impl Into<String>, metadata: Option<Value>) {
        self.bus.emit(Some(&self.request_id), stage, message, metadata);
    }

    /// Publishes the terminal error event and hands the error back.
    fn fail(&mut self, error: AppError) -> AppError {
        if self.state != PipelineState::Errored {
            self.state = PipelineState::Errored;
            self.emit(ProgressStage::Error, error.public_message(), None);
        }
        error
    }
}

pub struct Pipeline {
    mode: PipelineMode,
    engine: AcquisitionEngine,
    bus: ProgressBus,
}

impl Pipeline {
    pub fn new(mode: PipelineMode, engine: AcquisitionEngine, bus: ProgressBus) -> Self {
        Self { mode, engine, bus }
    }

    pub fn is_testing(&self) -> bool {
        matches!(self.mode, PipelineMode::Testing)
    }

    pub async fn run(&self, input: AnalysisInput) -> Result<AnalysisOutcome, AppError> {
        let (titles, scorer) = match &self.mode {
            PipelineMode::Testing => {
                // Any uploaded file is dropped (and deleted) with the input.
                drop(input.source);
                let request_id = resolve_request_id(input.request_id.as_deref())
                    .unwrap_or_else(|_| {
                        debug!("Testing mode: replacing an invalid requestId");
                        Uuid::new_v4().to_string()
                    });
                return Ok(self.run_fixtures(request_id));
            }
            PipelineMode::Live { titles, scorer, .. } => (titles.as_ref(), scorer.as_ref()),
        };

        let request_id = resolve_request_id(input.request_id.as_deref())?;
        let mut tracker = RunTracker::new(request_id, self.bus.clone());
        match self.run_live(&mut tracker, input.source, titles, scorer).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(request_id = %tracker.request_id, "Analysis failed: {e}");
                Err(tracker.fail(e))
            }
        }
    }

    async fn run_live(
        &self,
        tracker: &mut RunTracker,
        source: ResumeSource,
        suggester: &dyn TitleSuggester,
        scorer: &dyn MatchScorer,
    ) -> Result<AnalysisOutcome, AppError> {
        let source_kind = match &source {
            ResumeSource::Text(_) => "text",
            ResumeSource::Document(_) => "document",
        };
        tracker.emit(
            ProgressStage::ResumeReceived,
            "Resume received",
            Some(json!({ "source": source_kind })),
        );

        tracker.emit(ProgressStage::ExtractingText, "Extracting resume text", None);
        let resume_text = read_resume(source).await?;
        tracker.advance(PipelineState::TextExtracted)?;

        tracker.emit(ProgressStage::GeneratingJobTitles, "Generating job titles", None);
        let titles = suggester.suggest_titles(&resume_text).await?;
        tracker.emit(
            ProgressStage::JobTitlesReady,
            format!("Suggested {} job titles", titles.len()),
            Some(json!({ "titles": titles })),
        );
        tracker.advance(PipelineState::TitlesSuggested)?;

        tracker.emit(
            ProgressStage::ScrapingStarted,
            "Searching job sites",
            Some(json!({ "titles": titles })),
        );
        let postings = self
            .engine
            .acquire(&AcquisitionRequest {
                titles,
                request_id: Some(tracker.request_id.clone()),
            })
            .await;
        tracker.emit(
            ProgressStage::ScrapingComplete,
            format!("Found {} job postings", postings.len()),
            Some(json!({ "totalJobs": postings.len() })),
        );
        tracker.advance(PipelineState::Acquired)?;

        if postings.is_empty() {
            tracker.emit(ProgressStage::Completed, NO_JOBS_MESSAGE, None);
            tracker.advance(PipelineState::Done)?;
            info!(request_id = %tracker.request_id, "Analysis finished with no postings");
            return Ok(AnalysisOutcome::NoJobs {
                request_id: tracker.request_id.clone(),
                matches: Vec::new(),
                message: NO_JOBS_MESSAGE.to_string(),
            });
        }

        tracker.emit(ProgressStage::AiFiltering, "Scoring postings against the resume", None);
        let scores = scorer.score_matches(&resume_text, &postings).await?;
        let matches = rank_matches(&postings, scores);
        tracker.advance(PipelineState::Scored)?;
        tracker.emit(
            ProgressStage::AnalysisReady,
            format!("{} matching jobs", matches.len()),
            Some(json!({ "matchedJobs": matches.len() })),
        );

        tracker.emit(ProgressStage::Finalizing, "Preparing results", None);
        let outcome = AnalysisOutcome::Matched {
            request_id: tracker.request_id.clone(),
            total_jobs: postings.len(),
            matched_jobs: matches.len(),
            matches,
        };
        tracker.emit(ProgressStage::Completed, "Analysis complete", None);
        tracker.advance(PipelineState::Done)?;

        info!(
            request_id = %tracker.request_id,
            total_jobs = postings.len(),
            "Analysis finished"
        );
        Ok(outcome)
    }

    /// Structured parse of one resume. Publishes no progress events.
    pub async fn parse_resume(&self, source: ResumeSource) -> Result<ParsedResume, AppError> {
        let parser = match &self.mode {
            PipelineMode::Testing => {
                drop(source);
                debug!("Testing mode: returning the sample parsed resume");
                return Ok(fixture_parsed_resume());
            }
            PipelineMode::Live { parser, .. } => parser.as_ref(),
        };
        let resume_text = read_resume(source).await?;
        let resume = parser.parse_resume(&resume_text).await?;
        info!(chars = resume_text.len(), "Resume parsed");
        Ok(resume)
    }

    fn run_fixtures(&self, request_id: String) -> AnalysisOutcome {
        self.bus.emit(
            Some(&request_id),
            ProgressStage::Testing,
            "Testing mode: returning sample matches",
            None,
        );
        let postings = fixture_postings();
        let matches = rank_matches(&postings, fixture_scores());
        self.bus.emit(
            Some(&request_id),
            ProgressStage::Completed,
            "Analysis complete",
            None,
        );
        AnalysisOutcome::Matched {
            request_id,
            total_jobs: postings.len(),
            matched_jobs: matches.len(),
            matches,
        }
    }
}

/// Resume text from either source; blank text is a validation error.
async fn read_resume(source: ResumeSource) -> Result<String, AppError> {
    let text = match source {
        ResumeSource::Text(text) => text,
        ResumeSource::Document(document) => extract_text(document).await?,
    };
    if text.trim().is_empty() {
        return Err(AppError::Validation("Resume text is empty".to_string()));
    }
    Ok(text)
}

/// Trims a caller-supplied id and checks it; generates one when absent or blank.
pub fn resolve_request_id(raw: Option<&str>) -> Result<String, AppError> {
    let Some(id) = raw.map(str::trim).filter(|id| !id.is_empty()) else {
        return Ok(Uuid::new_v4().to_string());
    };
    let valid = id.len() <= MAX_REQUEST_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-'));
    if valid {
        Ok(id.to_string())
    } else {
        Err(AppError::Validation(
            "requestId must be 1-128 characters from [A-Za-z0-9._:-]".to_string(),
        ))
    }
}

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pipeline stages. `Completed` and `Error` are terminal; `ScrapingError` is
/// reported from inside acquisition without ending the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    ResumeReceived,
    ExtractingText,
    GeneratingJobTitles,
    JobTitlesReady,
    ScrapingStarted,
    ScrapingSite,
    ScrapingSiteComplete,
    ScrapingComplete,
    ScrapingError,
    AiFiltering,
    AnalysisReady,
    Finalizing,
    Completed,
    Testing,
    Error,
}

impl ProgressStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressStage::Completed | ProgressStage::Error)
    }
}

/// One immutable progress notification. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "progressId")]
    pub request_id: Option<String>,
    pub stage: ProgressStage,
    pub message: String,
    /// RFC 3339, UTC. Filled in by the bus when the publisher leaves it empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "meta")]
    pub metadata: Option<Value>,
}

impl ProgressEvent {
    pub fn new(request_id: Option<&str>, stage: ProgressStage, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.map(str::to_string),
            stage,
            message: message.into(),
            timestamp: None,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn stamp(&mut self) {
        if self.timestamp.is_none() {
            self.timestamp = Some(now_rfc3339());
        }
    }
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

//! Axum route handlers for the analysis and resume parsing API.

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::orchestrator::{AnalysisInput, AnalysisOutcome, ResumeSource};
use crate::errors::AppError;
use crate::extraction::UploadedDocument;
use crate::models::ParsedResume;
use crate::progress::event::now_rfc3339;
use crate::state::AppState;

pub const DOCUMENT_FIELD: &str = "document";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub resume_text: String,
    #[serde(default, alias = "progressId")]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseTextRequest {
    pub resume_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub processed_at: String,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub success: bool,
    pub data: ParsedResume,
    pub metadata: ParseMetadata,
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    // Blank text and bad ids are rejected by the live pipeline; testing mode takes any input.
    let outcome = state
        .pipeline
        .run(AnalysisInput {
            source: ResumeSource::Text(req.resume_text),
            request_id: req.request_id,
        })
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/upload
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let (document, request_id) = read_upload(multipart).await?;
    let outcome = state
        .pipeline
        .run(AnalysisInput {
            source: ResumeSource::Document(document),
            request_id,
        })
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/resume/parse
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ParseResponse>, AppError> {
    let (document, _) = read_upload(multipart).await?;
    let file_size = tokio::fs::metadata(document.file.path())
        .await
        .ok()
        .map(|m| m.len());
    let file_name = document.file_name.clone();
    let mime_type = document.mime.clone();

    let data = state
        .pipeline
        .parse_resume(ResumeSource::Document(document))
        .await?;
    Ok(Json(ParseResponse {
        success: true,
        data,
        metadata: ParseMetadata {
            file_name,
            file_size,
            mime_type,
            processed_at: now_rfc3339(),
        },
    }))
}

/// POST /api/v1/resume/parse-text
pub async fn handle_parse_resume_text(
    State(state): State<AppState>,
    payload: Result<Json<ParseTextRequest>, JsonRejection>,
) -> Result<Json<ParseResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let data = state
        .pipeline
        .parse_resume(ResumeSource::Text(req.resume_text))
        .await?;
    Ok(Json(ParseResponse {
        success: true,
        data,
        metadata: ParseMetadata {
            file_name: None,
            file_size: None,
            mime_type: None,
            processed_at: now_rfc3339(),
        },
    }))
}

/// Reads the `document` file field and an optional `requestId`/`progressId`.
async fn read_upload(
    mut multipart: Multipart,
) -> Result<(UploadedDocument, Option<String>), AppError> {
    let mut document: Option<UploadedDocument> = None;
    let mut request_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(DOCUMENT_FIELD) if document.is_none() => {
                document = Some(spool(field).await?);
            }
            Some("requestId") | Some("progressId") => {
                request_id = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!(field = ?other, "Ignoring multipart field"),
        }
    }

    let document = document
        .ok_or_else(|| AppError::Validation(format!("No file uploaded in '{DOCUMENT_FIELD}'")))?;
    Ok((document, request_id))
}

/// Streams one file field into a temp file.
async fn spool(mut field: Field<'_>) -> Result<UploadedDocument, AppError> {
    let mime = field.content_type().map(str::to_string);
    let file_name = field.file_name().map(str::to_string);

    let file = NamedTempFile::new()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create temp file: {e}")))?;
    let handle = file
        .reopen()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to open temp file: {e}")))?;
    let mut out = tokio::fs::File::from_std(handle);

    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        out.write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to spool upload: {e}")))?;
        written += chunk.len();
    }
    out.flush()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to spool upload: {e}")))?;

    if written == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    debug!(bytes = written, mime = ?mime, file = ?file_name, "Upload spooled");
    Ok(UploadedDocument {
        file,
        mime,
        file_name,
    })
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file exceeds the size limit".to_string())
    } else {
        AppError::Validation(format!("Invalid upload: {}", e.body_text()))
    }
}

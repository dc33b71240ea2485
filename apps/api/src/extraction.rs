//! Document text extraction for uploaded resumes.
//!
//! PDF, DOCX and plain text are supported. The upload handler spools the file
//! to a `NamedTempFile`; extraction consumes the `UploadedDocument` so the temp
//! file is removed as soon as the text is out.

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::AppError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    /// Resolves the kind from the declared content type, falling back to the
    /// file extension when the client sent no useful type.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Option<Self> {
        let declared = content_type
            .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

        match declared.as_deref() {
            Some(MIME_PDF) => Some(DocumentKind::Pdf),
            Some(MIME_DOCX) => Some(DocumentKind::Docx),
            Some(MIME_TEXT) => Some(DocumentKind::PlainText),
            Some(_) => None,
            None => {
                let ext = file_name
                    .and_then(|n| Path::new(n).extension())
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                match ext.as_deref() {
                    Some("pdf") => Some(DocumentKind::Pdf),
                    Some("docx") => Some(DocumentKind::Docx),
                    Some("txt") => Some(DocumentKind::PlainText),
                    _ => None,
                }
            }
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            DocumentKind::Pdf => MIME_PDF,
            DocumentKind::Docx => MIME_DOCX,
            DocumentKind::PlainText => MIME_TEXT,
        }
    }
}

/// An uploaded resume waiting to be read. Dropping it deletes the file.
#[derive(Debug)]
pub struct UploadedDocument {
    pub file: NamedTempFile,
    /// As declared by the client; may be absent or unsupported.
    pub mime: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedDocument {
    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::detect(self.mime.as_deref(), self.file_name.as_deref())
    }
}

/// Reads the document's text and deletes the temp file on every path.
pub async fn extract_text(document: UploadedDocument) -> Result<String, AppError> {
    let Some(kind) = document.kind() else {
        debug!(mime = ?document.mime, file = ?document.file_name, "Rejecting upload");
        release(document.file);
        return Err(AppError::Validation("Unsupported file type".to_string()));
    };

    let text = match kind {
        DocumentKind::PlainText => {
            let bytes = tokio::fs::read(document.file.path()).await;
            release(document.file);
            let bytes = bytes.map_err(|e| AppError::Internal(anyhow!("failed to read upload: {e}")))?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        DocumentKind::Pdf => {
            // pdf-extract is synchronous and CPU-bound.
            let file = document.file;
            tokio::task::spawn_blocking(move || {
                let text = pdf_extract::extract_text(file.path());
                release(file);
                text
            })
            .await
            .map_err(|e| AppError::Internal(anyhow!("spawn_blocking failed in PDF extraction: {e}")))?
            .map_err(|e| {
                warn!("PDF extraction failed: {e}");
                AppError::Validation("Could not read text from the PDF".to_string())
            })?
        }
        DocumentKind::Docx => {
            let file = document.file;
            tokio::task::spawn_blocking(move || {
                let text = read_docx(file.path());
                release(file);
                text
            })
            .await
            .map_err(|e| AppError::Internal(anyhow!("spawn_blocking failed in DOCX extraction: {e}")))?
            .map_err(|e| {
                warn!("DOCX extraction failed: {e:#}");
                AppError::Validation("Could not read text from the DOCX file".to_string())
            })?
        }
    };

    debug!(kind = kind.mime(), chars = text.len(), "Extracted resume text");
    Ok(text)
}

/// Paragraph text of a .docx package, one line per `w:p`.
fn read_docx(path: &Path) -> anyhow::Result<String> {
    let file = std::fs::File::open(path).context("failed to open upload")?;
    let mut archive = zip::ZipArchive::new(file).context("not a zip package")?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .context("package has no word/document.xml")?
        .read_to_string(&mut xml)
        .context("word/document.xml is not readable")?;
    docx_body_text(&xml)
}

fn docx_body_text(xml: &str) -> anyhow::Result<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event().context("malformed word/document.xml")? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:r" => in_run = true,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:r" => in_run = false,
                b"w:t" => in_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            // Tab stops in paragraph properties are also `w:tab`; only runs count.
            Event::Empty(e) if in_run => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => text.push_str(&String::from_utf8_lossy(&t)),
            Event::GeneralRef(r) if in_text => {
                if let Ok(Some(c)) = r.resolve_char_ref() {
                    text.push(c);
                } else if let Some(s) = resolve_predefined_entity(&String::from_utf8_lossy(&r)) {
                    text.push_str(s);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text.trim_end().to_string())
}

fn release(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        warn!(path = %path.display(), "Failed to remove uploaded file: {e}");
    }
}

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::acquisition::adapter::{form_encode, parse_url, AdapterError, SearchRequest, SiteAdapter};
use crate::acquisition::html::first_text;
use crate::models::{Posting, SourceDescriptor};

pub const TITLE_PLACEHOLDER: &str = "{title}";

/// CSS selectors for the fields of a detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSelectors {
    #[serde(default = "default_title_selector")]
    pub title: String,
    #[serde(default = "default_description_selector")]
    pub description: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub date_posted: Option<String>,
}

fn default_title_selector() -> String {
    "h1".to_string()
}

fn default_description_selector() -> String {
    "main".to_string()
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            title: default_title_selector(),
            description: default_description_selector(),
            company: None,
            location: None,
            date_posted: None,
        }
    }
}

/// One configured source, as read from the sources file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSource {
    #[serde(flatten)]
    pub descriptor: SourceDescriptor,
    #[serde(default)]
    pub detail: DetailSelectors,
}

/// Data-driven adapter: GET against `searchEndpoint` with `{title}` replaced
/// by the query-encoded title.
pub struct TemplateAdapter {
    source: TemplateSource,
}

impl TemplateAdapter {
    pub fn new(source: TemplateSource) -> Self {
        Self { source }
    }
}

impl SiteAdapter for TemplateAdapter {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.source.descriptor
    }

    fn build_search_request(&self, title: &str) -> Result<SearchRequest, AdapterError> {
        let endpoint = &self.source.descriptor.search_endpoint;
        if !endpoint.contains(TITLE_PLACEHOLDER) {
            return Err(AdapterError::MissingPlaceholder(endpoint.clone()));
        }
        let url = endpoint.replace(TITLE_PLACEHOLDER, &form_encode(title));
        parse_url(&url)?;
        Ok(SearchRequest::get(
            url,
            self.source.descriptor.headers_with_defaults(),
        ))
    }

    fn extract_posting(&self, page: &str, link: &str, sequence_id: u64) -> Posting {
        let document = Html::parse_document(page);
        let selectors = &self.source.detail;
        let optional = |css: &Option<String>| css.as_deref().and_then(|c| first_text(&document, c));
        Posting {
            sequence_id,
            title: first_text(&document, &selectors.title).unwrap_or_default(),
            link: link.to_string(),
            description: first_text(&document, &selectors.description).unwrap_or_default(),
            company: optional(&selectors.company),
            location: optional(&selectors.location),
            date_posted: optional(&selectors.date_posted),
        }
    }
}

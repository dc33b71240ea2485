use thiserror::Error;

use super::html;
use crate::models::{Posting, SourceDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Transport-neutral description of one HTTP call an adapter wants made.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Sent as `application/x-www-form-urlencoded` when non-empty.
    pub form: Vec<(String, String)>,
}

impl SearchRequest {
    pub fn get(url: impl Into<String>, headers: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers,
            form: Vec::new(),
        }
    }

    pub fn post_form(
        url: impl Into<String>,
        headers: Vec<(String, String)>,
        form: Vec<(String, String)>,
    ) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            form,
        }
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid search URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("search endpoint '{0}' has no title placeholder")]
    MissingPlaceholder(String),

    #[error("search endpoint '{0}' cannot take path segments")]
    NotABaseUrl(String),
}

/// One external listing site behind a uniform contract.
///
/// Parse problems never escape an adapter: listing extraction returns what
/// it could find and detail extraction leaves unmatched fields empty.
pub trait SiteAdapter: Send + Sync {
    fn descriptor(&self) -> &SourceDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Builds the search call for one title, escaping it for this site's transport.
    fn build_search_request(&self, title: &str) -> Result<SearchRequest, AdapterError>;

    /// Absolute, order-preserving, duplicate-free posting links on a listing page.
    fn extract_listing_links(&self, page: &str) -> Vec<String> {
        let descriptor = self.descriptor();
        html::listing_links(page, &descriptor.listing_selector, &descriptor.base_url)
    }

    /// Request used to fetch one posting's detail page.
    fn detail_request(&self, link: &str) -> SearchRequest {
        SearchRequest::get(link, self.descriptor().headers_with_defaults())
    }

    fn extract_posting(&self, page: &str, link: &str, sequence_id: u64) -> Posting;
}

pub(crate) fn parse_url(raw: &str) -> Result<url::Url, AdapterError> {
    url::Url::parse(raw).map_err(|source| AdapterError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Query/form encoding of a title (`+` for spaces).
pub(crate) fn form_encode(title: &str) -> String {
    url::form_urlencoded::byte_serialize(title.as_bytes()).collect()
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Static description of one external listing site.
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    /// Unique discriminator, also the adapter registry key.
    pub name: String,
    pub base_url: String,
    /// Either a literal URL or a template carrying the adapter's title placeholder.
    pub search_endpoint: String,
    /// CSS selector matching the anchors of a listing page.
    pub listing_selector: String,
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
}

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

impl SourceDescriptor {
    /// Headers applied to every request against this source, with a desktop
    /// user agent unless the descriptor sets its own.
    pub fn headers_with_defaults(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .request_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !self
            .request_headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("user-agent"))
        {
            headers.push(("user-agent".to_string(), DESKTOP_USER_AGENT.to_string()));
        }
        headers
    }
}

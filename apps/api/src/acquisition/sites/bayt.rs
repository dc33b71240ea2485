use std::collections::BTreeMap;

use scraper::Html;

use crate::acquisition::adapter::{parse_url, AdapterError, SearchRequest, SiteAdapter};
use crate::acquisition::html::{first_text, joined_text};
use crate::models::{Posting, SourceDescriptor};

const BASE_URL: &str = "https://www.bayt.com";
const SEARCH_ROOT: &str = "https://www.bayt.com/en/lebanon/jobs/";

/// Regional board searched by path slug (`/<title>-jobs/`). Sits behind bot
/// protection, so it is not enabled by default.
pub struct Bayt {
    descriptor: SourceDescriptor,
}

impl Bayt {
    pub const NAME: &'static str = "bayt";

    pub fn new() -> Self {
        Self {
            descriptor: SourceDescriptor {
                name: Self::NAME.to_string(),
                base_url: BASE_URL.to_string(),
                search_endpoint: SEARCH_ROOT.to_string(),
                listing_selector: "div > ul > li > div > h2 > a".to_string(),
                request_headers: BTreeMap::new(),
            },
        }
    }
}

impl Default for Bayt {
    fn default() -> Self {
        Self::new()
    }
}

fn title_slug(title: &str) -> String {
    let words: Vec<String> = title.split_whitespace().map(str::to_lowercase).collect();
    format!("{}-jobs", words.join("-"))
}

impl SiteAdapter for Bayt {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn build_search_request(&self, title: &str) -> Result<SearchRequest, AdapterError> {
        let mut url = parse_url(&self.descriptor.search_endpoint)?;
        url.path_segments_mut()
            .map_err(|_| AdapterError::NotABaseUrl(self.descriptor.search_endpoint.clone()))?
            .pop_if_empty()
            .push(&title_slug(title))
            .push("");
        Ok(SearchRequest::get(
            url.to_string(),
            self.descriptor.headers_with_defaults(),
        ))
    }

    fn extract_posting(&self, page: &str, link: &str, sequence_id: u64) -> Posting {
        let document = Html::parse_document(page);
        Posting {
            sequence_id,
            title: first_text(&document, "div.media-d > div > div > h1.h3").unwrap_or_default(),
            link: link.to_string(),
            description: joined_text(&document, "div.t-break > p", "\n").unwrap_or_default(),
            company: first_text(&document, "div.p0 > ul.p0t > li > a.t-default"),
            location: joined_text(&document, "div > ul > li > span > a.t-mute", " "),
            date_posted: first_text(&document, "div.m10y > span.u-none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_uses_escaped_slug_segment() {
        let request = Bayt::new().build_search_request("Data  Scientist/ML").unwrap();
        assert_eq!(
            request.url,
            "https://www.bayt.com/en/lebanon/jobs/data-scientist%2Fml-jobs/"
        );
    }

    #[test]
    fn test_slug_lowercases_and_joins_words() {
        assert_eq!(title_slug(" Software  Engineer "), "software-engineer-jobs");
    }

    #[test]
    fn test_extract_posting_joins_location_parts() {
        let page = r#"
            <div class="media-d"><div><div><h1 class="h3">Data Engineer</h1></div></div></div>
            <div class="t-break"><p>Build pipelines.</p><p>Use Rust.</p></div>
            <div class="p0"><ul class="p0t"><li><a class="t-default">Gulf Data</a></li></ul></div>
            <div><ul><li><span><a class="t-mute">Beirut</a></span></li>
                     <li><span><a class="t-mute">Lebanon</a></span></li></ul></div>
            <div class="m10y"><span class="u-none">3 days ago</span></div>
        "#;
        let posting = Bayt::new().extract_posting(page, "https://www.bayt.com/en/job/1", 2);
        assert_eq!(posting.title, "Data Engineer");
        assert_eq!(posting.description, "Build pipelines.\nUse Rust.");
        assert_eq!(posting.company.as_deref(), Some("Gulf Data"));
        assert_eq!(posting.location.as_deref(), Some("Beirut Lebanon"));
        assert_eq!(posting.date_posted.as_deref(), Some("3 days ago"));
    }
}

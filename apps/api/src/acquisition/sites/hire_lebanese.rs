use std::collections::BTreeMap;

use scraper::Html;

use crate::acquisition::adapter::{form_encode, parse_url, AdapterError, SearchRequest, SiteAdapter};
use crate::acquisition::html::first_text;
use crate::models::{Posting, SourceDescriptor};

const BASE_URL: &str = "https://hirelebanese.com/";
/// `#` marks where the encoded title goes.
const SEARCH_TEMPLATE: &str = "https://hirelebanese.com/searchresults.aspx?order=date&keywords=#\
    &category=&type=&duration=&country=117,241,258,259,260&state=&city=&emp=&pg=1&s=-1&top=0";
const PLACEHOLDER: char = '#';

/// ASP.NET board with a GET search page; listing links are site-relative.
pub struct HireLebanese {
    descriptor: SourceDescriptor,
}

impl HireLebanese {
    pub const NAME: &'static str = "hire_lebanese";

    pub fn new() -> Self {
        Self {
            descriptor: SourceDescriptor {
                name: Self::NAME.to_string(),
                base_url: BASE_URL.to_string(),
                search_endpoint: SEARCH_TEMPLATE.to_string(),
                listing_selector: "div.panel-title > h4 > a".to_string(),
                request_headers: BTreeMap::new(),
            },
        }
    }
}

impl Default for HireLebanese {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for HireLebanese {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn build_search_request(&self, title: &str) -> Result<SearchRequest, AdapterError> {
        let template = &self.descriptor.search_endpoint;
        if !template.contains(PLACEHOLDER) {
            return Err(AdapterError::MissingPlaceholder(template.clone()));
        }
        let url = template.replacen(PLACEHOLDER, &form_encode(title), 1);
        parse_url(&url)?;
        Ok(SearchRequest::get(url, self.descriptor.headers_with_defaults()))
    }

    fn extract_posting(&self, page: &str, link: &str, sequence_id: u64) -> Posting {
        let document = Html::parse_document(page);
        Posting {
            sequence_id,
            title: first_text(&document, "div.col-sm-12 > h3 > span.h2").unwrap_or_default(),
            link: link.to_string(),
            description: first_text(
                &document,
                "div.white-div > div.padding-top > div.col-sm-12 > #description",
            )
            .or_else(|| first_text(&document, "#description"))
            .unwrap_or_default(),
            company: first_text(&document, "#company"),
            location: first_text(&document, "#location"),
            date_posted: first_text(&document, "#date"),
        }
    }
}

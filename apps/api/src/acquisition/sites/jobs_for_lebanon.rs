use std::collections::BTreeMap;

use scraper::Html;

use crate::acquisition::adapter::{form_encode, AdapterError, SearchRequest, SiteAdapter};
use crate::acquisition::html::{element_text, first_text, parse_selector};
use crate::models::{Posting, SourceDescriptor};

const BASE_URL: &str = "https://www.jobsforlebanon.com";
const AJAX_ENDPOINT: &str = "https://www.jobsforlebanon.com/wp-admin/admin-ajax.php";
const PAGE_SIZE: &str = "15";

/// WordPress job board searched through its AJAX action; listing links are absolute.
pub struct JobsForLebanon {
    descriptor: SourceDescriptor,
}

impl JobsForLebanon {
    pub const NAME: &'static str = "jobs_for_lebanon";

    pub fn new() -> Self {
        let request_headers = BTreeMap::from([
            ("accept".to_string(), "text/html".to_string()),
            ("origin".to_string(), BASE_URL.to_string()),
            ("x-requested-with".to_string(), "XMLHttpRequest".to_string()),
        ]);
        Self {
            descriptor: SourceDescriptor {
                name: Self::NAME.to_string(),
                base_url: BASE_URL.to_string(),
                search_endpoint: AJAX_ENDPOINT.to_string(),
                listing_selector: "a.catalogue-job-title-text".to_string(),
                request_headers,
            },
        }
    }
}

impl Default for JobsForLebanon {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for JobsForLebanon {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn build_search_request(&self, title: &str) -> Result<SearchRequest, AdapterError> {
        let mut headers = self.descriptor.headers_with_defaults();
        headers.push((
            "referer".to_string(),
            format!("{BASE_URL}/search/?filters=1&terms={}", form_encode(title)),
        ));
        let form = vec![
            ("action".to_string(), "jfh_ajax_get_jobs".to_string()),
            ("offset".to_string(), "0".to_string()),
            ("limit".to_string(), PAGE_SIZE.to_string()),
            ("options[terms]".to_string(), title.to_string()),
        ];
        Ok(SearchRequest::post_form(
            &self.descriptor.search_endpoint,
            headers,
            form,
        ))
    }

    fn extract_posting(&self, page: &str, link: &str, sequence_id: u64) -> Posting {
        let document = Html::parse_document(page);
        Posting {
            sequence_id,
            title: first_text(&document, r#"h1[style="font-weight: bold;"]"#)
                .or_else(|| first_text(&document, "h1"))
                .unwrap_or_default(),
            link: link.to_string(),
            description: section_body(&document, "Job Description").unwrap_or_default(),
            company: first_text(
                &document,
                r#"h2[style="font-size: 1.5rem; font-weight: 600;"]"#,
            ),
            location: first_text(&document, "header.header > div > span"),
            date_posted: None, // not shown on detail pages
        }
    }
}

/// Body of the `<section>` whose `<h3>` heading contains `heading`.
fn section_body(document: &Html, heading: &str) -> Option<String> {
    let sections = parse_selector("section")?;
    let headings = parse_selector("h3")?;
    let body = parse_selector("div > div")?;

    document
        .select(&sections)
        .find(|section| {
            section
                .select(&headings)
                .any(|h| element_text(h).contains(heading))
        })
        .and_then(|section| section.select(&body).next())
        .map(element_text)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::adapter::HttpMethod;

    const DETAIL: &str = r#"
        <html><body>
          <header class="header"><div><span>Beirut</span><span>Full time</span></div></header>
          <h1 style="font-weight: bold;">Senior Rust Engineer</h1>
          <h2 style="font-size: 1.5rem; font-weight: 600;">Cedar Systems</h2>
          <section><h3>About the company</h3><div><div>We build things.</div></div></section>
          <section>
            <h3>Job Description</h3>
            <div><div>Own our   ingestion services.</div></div>
          </section>
        </body></html>
    "#;

    #[test]
    fn test_search_is_form_post_with_escaped_referer() {
        let adapter = JobsForLebanon::new();
        let request = adapter.build_search_request("c# developer").unwrap();

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, AJAX_ENDPOINT);
        assert!(request
            .form
            .contains(&("options[terms]".to_string(), "c# developer".to_string())));
        assert_eq!(
            request.header("referer"),
            Some("https://www.jobsforlebanon.com/search/?filters=1&terms=c%23+developer")
        );
        assert_eq!(request.header("x-requested-with"), Some("XMLHttpRequest"));
        assert!(request.header("user-agent").is_some());
    }

    #[test]
    fn test_listing_links_are_taken_as_absolute() {
        let page = r#"
            <a class="catalogue-job-title-text" href="https://www.jobsforlebanon.com/job/a/">A</a>
            <a class="catalogue-job-title-text" href="https://www.jobsforlebanon.com/job/b/">B</a>
        "#;
        let links = JobsForLebanon::new().extract_listing_links(page);
        assert_eq!(
            links,
            vec![
                "https://www.jobsforlebanon.com/job/a".to_string(),
                "https://www.jobsforlebanon.com/job/b".to_string()
            ]
        );
    }

    #[test]
    fn test_extract_posting_reads_all_fields() {
        let posting = JobsForLebanon::new().extract_posting(DETAIL, "https://x/job/a", 4);
        assert_eq!(posting.sequence_id, 4);
        assert_eq!(posting.title, "Senior Rust Engineer");
        assert_eq!(posting.description, "Own our ingestion services.");
        assert_eq!(posting.company.as_deref(), Some("Cedar Systems"));
        assert_eq!(posting.location.as_deref(), Some("Beirut"));
        assert_eq!(posting.date_posted, None);
    }

    #[test]
    fn test_extract_posting_tolerates_missing_fields() {
        let posting = JobsForLebanon::new().extract_posting("<p>gone</p>", "https://x/job/z", 1);
        assert_eq!(posting.title, "");
        assert_eq!(posting.description, "");
        assert_eq!(posting.company, None);
        assert_eq!(posting.link, "https://x/job/z");
    }
}

//! Acquisition Engine: walks every registered adapter and every title,
//! isolating failures per search and per posting.
//!
//! Iteration is strictly sequential: one request in flight at a time, sites
//! in registration order, titles in request order.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use super::adapter::SiteAdapter;
use super::fetch::PageFetcher;
use super::html::normalize_link;
use super::registry::AdapterRegistry;
use crate::models::Posting;
use crate::progress::{ProgressBus, ProgressStage};

#[derive(Debug, Clone, Default)]
pub struct AcquisitionRequest {
    pub titles: Vec<String>,
    pub request_id: Option<String>,
}

/// State owned by one acquisition run. Never shared between requests.
struct AcquisitionRun {
    next_sequence_id: u64,
    seen_links: HashSet<String>,
    postings: Vec<Posting>,
}

impl AcquisitionRun {
    fn new() -> Self {
        Self {
            next_sequence_id: 1,
            seen_links: HashSet::new(),
            postings: Vec::new(),
        }
    }

    /// True the first time a link (after normalization) shows up in this run.
    fn first_sighting(&mut self, link: &str) -> bool {
        self.seen_links.insert(normalize_link(link))
    }

    fn assign_sequence_id(&mut self) -> u64 {
        let id = self.next_sequence_id;
        self.next_sequence_id += 1;
        id
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct SiteSummary {
    postings: usize,
    failed_searches: usize,
    failed_details: usize,
}

#[derive(Clone)]
pub struct AcquisitionEngine {
    registry: Arc<AdapterRegistry>,
    fetcher: Arc<dyn PageFetcher>,
    bus: ProgressBus,
}

impl AcquisitionEngine {
    pub fn new(registry: Arc<AdapterRegistry>, fetcher: Arc<dyn PageFetcher>, bus: ProgressBus) -> Self {
        Self {
            registry,
            fetcher,
            bus,
        }
    }

    /// Produces the deduplicated postings for every {site × title} pair.
    /// Never fails: unreachable sites and broken pages only shrink the result.
    pub async fn acquire(&self, request: &AcquisitionRequest) -> Vec<Posting> {
        if request.titles.is_empty() || self.registry.is_empty() {
            debug!(
                titles = request.titles.len(),
                sites = self.registry.len(),
                "Nothing to acquire"
            );
            return Vec::new();
        }

        let mut run = AcquisitionRun::new();
        for adapter in self.registry.iter() {
            let summary = self.acquire_site(adapter.as_ref(), request, &mut run).await;
            info!(
                site = adapter.name(),
                postings = summary.postings,
                failed_searches = summary.failed_searches,
                failed_details = summary.failed_details,
                "Site acquisition finished"
            );
        }
        run.postings
    }

    async fn acquire_site(
        &self,
        adapter: &dyn SiteAdapter,
        request: &AcquisitionRequest,
        run: &mut AcquisitionRun,
    ) -> SiteSummary {
        let site = adapter.name();
        let request_id = request.request_id.as_deref();
        let before = run.postings.len();
        let mut summary = SiteSummary::default();

        self.bus.emit(
            request_id,
            ProgressStage::ScrapingSite,
            format!("Searching {site}"),
            Some(json!({ "site": site, "titles": request.titles })),
        );

        for title in &request.titles {
            let listing = match adapter.build_search_request(title) {
                Ok(search) => self.fetcher.fetch(&search).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            let listing = match listing {
                Ok(page) => page,
                Err(error) => {
                    summary.failed_searches += 1;
                    warn!(site, title = %title, "Search failed: {error}");
                    self.bus.emit(
                        request_id,
                        ProgressStage::ScrapingError,
                        format!("Search for '{title}' on {site} failed"),
                        Some(json!({ "site": site, "title": title, "error": error })),
                    );
                    continue;
                }
            };

            let links = adapter.extract_listing_links(&listing);
            let found = links.len();
            let fresh: Vec<String> = links
                .into_iter()
                .filter(|link| run.first_sighting(link))
                .collect();
            debug!(site, title = %title, found, fresh = fresh.len(), "Listing parsed");

            for link in fresh {
                match self.fetcher.fetch(&adapter.detail_request(&link)).await {
                    Ok(detail) => {
                        let sequence_id = run.assign_sequence_id();
                        run.postings
                            .push(adapter.extract_posting(&detail, &link, sequence_id));
                    }
                    Err(e) => {
                        summary.failed_details += 1;
                        warn!(site, link = %link, "Dropping posting: {e}");
                    }
                }
            }
        }

        summary.postings = run.postings.len() - before;
        self.bus.emit(
            request_id,
            ProgressStage::ScrapingSiteComplete,
            format!("Finished {site}: {} postings", summary.postings),
            Some(json!({
                "site": site,
                "postings": summary.postings,
                "failedSearches": summary.failed_searches,
                "failedDetails": summary.failed_details,
            })),
        );
        summary
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned-page fetcher and a minimal template site for engine and pipeline tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::acquisition::adapter::SearchRequest;
    use crate::acquisition::fetch::{FetchError, PageFetcher};
    use crate::acquisition::sites::{TemplateAdapter, TemplateSource};

    /// Serves pages by exact URL; anything else answers 404.
    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        failing: HashMap<String, u16>,
        pub requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        pub fn failing(mut self, url: &str, status: u16) -> Self {
            self.failing.insert(url.to_string(), status);
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, request: &SearchRequest) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(request.url.clone());
            if let Some(status) = self.failing.get(&request.url) {
                return Err(FetchError::Status {
                    url: request.url.clone(),
                    status: *status,
                });
            }
            self.pages
                .get(&request.url)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: request.url.clone(),
                    status: 404,
                })
        }
    }

    /// Site searched at `https://<host>/search?q=<title>` whose listing anchors are `a.job`.
    pub fn site(name: &str, host: &str) -> TemplateAdapter {
        let source: TemplateSource = serde_json::from_value(serde_json::json!({
            "name": name,
            "baseUrl": format!("https://{host}"),
            "searchEndpoint": format!("https://{host}/search?q={{title}}"),
            "listingSelector": "a.job"
        }))
        .unwrap();
        TemplateAdapter::new(source)
    }

    pub fn listing(hrefs: &[&str]) -> String {
        hrefs
            .iter()
            .map(|h| format!(r#"<a class="job" href="{h}">job</a>"#))
            .collect()
    }

    pub fn detail(title: &str) -> String {
        format!("<h1>{title}</h1><main>About {title}</main>")
    }
}

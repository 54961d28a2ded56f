// Collector module.
// Defines the trait every job source implements, the pagination wrapper for
// API adapters and the registry the orchestrator is built from.

pub mod adzuna;
pub mod indeed;
pub mod internshala;
pub mod jooble;
pub mod jsearch;
pub mod runner;
pub mod scrape;
pub mod timesjobs;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::collectors::scrape::browser::{BrowserError, BrowserLauncher};
use crate::collectors::scrape::{Pacing, ScrapeTimeouts, ScrapeWorker};
use crate::models::job::{CanonicalJob, Source};

/// What the orchestrator asks each source for. `location` has already been
/// localised for the receiving source.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    pub max_pages: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("browser: {0}")]
    Browser(#[from] BrowserError),

    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector {
        selector: &'static str,
        message: String,
    },

    #[error("invalid base url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Trait that all job sources implement.
/// A collector either returns validated canonical records or fails the whole
/// source; partial failures inside a run are its own business.
#[async_trait]
pub trait JobCollector: Send + Sync {
    fn source(&self) -> Source;

    async fn collect(&self, request: &SearchRequest) -> Result<Vec<CanonicalJob>, CollectError>;
}

/// One page of results from a structured API.
#[derive(Debug, Default)]
pub struct ApiPage {
    pub jobs: Vec<CanonicalJob>,
    /// Total matches reported upstream, 0 when the API does not say.
    pub total: u64,
}

impl ApiPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A structured API source. `fetch` never fails: missing credentials and
/// transport or decoding errors are logged and yield an empty page.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Upper bound on pages requested in one run.
    fn page_cap(&self) -> u32;

    async fn fetch(&self, query: &str, location: &str, page: u32) -> ApiPage;
}

/// Drives a [`SourceAdapter`] page by page as a [`JobCollector`].
pub struct ApiCollector<A> {
    adapter: A,
}

impl<A: SourceAdapter> ApiCollector<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl<A: SourceAdapter> JobCollector for ApiCollector<A> {
    fn source(&self) -> Source {
        self.adapter.source()
    }

    async fn collect(&self, request: &SearchRequest) -> Result<Vec<CanonicalJob>, CollectError> {
        let pages = request.max_pages.clamp(1, self.adapter.page_cap());
        let mut jobs = Vec::new();

        for page in 1..=pages {
            let ApiPage {
                jobs: page_jobs,
                total,
            } = self
                .adapter
                .fetch(&request.query, &request.location, page)
                .await;
            if page_jobs.is_empty() {
                break;
            }
            jobs.extend(page_jobs);
            if total > 0 && jobs.len() as u64 >= total {
                break;
            }
        }

        info!(source = %self.source(), jobs = jobs.len(), "API fetch finished");
        Ok(jobs)
    }
}

#[derive(Debug, Clone)]
pub struct AdzunaCredentials {
    pub app_id: String,
    pub app_key: String,
}

/// Everything needed to build the full set of collectors.
#[derive(Clone)]
pub struct CollectorSettings {
    pub adzuna: Option<AdzunaCredentials>,
    pub rapid_api_key: Option<String>,
    pub jooble_api_key: Option<String>,
    pub pacing: Pacing,
    pub timeouts: ScrapeTimeouts,
    pub launcher: Arc<dyn BrowserLauncher>,
}

/// Build one collector per known source.
pub fn build_collectors(
    settings: &CollectorSettings,
) -> Result<Vec<Arc<dyn JobCollector>>, reqwest::Error> {
    let scrape_worker = |site| -> Arc<dyn JobCollector> {
        Arc::new(ScrapeWorker::new(
            site,
            settings.launcher.clone(),
            settings.pacing.clone(),
            settings.timeouts.clone(),
        ))
    };

    let collectors: Vec<Arc<dyn JobCollector>> = vec![
        Arc::new(ApiCollector::new(adzuna::Adzuna::new(
            settings.adzuna.clone(),
        )?)),
        Arc::new(ApiCollector::new(jsearch::JSearch::new(
            settings.rapid_api_key.clone(),
        )?)),
        Arc::new(ApiCollector::new(jooble::Jooble::new(
            settings.jooble_api_key.clone(),
        )?)),
        scrape_worker(indeed::site()),
        scrape_worker(internshala::site()),
        scrape_worker(timesjobs::site()),
    ];
    Ok(collectors)
}

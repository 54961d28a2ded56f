// Browser-driven scrape workers.
// A site is described declaratively by a `SiteProfile`; `ScrapeWorker` runs
// the shared page loop over one browser session.

pub mod browser;
pub mod extract;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::Rng;
use tracing::{info, warn};
use url::Url;

use crate::collectors::scrape::browser::{BrowserError, BrowserLauncher, BrowserSession};
use crate::collectors::scrape::extract::{CompiledSite, ExtractedCard, FieldChains};
use crate::collectors::{CollectError, JobCollector, SearchRequest};
use crate::models::job::{CanonicalJob, Source};
use crate::normalize::{self, RawJob, SNIPPET_CHARS};

/// Characters that encodeURIComponent does NOT encode.
/// RFC 3986 unreserved: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const ENCODE_URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URL-encode a string for use in query parameters.
pub fn urlencoded(s: &str) -> String {
    utf8_percent_encode(s, ENCODE_URI_COMPONENT_SET).to_string()
}

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub max_pages: u32,
    pub keyword: String,
    pub location: String,
}

impl From<&SearchRequest> for ScrapeOptions {
    fn from(request: &SearchRequest) -> Self {
        Self {
            max_pages: request.max_pages,
            keyword: request.query.clone(),
            location: request.location.clone(),
        }
    }
}

/// Randomized delay between consecutive result pages.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(3000),
            max: Duration::from_millis(6000),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Uniform draw from `[min, max]`.
    pub fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if max <= min {
            return self.min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeTimeouts {
    pub navigation: Duration,
    pub selector: Duration,
}

impl Default for ScrapeTimeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            selector: Duration::from_secs(15),
        }
    }
}

/// Everything that differs between scraped sites.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub source: Source,
    pub base_url: &'static str,
    /// Content that must be present before a page is extracted.
    pub wait_selector: &'static str,
    pub card_selector: &'static str,
    pub fields: FieldChains,
    /// Search URL for a zero-based page index.
    pub page_url: fn(&str, &ScrapeOptions, u32) -> String,
    pub location_fallback: Option<&'static str>,
    pub experience_fallback: Option<&'static str>,
    /// Employment type derived from the card title.
    pub job_type: fn(&str) -> &'static str,
}

pub struct ScrapeWorker {
    site: SiteProfile,
    base_url: String,
    launcher: Arc<dyn BrowserLauncher>,
    pacing: Pacing,
    timeouts: ScrapeTimeouts,
}

impl ScrapeWorker {
    pub fn new(
        site: SiteProfile,
        launcher: Arc<dyn BrowserLauncher>,
        pacing: Pacing,
        timeouts: ScrapeTimeouts,
    ) -> Self {
        Self {
            base_url: site.base_url.to_string(),
            site,
            launcher,
            pacing,
            timeouts,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Scrape up to `options.max_pages` result pages over one session.
    ///
    /// Only setup failures (bad selectors, bad base URL, no session) fail
    /// the run. A page that cannot be loaded or extracted is logged and
    /// skipped.
    pub async fn scrape(&self, options: &ScrapeOptions) -> Result<Vec<CanonicalJob>, CollectError> {
        let source = self.site.source;
        let compiled = CompiledSite::compile(&self.site)?;
        let base = Url::parse(&self.base_url).map_err(|e| CollectError::InvalidUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })?;
        let pages = options.max_pages.max(1);

        info!(
            source = %source,
            keyword = %options.keyword,
            location = %options.location,
            pages,
            "starting scrape"
        );

        let mut session = self.launcher.launch().await?;
        let mut jobs = Vec::new();

        for page in 0..pages {
            let url = (self.site.page_url)(&self.base_url, options, page);
            match self.scrape_page(session.as_mut(), &compiled, &base, &url).await {
                Ok(page_jobs) => {
                    info!(source = %source, page = page + 1, jobs = page_jobs.len(), "page scraped");
                    jobs.extend(page_jobs);
                }
                Err(e) => {
                    warn!(source = %source, page = page + 1, url = %url, error = %e, "page failed, skipping");
                }
            }

            if page + 1 < pages {
                self.pacing.pause().await;
            }
        }

        session.close().await;
        info!(source = %source, jobs = jobs.len(), "scrape finished");
        Ok(jobs)
    }

    async fn scrape_page(
        &self,
        session: &mut dyn BrowserSession,
        compiled: &CompiledSite,
        base: &Url,
        url: &str,
    ) -> Result<Vec<CanonicalJob>, BrowserError> {
        session.goto(url, self.timeouts.navigation).await?;
        session
            .wait_for_selector(self.site.wait_selector, self.timeouts.selector)
            .await?;
        let html = session.content().await?;

        let today = normalize::today();
        Ok(compiled
            .extract(&html)
            .into_iter()
            .map(|card| self.to_canonical(card, base, today))
            .filter(normalize::is_valid)
            .collect())
    }

    fn to_canonical(&self, card: ExtractedCard, base: &Url, today: NaiveDate) -> CanonicalJob {
        let job_type = (self.site.job_type)(&card.title);
        RawJob {
            title: Some(card.title),
            company: Some(card.company),
            location: card
                .location
                .or_else(|| self.site.location_fallback.map(String::from)),
            salary: card.salary,
            experience: card
                .experience
                .or_else(|| self.site.experience_fallback.map(String::from)),
            job_type: Some(job_type.to_string()),
            apply_link: card
                .link
                .and_then(|href| normalize::resolve_link(base, &href)),
            description: card
                .description
                .map(|d| normalize::truncate_snippet(&d, SNIPPET_CHARS)),
            posted: None,
        }
        .normalize(self.site.source, today)
    }
}

#[async_trait]
impl JobCollector for ScrapeWorker {
    fn source(&self) -> Source {
        self.site.source
    }

    async fn collect(&self, request: &SearchRequest) -> Result<Vec<CanonicalJob>, CollectError> {
        self.scrape(&ScrapeOptions::from(request)).await
    }
}

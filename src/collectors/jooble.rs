use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::collectors::{ApiPage, SourceAdapter};
use crate::models::job::{CanonicalJob, Source};
use crate::normalize::{self, RawJob};

const BASE_URL: &str = "https://jooble.org/api";
const PAGE_CAP: u32 = 5;
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct Jooble {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct JoobleRequest<'a> {
    keywords: &'a str,
    location: &'a str,
    page: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoobleResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    jobs: Vec<JoobleJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JoobleJob {
    title: Option<String>,
    location: Option<String>,
    snippet: Option<String>,
    salary: Option<String>,
    company: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    link: Option<String>,
    updated: Option<String>,
}

impl Jooble {
    pub fn new(api_key: Option<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request(
        &self,
        api_key: &str,
        query: &str,
        location: &str,
        page: u32,
    ) -> reqwest::Result<JoobleResponse> {
        let body = JoobleRequest {
            keywords: query,
            location,
            page: page.to_string(),
        };
        self.client
            .post(format!("{}/{api_key}", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl SourceAdapter for Jooble {
    fn source(&self) -> Source {
        Source::Jooble
    }

    fn page_cap(&self) -> u32 {
        PAGE_CAP
    }

    async fn fetch(&self, query: &str, location: &str, page: u32) -> ApiPage {
        let Some(api_key) = &self.api_key else {
            warn!(source = %Source::Jooble, "API key not configured");
            return ApiPage::empty();
        };

        let response = match self.request(api_key, query, location, page).await {
            Ok(r) => r,
            Err(e) => {
                error!(source = %Source::Jooble, page, error = %e, "API request failed");
                return ApiPage::empty();
            }
        };

        let today = normalize::today();
        let jobs: Vec<CanonicalJob> = response
            .jobs
            .into_iter()
            .map(|job| to_canonical(job, today))
            .filter(normalize::is_valid)
            .collect();

        ApiPage {
            total: if jobs.is_empty() { 0 } else { response.total_count },
            jobs,
        }
    }
}

fn to_canonical(job: JoobleJob, today: NaiveDate) -> CanonicalJob {
    RawJob {
        title: job.title,
        company: job.company,
        location: job.location,
        salary: Some(format_salary(job.salary.as_deref())),
        experience: None,
        job_type: job.kind,
        apply_link: job.link,
        description: job.snippet,
        posted: job.updated,
    }
    .normalize(Source::Jooble, today)
}

fn rupee_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\binr\b|\brupees?\b").expect("rupee pattern is valid"))
}

/// Jooble salaries are free text. Keep them as given, except that INR and
/// "rupee(s)" are rendered with the ₹ symbol.
fn format_salary(raw: Option<&str>) -> String {
    let cleaned = normalize::clean_text(raw.unwrap_or_default());
    if cleaned.is_empty() {
        return normalize::NOT_DISCLOSED.to_string();
    }
    if ['$', '£', '€', '₹'].iter().any(|symbol| cleaned.contains(*symbol)) {
        return cleaned;
    }
    let lower = cleaned.to_lowercase();
    let is_rupees = ["inr", "rupee", "lakh", "lpa"]
        .iter()
        .any(|word| lower.contains(word));
    if is_rupees && cleaned.chars().any(|c| c.is_ascii_digit()) {
        return rupee_pattern().replace_all(&cleaned, "₹").into_owned();
    }
    cleaned
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{error, warn};

use crate::collectors::{AdzunaCredentials, ApiPage, SourceAdapter};
use crate::models::job::{CanonicalJob, Source};
use crate::normalize::{self, RawJob};

const BASE_URL: &str = "https://api.adzuna.com/v1/api/jobs";
const RESULTS_PER_PAGE: u32 = 50;
const PAGE_CAP: u32 = 5;
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct Adzuna {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<AdzunaCredentials>,
}

#[derive(Debug, Deserialize)]
struct AdzunaResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdzunaJob {
    title: Option<String>,
    company: Option<DisplayName>,
    location: Option<AdzunaLocation>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    contract_time: Option<String>,
    contract_type: Option<String>,
    description: Option<String>,
    redirect_url: Option<String>,
    created: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DisplayName {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdzunaLocation {
    display_name: Option<String>,
    area: Vec<String>,
}

impl Adzuna {
    pub fn new(credentials: Option<AdzunaCredentials>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            credentials,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request(
        &self,
        credentials: &AdzunaCredentials,
        query: &str,
        country: &str,
        page: u32,
    ) -> reqwest::Result<AdzunaResponse> {
        let url = format!("{}/{country}/search/{page}", self.base_url);
        let per_page = RESULTS_PER_PAGE.to_string();
        self.client
            .get(&url)
            .query(&[
                ("app_id", credentials.app_id.as_str()),
                ("app_key", credentials.app_key.as_str()),
                ("results_per_page", per_page.as_str()),
                ("what", query),
                ("content-type", "application/json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl SourceAdapter for Adzuna {
    fn source(&self) -> Source {
        Source::Adzuna
    }

    fn page_cap(&self) -> u32 {
        PAGE_CAP
    }

    /// `location` is an Adzuna country code (see [`country_code`]).
    async fn fetch(&self, query: &str, location: &str, page: u32) -> ApiPage {
        let Some(credentials) = &self.credentials else {
            warn!(source = %Source::Adzuna, "API credentials not configured");
            return ApiPage::empty();
        };

        let response = match self.request(credentials, query, location, page).await {
            Ok(r) => r,
            Err(e) => {
                error!(source = %Source::Adzuna, page, error = %e, "API request failed");
                return ApiPage::empty();
            }
        };

        let currency = currency_for(location);
        let today = normalize::today();
        let jobs = response
            .results
            .into_iter()
            .map(|job| to_canonical(job, currency, today))
            .filter(normalize::is_valid)
            .collect();

        ApiPage {
            jobs,
            total: response.count,
        }
    }
}

fn to_canonical(job: AdzunaJob, currency: &str, today: NaiveDate) -> CanonicalJob {
    let location = job.location.unwrap_or_default();
    RawJob {
        title: job.title,
        company: job.company.and_then(|c| c.display_name),
        location: location
            .display_name
            .filter(|l| !l.trim().is_empty())
            .or_else(|| location.area.into_iter().next()),
        salary: Some(normalize::format_salary(
            job.salary_min,
            job.salary_max,
            currency,
        )),
        experience: None,
        job_type: job.contract_time.or(job.contract_type),
        apply_link: job.redirect_url,
        description: job.description,
        posted: job.created,
    }
    .normalize(Source::Adzuna, today)
}

/// Map a free-text location onto the country code Adzuna routes by.
/// Unknown locations default to India.
pub fn country_code(location: &str) -> &'static str {
    let lower = location.to_lowercase();
    let has_word = |word: &str| {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == word)
    };

    if lower.contains("india") {
        "in"
    } else if lower.contains("united states") || has_word("usa") || has_word("us") {
        "us"
    } else if lower.contains("united kingdom") || has_word("uk") || has_word("gb") {
        "gb"
    } else if lower.contains("canada") {
        "ca"
    } else if lower.contains("australia") {
        "au"
    } else if lower.contains("germany") {
        "de"
    } else if lower.contains("france") {
        "fr"
    } else if lower.contains("netherlands") {
        "nl"
    } else if lower.contains("singapore") {
        "sg"
    } else {
        "in"
    }
}

/// Currency Adzuna reports salaries in for a given country code.
pub fn currency_for(country: &str) -> &'static str {
    match country {
        "in" => "INR",
        "gb" => "GBP",
        "de" | "fr" | "nl" => "EUR",
        "ca" => "CAD",
        "au" => "AUD",
        "sg" => "SGD",
        _ => "USD",
    }
}

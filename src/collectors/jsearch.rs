use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{error, warn};

use crate::collectors::{ApiPage, SourceAdapter};
use crate::models::job::{CanonicalJob, Source};
use crate::normalize::{self, RawJob};

const BASE_URL: &str = "https://jsearch.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "jsearch.p.rapidapi.com";
const PAGE_CAP: u32 = 3;
const TIMEOUT: Duration = Duration::from_secs(15);

pub struct JSearch {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl JSearch {
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
    ) -> reqwest::Result<Value> {
        let search = format!("{query} in {location}");
        let page = page.to_string();
        self.client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("query", search.as_str()),
                ("page", page.as_str()),
                ("num_pages", "1"),
            ])
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl SourceAdapter for JSearch {
    fn source(&self) -> Source {
        Source::JSearch
    }

    fn page_cap(&self) -> u32 {
        PAGE_CAP
    }

    async fn fetch(&self, query: &str, location: &str, page: u32) -> ApiPage {
        let Some(api_key) = &self.api_key else {
            warn!(source = %Source::JSearch, "RapidAPI key not configured");
            return ApiPage::empty();
        };

        let data = match self.request(api_key, query, location, page).await {
            Ok(d) => d,
            Err(e) => {
                error!(source = %Source::JSearch, page, error = %e, "API request failed");
                return ApiPage::empty();
            }
        };

        if data.get("status").and_then(|v| v.as_str()) != Some("OK") {
            warn!(source = %Source::JSearch, page, "API returned non-OK status");
            return ApiPage::empty();
        }

        let today = normalize::today();
        let jobs = data
            .get("data")
            .and_then(|v| v.as_array())
            .map(|results| {
                results
                    .iter()
                    .map(|raw| parse_job(raw, today))
                    .filter(normalize::is_valid)
                    .collect()
            })
            .unwrap_or_default();

        // JSearch does not report a total; paging stops on the first empty page.
        ApiPage { jobs, total: 0 }
    }
}

fn text(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn parse_job(raw: &Value, today: NaiveDate) -> CanonicalJob {
    let location: Vec<String> = ["job_city", "job_state", "job_country"]
        .iter()
        .filter_map(|key| text(raw, key))
        .filter(|part| !part.trim().is_empty())
        .collect();

    let currency = text(raw, "job_salary_currency").unwrap_or_else(|| "USD".to_string());
    let salary = normalize::format_salary(
        raw.get("job_min_salary").and_then(|v| v.as_f64()),
        raw.get("job_max_salary").and_then(|v| v.as_f64()),
        &currency,
    );

    let months = raw
        .get("job_required_experience")
        .and_then(|e| e.get("required_experience_in_months"))
        .and_then(|v| v.as_u64())
        .and_then(|m| u32::try_from(m).ok());

    RawJob {
        title: text(raw, "job_title"),
        company: text(raw, "employer_name"),
        location: (!location.is_empty()).then(|| location.join(", ")),
        salary: Some(salary),
        experience: Some(normalize::format_experience_months(months)),
        job_type: text(raw, "job_employment_type"),
        apply_link: text(raw, "job_apply_link"),
        description: text(raw, "job_description"),
        posted: text(raw, "job_posted_at_datetime_utc"),
    }
    .normalize(Source::JSearch, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    use crate::models::job::JobType;

    #[tokio::test]
    async fn maps_search_results() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "status": "OK",
            "request_id": "abc",
            "data": [
                {
                    "job_id": "1",
                    "job_title": "Platform Engineer",
                    "employer_name": "Initech",
                    "job_city": "Pune",
                    "job_state": "MH",
                    "job_country": "IN",
                    "job_employment_type": "CONTRACTOR",
                    "job_min_salary": null,
                    "job_max_salary": 90000,
                    "job_salary_currency": "USD",
                    "job_required_experience": { "required_experience_in_months": 30 },
                    "job_description": "Build platforms",
                    "job_apply_link": "https://careers.initech.example/apply/1",
                    "job_posted_at_datetime_utc": "2024-04-10T00:00:00.000Z"
                },
                {
                    "job_id": "2",
                    "job_title": "Intern",
                    "employer_name": "",
                    "job_employment_type": "INTERN",
                    "job_apply_link": "https://careers.example/2",
                    "job_posted_at_datetime_utc": null
                }
            ]
        });
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "rust in India".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .match_header("x-rapidapi-key", "secret")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let adapter = JSearch::new(Some("secret".into()))
            .unwrap()
            .with_base_url(server.url());
        let page = adapter.fetch("rust", "India", 2).await;

        assert_eq!(page.jobs.len(), 2);
        let first = &page.jobs[0];
        assert_eq!(first.location, "Pune, MH, IN");
        assert_eq!(first.salary, "Up to $90,000");
        assert_eq!(first.experience, "2-3 years");
        assert_eq!(first.job_type, JobType::Contract);
        assert_eq!(first.posted_date, NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());

        let second = &page.jobs[1];
        assert_eq!(second.company, normalize::COMPANY_NOT_LISTED);
        assert_eq!(second.location, normalize::NOT_SPECIFIED);
        assert_eq!(second.job_type, JobType::Internship);
    }

    #[tokio::test]
    async fn non_ok_status_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"ERROR","data":[]}"#)
            .create_async()
            .await;

        let adapter = JSearch::new(Some("secret".into()))
            .unwrap()
            .with_base_url(server.url());
        assert!(adapter.fetch("rust", "India", 1).await.jobs.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_empty() {
        let adapter = JSearch::new(None).unwrap();
        let page = adapter.fetch("rust", "India", 1).await;
        assert!(page.jobs.is_empty());
    }
}

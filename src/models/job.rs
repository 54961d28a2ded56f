use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of employment types every source is mapped onto.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[default]
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    Internship,
    Temporary,
    Freelance,
    Other,
}

impl JobType {
    pub const ALL: [JobType; 7] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Internship,
        JobType::Temporary,
        JobType::Freelance,
        JobType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
            JobType::Contract => "Contract",
            JobType::Internship => "Internship",
            JobType::Temporary => "Temporary",
            JobType::Freelance => "Freelance",
            JobType::Other => "Other",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    /// Exact parse of a stored value. Use `normalize::normalize_job_type`
    /// for free-form upstream vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown job type '{s}'"))
    }
}

/// Origin of a record. One tag per adapter or scrape worker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Source {
    Adzuna,
    #[serde(rename = "JSearch")]
    JSearch,
    Jooble,
    Indeed,
    Internshala,
    #[serde(rename = "TimesJobs")]
    TimesJobs,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::Adzuna,
        Source::JSearch,
        Source::Jooble,
        Source::Indeed,
        Source::Internshala,
        Source::TimesJobs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Adzuna => "Adzuna",
            Source::JSearch => "JSearch",
            Source::Jooble => "Jooble",
            Source::Indeed => "Indeed",
            Source::Internshala => "Internshala",
            Source::TimesJobs => "TimesJobs",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Source::ALL
            .into_iter()
            .find(|src| src.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown source '{needle}'"))
    }
}

/// The uniform record every adapter and scrape worker emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub experience: String,
    pub job_type: JobType,
    pub source: Source,
    pub apply_link: String,
    pub description: String,
    pub posted_date: NaiveDate,
}

impl CanonicalJob {
    /// The store's uniqueness key.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            title: self.title.clone(),
            company: self.company.clone(),
            location: self.location.clone(),
        }
    }
}

/// (title, company, location), matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DedupKey {
    pub title: String,
    pub company: String,
    pub location: String,
}

/// A persisted job as returned by the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredJob {
    pub id: i64,
    #[serde(flatten)]
    pub job: CanonicalJob,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    pub search: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub job_type: Option<JobType>,
    pub source: Option<Source>,
    /// Matched literally against the salary text.
    pub min_salary: Option<String>,
    pub sort: Option<JobSort>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl JobFilter {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    /// Saturates for absurd page numbers; such a page is simply empty.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn sort(&self) -> JobSort {
        self.sort.unwrap_or_default()
    }
}

/// Columns a listing can be ordered by.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    PostedDate,
    Title,
    Company,
    Location,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::PostedDate,
        SortField::Title,
        SortField::Company,
        SortField::Location,
    ];

    /// Name used in the `sort` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::PostedDate => "postedDate",
            SortField::Title => "title",
            SortField::Company => "company",
            SortField::Location => "location",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::PostedDate => "posted_date",
            SortField::Title => "title",
            SortField::Company => "company",
            SortField::Location => "location",
        }
    }
}

/// Listing order written as `field` or `-field` (descending).
/// Defaults to `-createdAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct JobSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for JobSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for JobSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, descending) = match s.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (s.strip_prefix('+').unwrap_or(s), false),
        };
        let field = SortField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("unknown sort field '{name}'"))?;
        Ok(Self { field, descending })
    }
}

impl TryFrom<String> for JobSort {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(filter: &JobFilter, total: i64) -> Self {
        let page = filter.page();
        let limit = filter.limit();
        let total_pages = (total + limit - 1) / limit;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobPage {
    pub data: Vec<StoredJob>,
    pub pagination: Pagination,
}

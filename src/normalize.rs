// Shared field normalization used by every adapter and scrape worker.
// Everything here is pure: no I/O, and the current date is passed in by the
// caller.

use std::sync::OnceLock;

use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use url::Url;

use crate::models::job::{CanonicalJob, JobType, Source};

pub const NOT_SPECIFIED: &str = "Not specified";
pub const NOT_DISCLOSED: &str = "Not disclosed";
pub const COMPANY_NOT_LISTED: &str = "Company not listed";

/// Maximum length, in characters, of a scraped description snippet.
pub const SNIPPET_CHARS: usize = 200;

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleaned value, or `sentinel` when the value is missing or blank.
pub fn or_sentinel(value: Option<&str>, sentinel: &str) -> String {
    match value.map(clean_text) {
        Some(v) if !v.is_empty() => v,
        _ => sentinel.to_string(),
    }
}

/// Map free-form employment vocabulary onto the closed [`JobType`] set.
///
/// Matching is keyword based on a lowercase, punctuation-free form so that
/// `FULL_TIME`, `Full-time` and `fulltime` all agree. Unrecognized or blank
/// input maps to Full-time; only an explicit "other" yields [`JobType::Other`].
pub fn normalize_job_type(raw: Option<&str>) -> JobType {
    let Some(raw) = raw else {
        return JobType::FullTime;
    };
    let compact: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();

    if compact.contains("full") || compact.contains("permanent") {
        JobType::FullTime
    } else if compact.contains("part") {
        JobType::PartTime
    } else if compact.contains("contract") {
        JobType::Contract
    } else if compact.contains("intern") {
        JobType::Internship
    } else if compact.contains("temp") {
        JobType::Temporary
    } else if compact.contains("freelance") {
        JobType::Freelance
    } else if compact == "other" {
        JobType::Other
    } else {
        JobType::FullTime
    }
}

pub fn normalize_salary(raw: Option<&str>) -> String {
    let cleaned = raw.map(clean_text).unwrap_or_default();
    let lower = cleaned.to_lowercase();
    if cleaned.is_empty() || lower.contains("not disclosed") || lower.contains("negotiable") {
        NOT_DISCLOSED.to_string()
    } else {
        cleaned
    }
}

pub fn normalize_experience(raw: Option<&str>) -> String {
    let cleaned = raw.map(clean_text).unwrap_or_default();
    if cleaned.is_empty() || cleaned.to_lowercase().contains("not specified") {
        NOT_SPECIFIED.to_string()
    } else {
        cleaned
    }
}

/// Display symbol for an ISO currency code. Unknown codes are rendered as the
/// code followed by a space.
pub fn currency_symbol(code: &str) -> String {
    match code.trim().to_uppercase().as_str() {
        "" | "USD" => "$".to_string(),
        "GBP" => "£".to_string(),
        "EUR" => "€".to_string(),
        "INR" => "₹".to_string(),
        "CAD" => "C$".to_string(),
        "AUD" => "A$".to_string(),
        "SGD" => "S$".to_string(),
        other => format!("{other} "),
    }
}

/// Render a salary range. Non-positive bounds count as absent.
pub fn format_salary(min: Option<f64>, max: Option<f64>, currency: &str) -> String {
    let positive = |v: Option<f64>| v.filter(|n| n.is_finite() && *n > 0.0);
    let symbol = currency_symbol(currency);
    let amount = |n: f64| format!("{symbol}{}", group_thousands(n.round() as u64));

    match (positive(min), positive(max)) {
        (Some(lo), Some(hi)) => format!("{} - {}", amount(lo), amount(hi)),
        (Some(lo), None) => format!("From {}", amount(lo)),
        (None, Some(hi)) => format!("Up to {}", amount(hi)),
        (None, None) => NOT_DISCLOSED.to_string(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Human-readable experience requirement from a month count.
pub fn format_experience_months(months: Option<u32>) -> String {
    let months = match months {
        Some(m) if m > 0 => m,
        _ => return NOT_SPECIFIED.to_string(),
    };
    let years = months / 12;
    let rest = months % 12;
    match (years, rest) {
        (0, m) => format!("{m} months"),
        (1, 0) => "1 year".to_string(),
        (y, 0) => format!("{y} years"),
        (y, _) => format!("{y}-{} years", y + 1),
    }
}

fn relative_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\+?\s*(minute|min|hour|hr|day|week|month)s?\s+ago")
            .expect("relative date pattern is valid")
    })
}

/// Parse an upstream posting date into a calendar date.
///
/// Accepts RFC 3339 timestamps, naive ISO timestamps, plain `YYYY-MM-DD`
/// dates and relative phrases ("3 days ago", "today", "yesterday"). Anything
/// else, including a missing value, resolves to `today`.
pub fn parse_posted_date(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return today;
    };
    let lower = raw.to_lowercase();

    if lower.contains("today") || lower.contains("just") {
        return today;
    }
    if lower.contains("yesterday") {
        return today.checked_sub_days(Days::new(1)).unwrap_or(today);
    }

    if let Some(caps) = relative_date_pattern().captures(raw) {
        let n: u64 = caps[1].parse().unwrap_or(0);
        let unit = caps[2].to_lowercase();
        let date = match unit.as_str() {
            "day" => today.checked_sub_days(Days::new(n)),
            "week" => today.checked_sub_days(Days::new(n.saturating_mul(7))),
            "month" => u32::try_from(n)
                .ok()
                .and_then(|m| today.checked_sub_months(Months::new(m))),
            _ => Some(today),
        };
        return date.unwrap_or(today);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc).date_naive();
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return ts.date();
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .unwrap_or(today)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Resolve a possibly relative link against a source's base URL.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href == "#" {
        return None;
    }
    base.join(href)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(String::from)
}

/// Clean text and cut it to at most `max_chars` characters.
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let cleaned = clean_text(text);
    match cleaned.char_indices().nth(max_chars) {
        Some((idx, _)) => cleaned[..idx].trim_end().to_string(),
        None => cleaned,
    }
}

/// A record may be stored only when every required field is present.
pub fn is_valid(job: &CanonicalJob) -> bool {
    [&job.title, &job.company, &job.location, &job.apply_link]
        .iter()
        .all(|field| !field.trim().is_empty())
        && !job.source.as_str().is_empty()
}

/// Raw fields as extracted from one upstream record, before normalization.
#[derive(Debug, Default, Clone)]
pub struct RawJob {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub experience: Option<String>,
    pub job_type: Option<String>,
    pub apply_link: Option<String>,
    pub description: Option<String>,
    pub posted: Option<String>,
}

impl RawJob {
    /// Route every field through the shared rules.
    ///
    /// Company and location fall back to sentinels; title and apply link do
    /// not, so a record missing either fails [`is_valid`].
    pub fn normalize(self, source: Source, today: NaiveDate) -> CanonicalJob {
        CanonicalJob {
            title: self.title.as_deref().map(clean_text).unwrap_or_default(),
            company: or_sentinel(self.company.as_deref(), COMPANY_NOT_LISTED),
            location: or_sentinel(self.location.as_deref(), NOT_SPECIFIED),
            salary: normalize_salary(self.salary.as_deref()),
            experience: normalize_experience(self.experience.as_deref()),
            job_type: normalize_job_type(self.job_type.as_deref()),
            source,
            apply_link: self
                .apply_link
                .map(|l| l.trim().to_string())
                .unwrap_or_default(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            posted_date: parse_posted_date(self.posted.as_deref(), today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Senior \n\t Rust   Dev  "), "Senior Rust Dev");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn job_type_keywords_map_to_closed_set() {
        let cases = [
            ("Full_Time", JobType::FullTime),
            ("FULLTIME", JobType::FullTime),
            ("Permanent", JobType::FullTime),
            ("part-time", JobType::PartTime),
            ("CONTRACTOR", JobType::Contract),
            ("internship (paid)", JobType::Internship),
            ("INTERN", JobType::Internship),
            ("Temporary", JobType::Temporary),
            ("temp", JobType::Temporary),
            ("Freelance / Gig", JobType::Freelance),
            ("other", JobType::Other),
            ("volunteer", JobType::FullTime),
            ("", JobType::FullTime),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_job_type(Some(input)), expected, "input {input:?}");
        }
        assert_eq!(normalize_job_type(None), JobType::FullTime);
    }

    #[test]
    fn salary_formatting() {
        assert_eq!(
            format_salary(Some(50000.0), Some(80000.0), "USD"),
            "$50,000 - $80,000"
        );
        assert_eq!(format_salary(None, Some(90000.0), "USD"), "Up to $90,000");
        assert_eq!(format_salary(Some(1200.4), None, "GBP"), "From £1,200");
        assert_eq!(format_salary(None, None, "USD"), "Not disclosed");
        assert_eq!(format_salary(Some(0.0), Some(0.0), "USD"), "Not disclosed");
        assert_eq!(
            format_salary(Some(600000.0), Some(1200000.0), "INR"),
            "₹600,000 - ₹1,200,000"
        );
        assert_eq!(format_salary(Some(999.0), None, "CHF"), "From CHF 999");
    }

    #[test]
    fn salary_and_experience_sentinels() {
        assert_eq!(normalize_salary(None), NOT_DISCLOSED);
        assert_eq!(normalize_salary(Some("  ")), NOT_DISCLOSED);
        assert_eq!(normalize_salary(Some("Negotiable")), NOT_DISCLOSED);
        assert_eq!(normalize_salary(Some(" ₹ 3,00,000 /year ")), "₹ 3,00,000 /year");
        assert_eq!(normalize_experience(Some("")), NOT_SPECIFIED);
        assert_eq!(normalize_experience(Some("2 - 5 yrs")), "2 - 5 yrs");
    }

    #[test]
    fn experience_from_months() {
        assert_eq!(format_experience_months(None), NOT_SPECIFIED);
        assert_eq!(format_experience_months(Some(0)), NOT_SPECIFIED);
        assert_eq!(format_experience_months(Some(6)), "6 months");
        assert_eq!(format_experience_months(Some(12)), "1 year");
        assert_eq!(format_experience_months(Some(36)), "3 years");
        assert_eq!(format_experience_months(Some(30)), "2-3 years");
    }

    #[test]
    fn posted_dates_resolve_to_calendar_days() {
        let today = day(2024, 5, 20);
        assert_eq!(parse_posted_date(None, today), today);
        assert_eq!(parse_posted_date(Some("garbage"), today), today);
        assert_eq!(parse_posted_date(Some("2 days ago"), today), day(2024, 5, 18));
        assert_eq!(parse_posted_date(Some("1 week ago"), today), day(2024, 5, 13));
        assert_eq!(parse_posted_date(Some("5 hours ago"), today), today);
        assert_eq!(parse_posted_date(Some("30+ days ago"), today), day(2024, 4, 20));
        assert_eq!(parse_posted_date(Some("Yesterday"), today), day(2024, 5, 19));
        assert_eq!(
            parse_posted_date(Some("2024-01-15T10:30:00Z"), today),
            day(2024, 1, 15)
        );
        assert_eq!(
            parse_posted_date(Some("2024-02-01T00:00:00.0000000"), today),
            day(2024, 2, 1)
        );
        assert_eq!(parse_posted_date(Some("2023-12-31"), today), day(2023, 12, 31));
    }

    #[test]
    fn links_resolve_against_base() {
        let base = Url::parse("https://in.indeed.com").unwrap();
        assert_eq!(
            resolve_link(&base, "/rc/clk?jk=abc").as_deref(),
            Some("https://in.indeed.com/rc/clk?jk=abc")
        );
        assert_eq!(
            resolve_link(&base, "https://example.com/job/1").as_deref(),
            Some("https://example.com/job/1")
        );
        assert_eq!(resolve_link(&base, ""), None);
        assert_eq!(resolve_link(&base, "javascript:void(0)"), None);
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let text = "é".repeat(250);
        assert_eq!(truncate_snippet(&text, SNIPPET_CHARS).chars().count(), 200);
        assert_eq!(truncate_snippet(" short\ntext ", SNIPPET_CHARS), "short text");
    }

    #[test]
    fn raw_job_normalization_applies_sentinels() {
        let today = day(2024, 5, 20);
        let job = RawJob {
            title: Some("  Backend   Engineer ".into()),
            apply_link: Some("https://jobs.example.com/1".into()),
            job_type: Some("CONTRACTOR".into()),
            ..Default::default()
        }
        .normalize(Source::Jooble, today);

        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.company, COMPANY_NOT_LISTED);
        assert_eq!(job.location, NOT_SPECIFIED);
        assert_eq!(job.salary, NOT_DISCLOSED);
        assert_eq!(job.experience, NOT_SPECIFIED);
        assert_eq!(job.job_type, JobType::Contract);
        assert_eq!(job.posted_date, today);
        assert!(is_valid(&job));
    }

    #[test]
    fn missing_title_or_link_is_invalid() {
        let today = day(2024, 5, 20);
        let no_title = RawJob {
            apply_link: Some("https://jobs.example.com/1".into()),
            ..Default::default()
        }
        .normalize(Source::Adzuna, today);
        assert!(!is_valid(&no_title));

        let no_link = RawJob {
            title: Some("Engineer".into()),
            ..Default::default()
        }
        .normalize(Source::Adzuna, today);
        assert!(!is_valid(&no_link));
    }
}

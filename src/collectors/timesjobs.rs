use crate::collectors::scrape::extract::{FieldChains, Strategy};
use crate::collectors::scrape::{ScrapeOptions, SiteProfile, urlencoded};
use crate::models::job::Source;

const BASE_URL: &str = "https://www.timesjobs.com";
const RESULTS_PER_PAGE: u32 = 20;

const TITLE: &str = r#"h2 a, .heading, [class*="job-title"]"#;

pub fn site() -> SiteProfile {
    SiteProfile {
        source: Source::TimesJobs,
        base_url: BASE_URL,
        wait_selector: r#"li[class*="clearfix job-bx"], .job-bx, [class*="srp-job"]"#,
        card_selector: r#"li[class*="clearfix job-bx"], .job-bx, [class*="srp-job"]"#,
        fields: FieldChains {
            title: &[Strategy::Text(TITLE), Strategy::Attr(TITLE, "title")],
            company: &[Strategy::Text(
                r#"h3.joblist-comp-name, .company-name, [class*="comp-name"]"#,
            )],
            location: &[Strategy::Text(r#".location, [class*="loc"]"#)],
            salary: &[Strategy::Text(r#".salary, [class*="sal"]"#)],
            experience: &[Strategy::Text(r#".experience li, [class*="exp"]"#)],
            description: &[Strategy::Text(".job-description, .list-job-dtl, .desc")],
            // The title anchor carries the posting link.
            link: &[Strategy::Attr(TITLE, "href")],
        },
        page_url,
        location_fallback: Some("India"),
        experience_fallback: None,
        job_type: |_| "Full-time",
    }
}

fn page_url(base: &str, options: &ScrapeOptions, page: u32) -> String {
    format!(
        "{base}/candidate/job-search.html?searchType=personalizedSearch&from=submit&txtKeywords={}&txtLocation={}&sequence={}",
        urlencoded(&options.keyword),
        urlencoded(&options.location),
        page * RESULTS_PER_PAGE
    )
}

use crate::collectors::scrape::extract::{FieldChains, Strategy};
use crate::collectors::scrape::{ScrapeOptions, SiteProfile, urlencoded};
use crate::models::job::Source;

const BASE_URL: &str = "https://in.indeed.com";
const RESULTS_PER_PAGE: u32 = 10;

const TITLE: &str = r#"h2 a, a[data-jk], h2 span[title], a[class*="jcs-JobTitle"]"#;
const LINK: &str = "h2 a, a[data-jk]";

pub fn site() -> SiteProfile {
    SiteProfile {
        source: Source::Indeed,
        base_url: BASE_URL,
        wait_selector: r#"div[class*="job"], article, li[class*="result"]"#,
        card_selector: r#"div[class*="jobsearch-SerpJobCard"], div[class*="job_seen_beacon"], article, td[id*="job"]"#,
        fields: FieldChains {
            title: &[Strategy::Text(TITLE), Strategy::Attr(TITLE, "title")],
            company: &[Strategy::Text(
                r#"span[data-testid="company-name"], span[class*="companyName"], div[class*="company"]"#,
            )],
            location: &[Strategy::Text(
                r#"div[data-testid="text-location"], div[class*="companyLocation"], span[class*="location"]"#,
            )],
            salary: &[Strategy::Text(
                r#"div[class*="salary-snippet"], span[class*="salary"]"#,
            )],
            // Not shown on result cards.
            experience: &[],
            description: &[Strategy::Text(
                r#"div[class*="job-snippet"], div[class*="jobCardShelfContainer"]"#,
            )],
            link: &[Strategy::Attr(LINK, "href")],
        },
        page_url,
        location_fallback: None,
        experience_fallback: None,
        job_type: |_| "Full-time",
    }
}

fn page_url(base: &str, options: &ScrapeOptions, page: u32) -> String {
    format!(
        "{base}/jobs?q={}&l={}&start={}",
        urlencoded(&options.keyword),
        urlencoded(&options.location),
        page * RESULTS_PER_PAGE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::scrape::extract::CompiledSite;

    const RESULTS: &str = r#"
        <div id="mosaic-provider-jobcards">
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a data-jk="a1" href="/rc/clk?jk=a1"><span title="Senior Rust Engineer">Senior Rust Engineer</span></a></h2>
            <span data-testid="company-name">Ferrous Systems</span>
            <div data-testid="text-location">Bengaluru, Karnataka</div>
            <div class="salary-snippet-container">₹15,00,000 - ₹25,00,000 a year</div>
            <div class="job-snippet"><ul><li>Own the   ingestion pipeline.</li></ul></div>
          </div>
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a data-jk="a2" href="/rc/clk?jk=a2">QA Analyst</a></h2>
          </div>
        </div>"#;

    #[test]
    fn search_urls_page_by_ten() {
        let options = ScrapeOptions {
            max_pages: 3,
            keyword: "software developer".into(),
            location: "New Delhi".into(),
        };
        assert_eq!(
            page_url(BASE_URL, &options, 2),
            "https://in.indeed.com/jobs?q=software%20developer&l=New%20Delhi&start=20"
        );
    }

    #[test]
    fn extracts_result_cards() {
        let cards = CompiledSite::compile(&site()).unwrap().extract(RESULTS);

        assert_eq!(cards.len(), 1, "card without a company is skipped");
        let card = &cards[0];
        assert_eq!(card.title, "Senior Rust Engineer");
        assert_eq!(card.company, "Ferrous Systems");
        assert_eq!(card.location.as_deref(), Some("Bengaluru, Karnataka"));
        assert_eq!(card.salary.as_deref(), Some("₹15,00,000 - ₹25,00,000 a year"));
        assert_eq!(card.description.as_deref(), Some("Own the ingestion pipeline."));
        assert_eq!(card.link.as_deref(), Some("/rc/clk?jk=a1"));
        assert_eq!(card.experience, None);
    }
}

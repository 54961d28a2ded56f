use crate::collectors::scrape::extract::{FieldChains, Strategy};
use crate::collectors::scrape::{ScrapeOptions, SiteProfile, urlencoded};
use crate::models::job::Source;

const BASE_URL: &str = "https://internshala.com";

pub fn site() -> SiteProfile {
    SiteProfile {
        source: Source::Internshala,
        base_url: BASE_URL,
        wait_selector: r#".individual_internship, .internship_meta, [id*="internship_"]"#,
        card_selector: r#".individual_internship, .internship_meta, [id*="internship_"]"#,
        fields: FieldChains {
            title: &[Strategy::Text(
                ".job-internship-name, .profile, h3 a, .heading_4_5",
            )],
            company: &[Strategy::Text(
                ".company-name, .company_name, .link_display_like_text",
            )],
            location: &[Strategy::Text(r#".location_link, [id*="location"]"#)],
            salary: &[Strategy::Text(r#".stipend, [class*="stipend"]"#)],
            experience: &[Strategy::Text(r#".duration_container, [class*="duration"]"#)],
            description: &[Strategy::Text(
                ".internship_other_details_container, .job_description",
            )],
            link: &[Strategy::Attr(
                r#"a[href*="/internship/"], a[href*="/job/"]"#,
                "href",
            )],
        },
        page_url,
        location_fallback: Some("Remote"),
        experience_fallback: Some("Fresher"),
        job_type,
    }
}

/// `/jobs/{keyword-slug}-jobs/page-{n}`, pages numbered from 1.
fn page_url(base: &str, options: &ScrapeOptions, page: u32) -> String {
    let slug = options
        .keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    format!("{base}/jobs/{}-jobs/page-{}", urlencoded(&slug), page + 1)
}

fn job_type(title: &str) -> &'static str {
    if title.to_lowercase().contains("internship") {
        "Internship"
    } else {
        "Full-time"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::scrape::extract::CompiledSite;

    const RESULTS: &str = r##"
        <div id="list_container">
          <div class="container-fluid individual_internship" internshipid="101">
            <h3 class="job-internship-name"><a href="/job/detail/backend-developer-101">Backend Developer</a></h3>
            <p class="company-name">Zeta Labs</p>
            <p class="row-1-item locations"><a class="location_link" href="#">Mumbai</a></p>
            <span class="stipend">₹ 4,00,000 - 6,00,000 /year</span>
            <a class="view_detail_button" href="/job/detail/backend-developer-101">View details</a>
          </div>
          <div class="container-fluid individual_internship" internshipid="102">
            <h3 class="job-internship-name"><a href="/internship/detail/ml-internship-102">Machine Learning Internship</a></h3>
            <p class="company-name">Neural Works</p>
            <div class="item_body duration_container">6 Months</div>
          </div>
        </div>"##;

    #[test]
    fn search_urls_use_keyword_slug_and_one_based_pages() {
        let options = ScrapeOptions {
            max_pages: 2,
            keyword: "Software  Developer".into(),
            location: "India".into(),
        };
        assert_eq!(
            page_url(BASE_URL, &options, 0),
            "https://internshala.com/jobs/software-developer-jobs/page-1"
        );
        assert_eq!(
            page_url(BASE_URL, &options, 1),
            "https://internshala.com/jobs/software-developer-jobs/page-2"
        );
    }

    #[test]
    fn internship_titles_map_to_internship() {
        assert_eq!(job_type("Machine Learning Internship"), "Internship");
        assert_eq!(job_type("Backend Developer"), "Full-time");
    }

    #[test]
    fn extracts_listing_cards() {
        let cards = CompiledSite::compile(&site()).unwrap().extract(RESULTS);

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "Backend Developer");
        assert_eq!(cards[0].company, "Zeta Labs");
        assert_eq!(cards[0].location.as_deref(), Some("Mumbai"));
        assert_eq!(cards[0].salary.as_deref(), Some("₹ 4,00,000 - 6,00,000 /year"));
        assert_eq!(
            cards[0].link.as_deref(),
            Some("/job/detail/backend-developer-101")
        );

        assert_eq!(cards[1].title, "Machine Learning Internship");
        assert_eq!(cards[1].location, None);
        assert_eq!(cards[1].experience.as_deref(), Some("6 Months"));
    }
}

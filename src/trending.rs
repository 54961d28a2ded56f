// Trending job domains.
// A domain is a named keyword list; a stored job belongs to every domain
// with a keyword occurring anywhere in its title, case-insensitively.

use serde::Serialize;

use crate::models::job::StoredJob;

/// Sample jobs listed per domain.
pub const SAMPLE_JOBS: i64 = 6;
/// Domains returned, busiest first.
pub const TOP_DOMAINS: usize = 10;

pub struct Domain {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

pub const DOMAINS: &[Domain] = &[
    Domain {
        name: "Software Development",
        keywords: &[
            "software",
            "developer",
            "programmer",
            "engineer",
            "full stack",
            "backend",
            "frontend",
            "web developer",
            "mobile developer",
        ],
    },
    Domain {
        name: "Data Science & Analytics",
        keywords: &[
            "data scientist",
            "data analyst",
            "machine learning",
            "ai",
            "analytics",
            "data engineer",
            "ml engineer",
        ],
    },
    Domain {
        name: "DevOps & Cloud",
        keywords: &[
            "devops",
            "cloud",
            "aws",
            "azure",
            "gcp",
            "kubernetes",
            "docker",
            "sre",
            "site reliability",
        ],
    },
    Domain {
        name: "Product Management",
        keywords: &["product manager", "product owner", "pm", "product lead"],
    },
    Domain {
        name: "Design & UX",
        keywords: &["designer", "ux", "ui", "graphic", "product designer", "visual designer"],
    },
    Domain {
        name: "Quality Assurance",
        keywords: &["qa", "tester", "quality", "test engineer", "automation"],
    },
    Domain {
        name: "Cybersecurity",
        keywords: &["security", "cybersecurity", "infosec", "penetration", "security analyst"],
    },
    Domain {
        name: "Marketing & Sales",
        keywords: &["marketing", "sales", "digital marketing", "seo", "content", "growth"],
    },
    Domain {
        name: "Human Resources",
        keywords: &["hr", "human resource", "recruiter", "talent", "people"],
    },
    Domain {
        name: "Finance & Accounting",
        keywords: &["finance", "accounting", "accountant", "financial", "auditor"],
    },
    Domain {
        name: "Business Analyst",
        keywords: &["business analyst", "ba", "analyst", "business intelligence"],
    },
    Domain {
        name: "Project Management",
        keywords: &["project manager", "scrum master", "agile", "program manager"],
    },
    Domain {
        name: "Customer Support",
        keywords: &["support", "customer service", "help desk", "customer success"],
    },
    Domain {
        name: "Operations",
        keywords: &["operations", "ops manager", "supply chain", "logistics"],
    },
    Domain {
        name: "Consulting",
        keywords: &["consultant", "consulting", "advisor", "strategy"],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSample {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
}

impl From<StoredJob> for JobSample {
    fn from(stored: StoredJob) -> Self {
        Self {
            id: stored.id,
            title: stored.job.title,
            company: stored.job.company,
            location: stored.job.location,
            salary: stored.job.salary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingDomain {
    pub domain: String,
    pub count: i64,
    /// Share of all stored jobs, one decimal place.
    pub percentage: f64,
    pub jobs: Vec<JobSample>,
}

pub fn percentage(count: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Drop empty domains, order by count (ties keep domain order) and keep the
/// top [`TOP_DOMAINS`].
pub fn rank(mut domains: Vec<TrendingDomain>) -> Vec<TrendingDomain> {
    domains.retain(|d| d.count > 0);
    domains.sort_by(|a, b| b.count.cmp(&a.count));
    domains.truncate(TOP_DOMAINS);
    domains
}

/// Whether `title` contains any of `keywords`, ignoring case.
pub fn title_matches(title: &str, keywords: &[&str]) -> bool {
    let title = title.to_lowercase();
    keywords.iter().any(|k| title.contains(&k.to_lowercase()))
}

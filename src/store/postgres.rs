use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::models::job::{CanonicalJob, JobFilter, JobSort, StoredJob};
use crate::store::{DuplicateGroup, JobStore, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: i64,
    title: String,
    company: String,
    location: String,
    salary: String,
    experience: String,
    job_type: String,
    source: String,
    apply_link: String,
    description: String,
    posted_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for StoredJob {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let corrupt = |message: String| StoreError::Corrupt {
            id: row.id,
            message,
        };
        let job_type = row.job_type.parse().map_err(corrupt)?;
        let source = row.source.parse().map_err(corrupt)?;

        Ok(StoredJob {
            id: row.id,
            job: CanonicalJob {
                title: row.title,
                company: row.company,
                location: row.location,
                salary: row.salary,
                experience: row.experience,
                job_type,
                source,
                apply_link: row.apply_link,
                description: row.description,
                posted_date: row.posted_date,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    title: String,
    company: String,
    location: String,
    count: i64,
    ids: Vec<i64>,
}

// Shared WHERE clause for `find`. Text filters are escaped regexes matched
// case-insensitively, so user input is always taken literally.
const FILTER_CLAUSE: &str = "WHERE ($1::text IS NULL OR title ~* $1 OR company ~* $1 OR location ~* $1 OR description ~* $1) \
     AND ($2::text IS NULL OR location ~* $2) \
     AND ($3::text IS NULL OR company ~* $3) \
     AND ($4::text IS NULL OR job_type = $4) \
     AND ($5::text IS NULL OR source = $5) \
     AND ($6::text IS NULL OR salary ~* $6)";

fn order_clause(sort: JobSort) -> String {
    let direction = if sort.descending { "DESC" } else { "ASC" };
    format!(
        "ORDER BY {} {direction}, id {direction}",
        sort.field.column()
    )
}

/// Alternation of escaped keywords for a case-insensitive `~*` match.
fn any_keyword_pattern(keywords: &[&str]) -> String {
    keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|")
}

fn literal_pattern(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(regex::escape)
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &CanonicalJob) -> Result<StoredJob, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            "INSERT INTO jobs (title, company, location, salary, experience, job_type, source, apply_link, description, posted_date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(&job.experience)
        .bind(job.job_type.as_str())
        .bind(job.source.as_str())
        .bind(&job.apply_link)
        .bind(&job.description)
        .bind(job.posted_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Database(e),
        })?;
        row.try_into()
    }

    async fn find(&self, filter: &JobFilter) -> Result<(Vec<StoredJob>, i64), StoreError> {
        let search = literal_pattern(&filter.search);
        let location = literal_pattern(&filter.location);
        let company = literal_pattern(&filter.company);
        let job_type = filter.job_type.map(|t| t.as_str());
        let source = filter.source.map(|s| s.as_str());
        let min_salary = literal_pattern(&filter.min_salary);

        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT * FROM jobs {FILTER_CLAUSE} {} LIMIT $7 OFFSET $8",
            order_clause(filter.sort())
        ))
        .bind(&search)
        .bind(&location)
        .bind(&company)
        .bind(job_type)
        .bind(source)
        .bind(&min_salary)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM jobs {FILTER_CLAUSE}"))
            .bind(&search)
            .bind(&location)
            .bind(&company)
            .bind(job_type)
            .bind(source)
            .bind(&min_salary)
            .fetch_one(&self.pool)
            .await?;

        let jobs = rows
            .into_iter()
            .map(StoredJob::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((jobs, total))
    }

    async fn get(&self, id: i64) -> Result<Option<StoredJob>, StoreError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(StoredJob::try_from)
            .transpose()
    }

    async fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT title, company, location, COUNT(*) AS count, ARRAY_AGG(id ORDER BY id) AS ids FROM jobs GROUP BY title, company, location HAVING COUNT(*) > 1 ORDER BY MIN(id)",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DuplicateGroup {
                title: row.title,
                company: row.company,
                location: row.location,
                count: row.count,
                ids: row.ids,
            })
            .collect())
    }

    async fn delete_ids(&self, ids: &[i64]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM jobs WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    async fn titles_matching(
        &self,
        keywords: &[&str],
        sample: i64,
    ) -> Result<(i64, Vec<StoredJob>), StoreError> {
        if keywords.is_empty() {
            return Ok((0, Vec::new()));
        }
        let pattern = any_keyword_pattern(keywords);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE title ~* $1")
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE title ~* $1 ORDER BY id LIMIT $2",
        )
        .bind(&pattern)
        .bind(sample)
        .fetch_all(&self.pool)
        .await?;

        let jobs = rows
            .into_iter()
            .map(StoredJob::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((count, jobs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_text_is_matched_literally() {
        assert_eq!(literal_pattern(&None), None);
        assert_eq!(literal_pattern(&Some("   ".into())), None);
        assert_eq!(
            literal_pattern(&Some(" c++ (remote) ".into())).as_deref(),
            Some(r"c\+\+ \(remote\)")
        );
    }

    #[test]
    fn sort_maps_to_a_column_with_id_tiebreak() {
        assert_eq!(
            order_clause(JobSort::default()),
            "ORDER BY created_at DESC, id DESC"
        );
        let by_title: JobSort = "title".parse().unwrap();
        assert_eq!(order_clause(by_title), "ORDER BY title ASC, id ASC");
    }

    #[test]
    fn keyword_alternation_is_escaped() {
        assert_eq!(
            any_keyword_pattern(&["c++", "full stack", "ai"]),
            r"c\+\+|full stack|ai"
        );
    }

    #[test]
    fn unknown_enum_text_marks_the_row_corrupt() {
        let now = Utc::now();
        let row = JobRow {
            id: 7,
            title: "Engineer".into(),
            company: "Acme".into(),
            location: "Pune".into(),
            salary: "Not disclosed".into(),
            experience: "Not specified".into(),
            job_type: "Seasonal".into(),
            source: "Indeed".into(),
            apply_link: "https://in.indeed.com/viewjob?jk=7".into(),
            description: String::new(),
            posted_date: now.date_naive(),
            created_at: now,
            updated_at: now,
        };
        let err = StoredJob::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { id: 7, .. }));
    }
}

// Storage boundary for canonical jobs.
// `PgJobStore` is the production store; `MemoryJobStore` backs local runs
// without a database and the test suite.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::job::{CanonicalJob, JobFilter, StoredJob};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a job with this title, company and location already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored job {id} is unreadable: {message}")]
    Corrupt { id: i64, message: String },
}

/// All stored jobs sharing one (title, company, location) triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub title: String,
    pub company: String,
    pub location: String,
    pub count: i64,
    /// Ascending.
    pub ids: Vec<i64>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert one job. A record whose triple is already stored fails with
    /// [`StoreError::Duplicate`].
    async fn insert(&self, job: &CanonicalJob) -> Result<StoredJob, StoreError>;

    /// One page of matching jobs in the filter's sort order, and the total
    /// match count.
    async fn find(&self, filter: &JobFilter) -> Result<(Vec<StoredJob>, i64), StoreError>;

    async fn get(&self, id: i64) -> Result<Option<StoredJob>, StoreError>;

    /// Triples stored more than once.
    async fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError>;

    /// Delete the given ids, returning how many rows went away.
    async fn delete_ids(&self, ids: &[i64]) -> Result<u64, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Jobs whose title contains any of `keywords`, ignoring case: the match
    /// count and up to `sample` of the matches, lowest id first.
    async fn titles_matching(
        &self,
        keywords: &[&str],
        sample: i64,
    ) -> Result<(i64, Vec<StoredJob>), StoreError>;
}

// Deduplicating persistence gateway.
// Jobs are written one at a time so that a duplicate or a bad record only
// affects itself. The store's uniqueness rule on (title, company, location)
// is the single arbiter of what counts as a duplicate.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::models::job::{CanonicalJob, JobFilter, JobPage, Pagination, Source, StoredJob};
use crate::store::{DuplicateGroup, JobStore, StoreError};
use crate::trending::{self, TrendingDomain};

/// Groups included in a duplicate report.
const PREVIEW_GROUPS: usize = 10;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStats {
    pub total: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
    /// Inserted records per source.
    pub by_source: BTreeMap<Source, usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub duplicate_groups: usize,
    /// Rows that a purge would delete.
    pub total_duplicates: i64,
    pub groups: Vec<DuplicateGroup>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub duplicate_groups: usize,
    pub deleted_jobs: u64,
}

#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn JobStore>,
}

impl Persistence {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn JobStore {
        self.store.as_ref()
    }

    pub async fn save(&self, jobs: &[CanonicalJob]) -> SaveStats {
        let mut stats = SaveStats {
            total: jobs.len(),
            ..Default::default()
        };

        for job in jobs {
            match self.store.insert(job).await {
                Ok(stored) => {
                    stats.inserted += 1;
                    *stats.by_source.entry(job.source).or_default() += 1;
                    debug!(id = stored.id, source = %job.source, title = %job.title, "job saved");
                }
                Err(StoreError::Duplicate) => {
                    stats.duplicates += 1;
                    debug!(
                        source = %job.source,
                        title = %job.title,
                        company = %job.company,
                        "duplicate job skipped"
                    );
                }
                Err(e) => {
                    stats.errors += 1;
                    error!(
                        source = %job.source,
                        title = %job.title,
                        company = %job.company,
                        error = %e,
                        "failed to save job"
                    );
                }
            }
        }

        info!(
            total = stats.total,
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            errors = stats.errors,
            "save finished"
        );
        stats
    }

    pub async fn list(&self, filter: &JobFilter) -> Result<JobPage, StoreError> {
        let (data, total) = self.store.find(filter).await?;
        Ok(JobPage {
            data,
            pagination: Pagination::new(filter, total),
        })
    }

    pub async fn get(&self, id: i64) -> Result<Option<StoredJob>, StoreError> {
        self.store.get(id).await
    }

    /// Read-only view of the stored duplicates.
    pub async fn find_duplicates(&self) -> Result<DuplicateReport, StoreError> {
        let groups = self.store.duplicate_groups().await?;
        let total_duplicates = groups.iter().map(|g| g.count - 1).sum();
        Ok(DuplicateReport {
            duplicate_groups: groups.len(),
            total_duplicates,
            groups: groups.into_iter().take(PREVIEW_GROUPS).collect(),
        })
    }

    /// Keyword domains ranked by how many stored titles they match.
    pub async fn trending(&self) -> Result<Vec<TrendingDomain>, StoreError> {
        let total = self.store.count().await?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut domains = Vec::with_capacity(trending::DOMAINS.len());
        for domain in trending::DOMAINS {
            let (count, sample) = self
                .store
                .titles_matching(domain.keywords, trending::SAMPLE_JOBS)
                .await?;
            domains.push(TrendingDomain {
                domain: domain.name.to_string(),
                count,
                percentage: trending::percentage(count, total),
                jobs: sample.into_iter().map(Into::into).collect(),
            });
        }

        let ranked = trending::rank(domains);
        debug!(total, domains = ranked.len(), "trending domains computed");
        Ok(ranked)
    }

    /// Keep the lowest id of every duplicate group and delete the rest.
    pub async fn purge_duplicates(&self) -> Result<PurgeReport, StoreError> {
        let groups = self.store.duplicate_groups().await?;
        let doomed: Vec<i64> = groups
            .iter()
            .flat_map(|g| g.ids.iter().skip(1).copied())
            .collect();
        let deleted_jobs = self.store.delete_ids(&doomed).await?;

        info!(groups = groups.len(), deleted = deleted_jobs, "duplicates purged");
        Ok(PurgeReport {
            duplicate_groups: groups.len(),
            deleted_jobs,
        })
    }
}

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::job::{CanonicalJob, DedupKey, JobFilter, JobSort, SortField, StoredJob};
use crate::store::{DuplicateGroup, JobStore, StoreError};
use crate::trending;

#[derive(Default)]
struct Inner {
    next_id: i64,
    jobs: BTreeMap<i64, StoredJob>,
}

/// In-process store with the same uniqueness rule as the database.
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
    enforce_unique: bool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            enforce_unique: true,
        }
    }

    /// A store without the uniqueness rule, standing in for data written
    /// before the unique index existed.
    #[cfg(test)]
    pub fn unconstrained() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            enforce_unique: false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn text_filter(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn matches_filter(job: &CanonicalJob, filter: &JobFilter) -> bool {
    if let Some(search) = text_filter(&filter.search) {
        let hit = [&job.title, &job.company, &job.location, &job.description]
            .iter()
            .any(|field| contains_ignore_case(field, search));
        if !hit {
            return false;
        }
    }
    if let Some(location) = text_filter(&filter.location)
        && !contains_ignore_case(&job.location, location)
    {
        return false;
    }
    if let Some(company) = text_filter(&filter.company)
        && !contains_ignore_case(&job.company, company)
    {
        return false;
    }
    if let Some(min_salary) = text_filter(&filter.min_salary)
        && !contains_ignore_case(&job.salary, min_salary)
    {
        return false;
    }
    filter.job_type.is_none_or(|t| t == job.job_type)
        && filter.source.is_none_or(|s| s == job.source)
}

fn compare(a: &StoredJob, b: &StoredJob, sort: JobSort) -> Ordering {
    let by_field = match sort.field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::PostedDate => a.job.posted_date.cmp(&b.job.posted_date),
        SortField::Title => a.job.title.cmp(&b.job.title),
        SortField::Company => a.job.company.cmp(&b.job.company),
        SortField::Location => a.job.location.cmp(&b.job.location),
    };
    let ordering = by_field.then(a.id.cmp(&b.id));
    if sort.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &CanonicalJob) -> Result<StoredJob, StoreError> {
        let mut inner = self.lock();
        if self.enforce_unique {
            let key = job.dedup_key();
            if inner.jobs.values().any(|stored| stored.job.dedup_key() == key) {
                return Err(StoreError::Duplicate);
            }
        }

        inner.next_id += 1;
        let now = Utc::now();
        let stored = StoredJob {
            id: inner.next_id,
            job: job.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.jobs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find(&self, filter: &JobFilter) -> Result<(Vec<StoredJob>, i64), StoreError> {
        let inner = self.lock();
        let sort = filter.sort();
        let mut matching: Vec<&StoredJob> = inner
            .jobs
            .values()
            .filter(|stored| matches_filter(&stored.job, filter))
            .collect();
        matching.sort_by(|a, b| compare(a, b, sort));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get(&self, id: i64) -> Result<Option<StoredJob>, StoreError> {
        Ok(self.lock().jobs.get(&id).cloned())
    }

    async fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError> {
        let inner = self.lock();
        let mut by_key: BTreeMap<DedupKey, Vec<i64>> = BTreeMap::new();
        for stored in inner.jobs.values() {
            by_key
                .entry(stored.job.dedup_key())
                .or_default()
                .push(stored.id);
        }

        let mut groups: Vec<DuplicateGroup> = by_key
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(key, ids)| DuplicateGroup {
                title: key.title,
                company: key.company,
                location: key.location,
                count: ids.len() as i64,
                ids,
            })
            .collect();
        groups.sort_by_key(|group| group.ids[0]);
        Ok(groups)
    }

    async fn delete_ids(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let removed = ids
            .iter()
            .filter(|id| inner.jobs.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.lock().jobs.len() as i64)
    }

    async fn titles_matching(
        &self,
        keywords: &[&str],
        sample: i64,
    ) -> Result<(i64, Vec<StoredJob>), StoreError> {
        let inner = self.lock();
        let matching: Vec<&StoredJob> = inner
            .jobs
            .values()
            .filter(|stored| trending::title_matches(&stored.job.title, keywords))
            .collect();

        let count = matching.len() as i64;
        let jobs = matching
            .into_iter()
            .take(sample.max(0) as usize)
            .cloned()
            .collect();
        Ok((count, jobs))
    }
}

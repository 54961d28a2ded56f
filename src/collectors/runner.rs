use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::collectors::{JobCollector, SearchRequest, adzuna};
use crate::models::job::{CanonicalJob, Source};
use crate::normalize;
use crate::persistence::Persistence;
use crate::retry::{RetryPolicy, retry_with_backoff};

pub const DEFAULT_QUERY: &str = "software developer";
pub const DEFAULT_LOCATION: &str = "India";
pub const DEFAULT_MAX_PAGES: u32 = 3;
pub const DEFAULT_RUN_BUDGET: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub query: String,
    pub location: String,
    pub max_pages: u32,
    pub enabled_sources: Vec<Source>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            enabled_sources: Source::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Outcome of one ingestion run. Never an error: per-source failures are
/// recorded in `per_source_errors`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub status: RunStatus,
    pub per_source_counts: BTreeMap<Source, usize>,
    pub total_fetched: usize,
    pub per_source_errors: BTreeMap<Source, String>,
    #[serde(skip)]
    pub jobs: Vec<CanonicalJob>,
}

/// Ingestion followed by persistence, as reported to triggers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub status: RunStatus,
    pub per_source_counts: BTreeMap<Source, usize>,
    pub total_fetched: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub errors: usize,
    pub per_source_errors: BTreeMap<Source, String>,
    pub duration_ms: u64,
}

type TaskOutput = (Source, Result<Vec<CanonicalJob>, String>);

pub struct Orchestrator {
    collectors: BTreeMap<Source, Arc<dyn JobCollector>>,
    retry: RetryPolicy,
    run_budget: Duration,
}

impl Orchestrator {
    pub fn new(
        collectors: impl IntoIterator<Item = Arc<dyn JobCollector>>,
        retry: RetryPolicy,
        run_budget: Duration,
    ) -> Self {
        let collectors = collectors
            .into_iter()
            .map(|collector| (collector.source(), collector))
            .collect();
        Self {
            collectors,
            retry,
            run_budget,
        }
    }

    /// Run every enabled source concurrently and wait for all of them to
    /// settle, or for the run budget to expire.
    pub async fn run(&self, options: &IngestOptions) -> IngestionResult {
        let deadline = Instant::now() + self.run_budget;
        let enabled: BTreeSet<Source> = options.enabled_sources.iter().copied().collect();

        info!(
            query = %options.query,
            location = %options.location,
            max_pages = options.max_pages,
            sources = enabled.len(),
            "ingestion run started"
        );

        let mut per_source_counts = BTreeMap::new();
        let mut per_source_errors = BTreeMap::new();
        let mut jobs = Vec::new();
        let mut pending = BTreeSet::new();
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();

        for &source in &enabled {
            let Some(collector) = self.collectors.get(&source).cloned() else {
                warn!(source = %source, "no collector registered");
                per_source_counts.insert(source, 0);
                per_source_errors.insert(source, "no collector registered".to_string());
                continue;
            };

            let request = SearchRequest {
                query: options.query.clone(),
                location: localize(source, &options.location),
                max_pages: options.max_pages,
            };
            let retry = self.retry.clone();
            let span = info_span!("collect", source = %source);

            tasks.spawn(
                async move {
                    let operation = format!("{source} ingestion");
                    let result =
                        retry_with_backoff(&retry, &operation, || collector.collect(&request))
                            .await
                            .map_err(|e| e.to_string());
                    (source, result)
                }
                .instrument(span),
            );
            pending.insert(source);
        }

        let mut abandoned = false;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((source, result)))) => {
                    pending.remove(&source);
                    match result {
                        Ok(collected) => {
                            let fetched = collected.len();
                            let valid: Vec<CanonicalJob> =
                                collected.into_iter().filter(normalize::is_valid).collect();
                            if valid.len() < fetched {
                                debug!(source = %source, dropped = fetched - valid.len(), "dropped invalid records");
                            }
                            info!(source = %source, jobs = valid.len(), "source finished");
                            per_source_counts.insert(source, valid.len());
                            jobs.extend(valid);
                        }
                        Err(message) => {
                            error!(source = %source, error = %message, "source failed");
                            per_source_counts.insert(source, 0);
                            per_source_errors.insert(source, message);
                        }
                    }
                }
                Ok(Some(Err(e))) => error!(error = %e, "collector task failed"),
                Ok(None) => break,
                Err(_) => {
                    abandoned = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        for source in pending {
            let message = if abandoned {
                format!("abandoned after run budget of {}s", self.run_budget.as_secs())
            } else {
                "collector task panicked".to_string()
            };
            warn!(source = %source, error = %message, "source did not finish");
            per_source_counts.insert(source, 0);
            per_source_errors.insert(source, message);
        }
        tasks.shutdown().await;

        let status = if !enabled.is_empty() && per_source_errors.len() == enabled.len() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        let total_fetched: usize = per_source_counts.values().sum();

        info!(
            status = ?status,
            total_fetched,
            failed_sources = per_source_errors.len(),
            "ingestion run finished"
        );

        IngestionResult {
            status,
            per_source_counts,
            total_fetched,
            per_source_errors,
            jobs,
        }
    }

    /// `run` followed by a save of everything it fetched.
    pub async fn ingest_and_save(
        &self,
        options: &IngestOptions,
        persistence: &Persistence,
    ) -> IngestReport {
        let started = Instant::now();
        let result = self.run(options).await;
        let stats = persistence.save(&result.jobs).await;

        IngestReport {
            status: result.status,
            per_source_counts: result.per_source_counts,
            total_fetched: result.total_fetched,
            saved: stats.inserted,
            duplicates: stats.duplicates,
            errors: stats.errors,
            per_source_errors: result.per_source_errors,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Adzuna routes searches by country code; every other source takes the
/// location as given.
fn localize(source: Source, location: &str) -> String {
    match source {
        Source::Adzuna => adzuna::country_code(location).to_string(),
        _ => location.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::collectors::CollectError;
    use crate::collectors::scrape::browser::BrowserError;
    use crate::models::job::JobType;
    use crate::store::memory::MemoryJobStore;

    struct FakeCollector {
        source: Source,
        jobs: Vec<CanonicalJob>,
        failures_before_success: u32,
        hang: bool,
        calls: AtomicU32,
        seen_location: std::sync::Mutex<Option<String>>,
    }

    impl FakeCollector {
        fn new(source: Source, jobs: Vec<CanonicalJob>) -> Self {
            Self {
                source,
                jobs,
                failures_before_success: 0,
                hang: false,
                calls: AtomicU32::new(0),
                seen_location: std::sync::Mutex::new(None),
            }
        }

        fn failing(source: Source, times: u32) -> Self {
            Self {
                failures_before_success: times,
                ..Self::new(source, Vec::new())
            }
        }
    }

    #[async_trait]
    impl JobCollector for FakeCollector {
        fn source(&self) -> Source {
            self.source
        }

        async fn collect(&self, request: &SearchRequest) -> Result<Vec<CanonicalJob>, CollectError> {
            *self.seen_location.lock().unwrap() = Some(request.location.clone());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if call < self.failures_before_success {
                return Err(CollectError::Browser(BrowserError::Launch(format!(
                    "{} unavailable",
                    self.source
                ))));
            }
            Ok(self.jobs.clone())
        }
    }

    fn job(source: Source, title: &str) -> CanonicalJob {
        CanonicalJob {
            title: title.to_string(),
            company: "Acme".into(),
            location: "Pune".into(),
            salary: normalize::NOT_DISCLOSED.into(),
            experience: normalize::NOT_SPECIFIED.into(),
            job_type: JobType::FullTime,
            source,
            apply_link: format!("https://jobs.example.com/{source}/{title}"),
            description: String::new(),
            posted_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        }
    }

    fn jobs(source: Source, n: usize) -> Vec<CanonicalJob> {
        (0..n).map(|i| job(source, &format!("Role {i}"))).collect()
    }

    fn options(sources: &[Source]) -> IngestOptions {
        IngestOptions {
            enabled_sources: sources.to_vec(),
            ..Default::default()
        }
    }

    fn orchestrator(collectors: Vec<Arc<dyn JobCollector>>, budget: Duration) -> Orchestrator {
        Orchestrator::new(collectors, RetryPolicy::default(), budget)
    }

    #[tokio::test(start_paused = true)]
    async fn counts_valid_records_and_recovers_flaky_sources() {
        let mut adzuna = jobs(Source::Adzuna, 5);
        let mut invalid = job(Source::Adzuna, "Broken");
        invalid.company = String::new();
        adzuna.push(invalid);

        let flaky = FakeCollector {
            jobs: jobs(Source::Indeed, 3),
            ..FakeCollector::failing(Source::Indeed, 1)
        };
        let flaky = Arc::new(flaky);

        let orchestrator = orchestrator(
            vec![
                Arc::new(FakeCollector::new(Source::Adzuna, adzuna)),
                flaky.clone(),
            ],
            DEFAULT_RUN_BUDGET,
        );
        let run_options = IngestOptions {
            query: "software developer".into(),
            location: "India".into(),
            ..options(&[Source::Adzuna, Source::Indeed])
        };
        let started = Instant::now();
        let result = orchestrator.run(&run_options).await;

        assert!(started.elapsed() <= RetryPolicy::default().total_backoff());
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.total_fetched, 8);
        assert_eq!(result.per_source_counts[&Source::Adzuna], 5);
        assert_eq!(result.per_source_counts[&Source::Indeed], 3);
        assert!(result.per_source_errors.is_empty());
        assert_eq!(result.jobs.len(), 8);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_source_does_not_affect_the_others() {
        let broken = Arc::new(FakeCollector::failing(Source::Jooble, u32::MAX));
        let orchestrator = orchestrator(
            vec![
                Arc::new(FakeCollector::new(Source::JSearch, jobs(Source::JSearch, 2))),
                Arc::new(FakeCollector::new(Source::Adzuna, jobs(Source::Adzuna, 4))),
                broken.clone(),
            ],
            DEFAULT_RUN_BUDGET,
        );
        let result = orchestrator
            .run(&options(&[Source::JSearch, Source::Adzuna, Source::Jooble]))
            .await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.per_source_counts[&Source::JSearch], 2);
        assert_eq!(result.per_source_counts[&Source::Adzuna], 4);
        assert_eq!(result.per_source_counts[&Source::Jooble], 0);
        assert_eq!(result.total_fetched, 6);
        assert_eq!(result.per_source_errors.len(), 1);
        assert!(result.per_source_errors[&Source::Jooble].contains("Jooble unavailable"));
        assert_eq!(broken.calls.load(Ordering::SeqCst), 3, "retried to the attempt cap");
    }

    #[tokio::test(start_paused = true)]
    async fn every_source_failing_marks_the_run_failed() {
        let orchestrator = orchestrator(
            vec![
                Arc::new(FakeCollector::failing(Source::Indeed, u32::MAX)),
                Arc::new(FakeCollector::failing(Source::TimesJobs, u32::MAX)),
            ],
            DEFAULT_RUN_BUDGET,
        );
        let result = orchestrator
            .run(&options(&[Source::Indeed, Source::TimesJobs]))
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.total_fetched, 0);
        assert_eq!(result.per_source_errors.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stragglers_are_abandoned_at_the_deadline() {
        let slow = FakeCollector {
            hang: true,
            ..FakeCollector::new(Source::Internshala, jobs(Source::Internshala, 4))
        };
        let orchestrator = orchestrator(
            vec![
                Arc::new(slow),
                Arc::new(FakeCollector::new(Source::Jooble, jobs(Source::Jooble, 1))),
            ],
            Duration::from_secs(10),
        );
        let result = orchestrator
            .run(&options(&[Source::Internshala, Source::Jooble]))
            .await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.per_source_counts[&Source::Jooble], 1);
        assert_eq!(result.per_source_counts[&Source::Internshala], 0);
        assert_eq!(
            result.per_source_errors[&Source::Internshala],
            "abandoned after run budget of 10s"
        );
    }

    #[tokio::test]
    async fn unregistered_sources_are_reported() {
        let orchestrator = orchestrator(
            vec![Arc::new(FakeCollector::new(Source::Jooble, jobs(Source::Jooble, 1)))],
            DEFAULT_RUN_BUDGET,
        );
        let result = orchestrator
            .run(&options(&[Source::Jooble, Source::TimesJobs]))
            .await;

        assert_eq!(result.total_fetched, 1);
        assert_eq!(
            result.per_source_errors[&Source::TimesJobs],
            "no collector registered"
        );
    }

    #[tokio::test]
    async fn adzuna_receives_a_country_code() {
        let adzuna = Arc::new(FakeCollector::new(Source::Adzuna, Vec::new()));
        let jooble = Arc::new(FakeCollector::new(Source::Jooble, Vec::new()));
        let orchestrator = orchestrator(vec![adzuna.clone(), jooble.clone()], DEFAULT_RUN_BUDGET);

        let mut opts = options(&[Source::Adzuna, Source::Jooble]);
        opts.location = "London, United Kingdom".into();
        orchestrator.run(&opts).await;

        assert_eq!(adzuna.seen_location.lock().unwrap().as_deref(), Some("gb"));
        assert_eq!(
            jooble.seen_location.lock().unwrap().as_deref(),
            Some("London, United Kingdom")
        );
    }

    #[tokio::test]
    async fn ingest_and_save_reports_persistence_counts() {
        let persistence = Persistence::new(Arc::new(MemoryJobStore::new()));
        let same_role = job(Source::Jooble, "Role 0");

        let orchestrator = orchestrator(
            vec![
                Arc::new(FakeCollector::new(Source::JSearch, jobs(Source::JSearch, 2))),
                Arc::new(FakeCollector::new(Source::Jooble, vec![same_role])),
            ],
            DEFAULT_RUN_BUDGET,
        );
        let report = orchestrator
            .ingest_and_save(&options(&[Source::JSearch, Source::Jooble]), &persistence)
            .await;

        assert_eq!(report.total_fetched, 3);
        assert_eq!(report.saved, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.errors, 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["perSourceCounts"]["JSearch"], 2);
        assert!(json.get("durationMs").is_some());
    }
}

mod auth;
mod collectors;
mod config;
mod db;
mod error;
mod models;
mod normalize;
mod persistence;
mod retry;
mod routes;
mod store;
mod trending;

use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::collectors::runner::{IngestOptions, Orchestrator};
use crate::collectors::scrape::browser::HttpBrowser;
use crate::collectors::{CollectorSettings, build_collectors};
use crate::config::{Command, Config};
use crate::models::job::Source;
use crate::persistence::Persistence;
use crate::routes::AppState;
use crate::store::JobStore;
use crate::store::memory::MemoryJobStore;
use crate::store::postgres::PgJobStore;

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jobharvest=info,tower_http=info"));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn JobStore>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, jobs are kept in memory only");
        return Ok(Arc::new(MemoryJobStore::new()));
    };

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }

    Ok(Arc::new(PgJobStore::new(pool)))
}

fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let settings = CollectorSettings {
        adzuna: config.adzuna_credentials(),
        rapid_api_key: config.rapid_api_key.clone(),
        jooble_api_key: config.jooble_api_key.clone(),
        pacing: config.pacing(),
        timeouts: config.scrape_timeouts(),
        launcher: Arc::new(HttpBrowser::new()),
    };
    let collectors = build_collectors(&settings)?;
    let retry = config.retry_policy();

    tracing::info!(
        collectors = collectors.len(),
        attempts = retry.max_attempts,
        worst_case_backoff_ms = retry.total_backoff().as_millis() as u64,
        run_budget_secs = config.run_budget_secs,
        "collectors ready"
    );
    Ok(Orchestrator::new(collectors, retry, config.run_budget()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_format);

    let persistence = Persistence::new(open_store(&config).await?);

    match config.resolved_command() {
        Command::Serve { listen_addr } => {
            let state = AppState {
                orchestrator: Arc::new(build_orchestrator(&config)?),
                persistence,
                cron_secret_hash: config.cron_secret.as_deref().map(auth::hash_token),
            };
            if state.cron_secret_hash.is_none() {
                tracing::warn!("CRON_SECRET not set, the API is unauthenticated");
            }

            let app = routes::router(state)
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
            tracing::info!("Listening on {}", listen_addr);
            axum::serve(listener, app).await?;
        }
        Command::Ingest {
            query,
            location,
            sources,
            max_pages,
        } => {
            let options = IngestOptions {
                query,
                location,
                max_pages: max_pages.max(1),
                enabled_sources: if sources.is_empty() {
                    Source::ALL.to_vec()
                } else {
                    sources
                },
            };
            let report = build_orchestrator(&config)?
                .ingest_and_save(&options, &persistence)
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Duplicates { purge } => {
            if purge {
                let report = persistence.purge_duplicates().await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let report = persistence.find_duplicates().await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Trending => {
            let domains = persistence.trending().await?;
            println!("{}", serde_json::to_string_pretty(&domains)?);
        }
    }

    Ok(())
}

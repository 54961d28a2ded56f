pub mod ingest;
pub mod jobs;
pub mod maintenance;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::auth::require_cron_secret;
use crate::routes::AppState;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        // Ingestion
        .route("/ingest", post(ingest::trigger))
        // Jobs
        .route("/jobs", get(jobs::list))
        .route("/jobs/{id}", get(jobs::get))
        .route("/trending", get(jobs::trending))
        // Maintenance
        .route(
            "/duplicates",
            get(maintenance::duplicates).delete(maintenance::purge),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_cron_secret,
        ))
        .with_state(state);

    Router::new().nest("/api/v1", protected)
}

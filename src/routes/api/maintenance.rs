use axum::Json;
use axum::extract::State;

use crate::error::AppError;
use crate::persistence::{DuplicateReport, PurgeReport};
use crate::routes::AppState;

/// GET /api/v1/duplicates
pub async fn duplicates(
    State(state): State<AppState>,
) -> Result<Json<DuplicateReport>, AppError> {
    let report = state.persistence.find_duplicates().await?;
    Ok(Json(report))
}

/// DELETE /api/v1/duplicates
///
/// Keeps the oldest record of every duplicate group.
pub async fn purge(State(state): State<AppState>) -> Result<Json<PurgeReport>, AppError> {
    let report = state.persistence.purge_duplicates().await?;
    tracing::info!(
        groups = report.duplicate_groups,
        deleted = report.deleted_jobs,
        "duplicate purge requested over HTTP"
    );
    Ok(Json(report))
}

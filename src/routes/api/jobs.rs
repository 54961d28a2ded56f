use axum::Json;
use axum::extract::{Path, Query, State};

use crate::error::AppError;
use crate::models::job::{JobFilter, JobPage, StoredJob};
use crate::routes::AppState;
use crate::trending::TrendingDomain;

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<JobPage>, AppError> {
    let page = state.persistence.list(&filter).await?;
    Ok(Json(page))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StoredJob>, AppError> {
    let job = state
        .persistence
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(job))
}

/// GET /api/v1/trending
pub async fn trending(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrendingDomain>>, AppError> {
    let domains = state.persistence.trending().await?;
    Ok(Json(domains))
}

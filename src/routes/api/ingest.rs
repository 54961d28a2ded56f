use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use crate::collectors::runner::{IngestOptions, IngestReport};
use crate::error::AppError;
use crate::models::job::Source;
use crate::routes::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub query: Option<String>,
    pub location: Option<String>,
    pub enabled_sources: Option<Vec<String>>,
    pub max_pages: Option<u32>,
}

impl IngestRequest {
    fn into_options(self) -> Result<IngestOptions, AppError> {
        let defaults = IngestOptions::default();
        let enabled_sources = match self.enabled_sources {
            Some(names) => names
                .iter()
                .map(|name| name.parse::<Source>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(AppError::BadRequest)?,
            None => defaults.enabled_sources,
        };
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Ok(IngestOptions {
            query: non_blank(self.query).unwrap_or(defaults.query),
            location: non_blank(self.location).unwrap_or(defaults.location),
            max_pages: self.max_pages.unwrap_or(defaults.max_pages).max(1),
            enabled_sources,
        })
    }
}

/// POST /api/v1/ingest
///
/// Run one ingestion across the enabled sources and save what it fetched.
/// An empty body runs every source with the defaults.
pub async fn trigger(
    State(state): State<AppState>,
    body: Option<Json<IngestRequest>>,
) -> Result<Json<IngestReport>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let options = request.into_options()?;

    let report = state
        .orchestrator
        .ingest_and_save(&options, &state.persistence)
        .await;
    Ok(Json(report))
}

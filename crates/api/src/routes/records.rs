//! Record Store Routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{ConfigRecord, NameCardRecord, Record};

use crate::{error::ApiError, AppState};

/// Query parameters for the records endpoint
#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    /// Read-only SQL text
    pub sql: String,
}

/// Response for the records endpoint
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub data: Vec<Record>,
    pub count: usize,
}

/// Run a read-only query
pub async fn get_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let data = state.store.query(&params.sql).await?;

    Ok(Json(RecordsResponse {
        count: data.len(),
        data,
    }))
}

/// Insert a row into `test`
pub async fn post_config(
    State(state): State<Arc<AppState>>,
    Json(record): Json<ConfigRecord>,
) -> Result<(StatusCode, Json<ConfigRecord>), ApiError> {
    state.store.insert_config_record(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Insert a row into `name_card`
pub async fn post_name_card(
    State(state): State<Arc<AppState>>,
    Json(record): Json<NameCardRecord>,
) -> Result<(StatusCode, Json<NameCardRecord>), ApiError> {
    state.store.insert_name_card_record(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

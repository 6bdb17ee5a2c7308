// src/routes/patient_routes.rs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, Patient},
    normalize,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/patients", get(list_patients))
}

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Patient picker for the booking form, straight from the backend.
pub async fn list_patients(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiOk<Vec<Patient>>>, ApiError> {
    let limit = q.limit.unwrap_or(state.paging.page_size).max(1);
    let offset = q.offset.unwrap_or(0);

    let raw = state
        .connector
        .connect(&auth)
        .list_patients(limit, offset)
        .await?;

    Ok(Json(ApiOk {
        data: normalize::normalize_patients(raw),
    }))
}

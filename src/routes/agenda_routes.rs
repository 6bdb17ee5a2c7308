// src/routes/agenda_routes.rs

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    conflict::ConflictRecord,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{kind_catalogue, Appointment, AppointmentDraft, AppState, KindInfo, StatusFilter},
    projector::{self, DaySummary, MonthGrid},
    session::SharedWorkflow,
    time,
    workflow::{SchedulingWorkflow, SubmitOutcome, WorkflowState},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/day", get(get_day))
        .route("/month", get(get_month))
        .route("/summary", get(get_summary))
        .route("/kinds", get(get_kinds))
        .route("/refresh", post(refresh))
        .route("/appointments", post(create_appointment))
        .route(
            "/appointments/{appointment_id}",
            put(update_appointment).delete(delete_appointment),
        )
        .route("/pending", get(get_pending))
        .route("/pending/override", post(override_pending))
        .route("/pending/cancel", post(cancel_pending))
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct RefreshData {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MonthView {
    pub grid: MonthGrid,
    pub days: BTreeMap<NaiveDate, Vec<Appointment>>,
}

#[derive(Debug, Serialize)]
pub struct PendingView {
    pub state: WorkflowState,
    pub conflict: Option<ConflictRecord>,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    // YYYY-MM-DD, local wall-clock date
    pub date: String,
    #[serde(default)]
    pub status: StatusFilter,
}

/* ============================================================
   Helpers
   ============================================================ */

fn parse_date_param(raw: &str) -> Result<NaiveDate, ApiError> {
    time::parse_date(raw.trim())
        .map_err(|_| ApiError::BadRequest("VALIDATION_ERROR", "date must be YYYY-MM-DD".into()))
}

async fn session(state: &AppState, auth: &AuthContext) -> SharedWorkflow {
    state
        .sessions
        .workflow_for(auth, state.connector.as_ref(), state.paging)
        .await
}

/// Read views load the snapshot on first use and after a failed reload.
async fn ensure_loaded(wf: &mut SchedulingWorkflow) -> Result<(), ApiError> {
    if wf.is_stale() {
        wf.refresh().await?;
    }
    Ok(())
}

/* ============================================================
   Read views
   ============================================================ */

pub async fn get_day(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<DateQuery>,
) -> Result<Json<ApiOk<Vec<Appointment>>>, ApiError> {
    let date = parse_date_param(&q.date)?;
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    ensure_loaded(&mut wf).await?;

    Ok(Json(ApiOk {
        data: projector::appointments_on_date(date, wf.appointments(), q.status),
    }))
}

pub async fn get_month(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<DateQuery>,
) -> Result<Json<ApiOk<MonthView>>, ApiError> {
    let date = parse_date_param(&q.date)?;
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    ensure_loaded(&mut wf).await?;

    let grid = projector::month_grid(date);
    let days = projector::appointments_by_day(&grid, wf.appointments(), q.status);
    Ok(Json(ApiOk {
        data: MonthView { grid, days },
    }))
}

pub async fn get_summary(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<DateQuery>,
) -> Result<Json<ApiOk<DaySummary>>, ApiError> {
    let date = parse_date_param(&q.date)?;
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    ensure_loaded(&mut wf).await?;

    Ok(Json(ApiOk {
        data: projector::day_summary(date, wf.appointments()),
    }))
}

pub async fn get_kinds(_auth: AuthContext) -> Json<ApiOk<Vec<KindInfo>>> {
    Json(ApiOk {
        data: kind_catalogue(),
    })
}

/* ============================================================
   Write path
   ============================================================ */

pub async fn refresh(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<RefreshData>>, ApiError> {
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    let count = wf.refresh().await?;
    Ok(Json(ApiOk {
        data: RefreshData { count },
    }))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(mut draft): Json<AppointmentDraft>,
) -> Result<Json<ApiOk<SubmitOutcome>>, ApiError> {
    draft.id = None;
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    let outcome = wf.submit(draft).await?;
    Ok(Json(ApiOk { data: outcome }))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<String>,
    Json(mut draft): Json<AppointmentDraft>,
) -> Result<Json<ApiOk<SubmitOutcome>>, ApiError> {
    draft.id = Some(appointment_id);
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    let outcome = wf.submit(draft).await?;
    Ok(Json(ApiOk { data: outcome }))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<String>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    wf.delete(&appointment_id).await?;
    Ok(Json(ApiOk {
        data: OkData { ok: true },
    }))
}

/* ============================================================
   Override decision
   ============================================================ */

pub async fn get_pending(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Json<ApiOk<PendingView>> {
    let shared = session(&state, &auth).await;
    let wf = shared.lock().await;
    Json(ApiOk {
        data: PendingView {
            state: wf.state(),
            conflict: wf.pending_conflict().cloned(),
        },
    })
}

pub async fn override_pending(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<SubmitOutcome>>, ApiError> {
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    let outcome = wf.override_conflict().await?;
    Ok(Json(ApiOk { data: outcome }))
}

pub async fn cancel_pending(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    let shared = session(&state, &auth).await;
    let mut wf = shared.lock().await;
    let discarded = wf.cancel_override()?;
    Ok(Json(ApiOk { data: discarded }))
}

use crate::models::AppState;
use axum::Router;

pub mod agenda_routes;
pub mod patient_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/agenda", agenda_routes::router())
        .nest("/api/v1", patient_routes::router())
        .with_state(state)
}

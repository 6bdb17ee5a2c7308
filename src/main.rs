use std::sync::Arc;

use clinic_agenda::{
    backend::HttpConnector,
    config::Config,
    models::AppState,
    routes,
    session::SessionRegistry,
    workflow::Paging,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let connector = HttpConnector::new(&cfg)?;

    let state = AppState {
        connector: Arc::new(connector),
        sessions: Arc::new(SessionRegistry::new(cfg.session_ttl())),
        paging: Paging {
            page_size: cfg.page_size,
            max_pages: cfg.max_pages,
        },
    };

    // The dashboard is a browser app served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(backend = %cfg.backend_url, "agenda gateway backend");
    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

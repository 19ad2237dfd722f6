use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::ObjectService;

pub mod routes;

/// Server state
pub struct AppState {
    pub service: ObjectService,
}

/// Build the HTTP router for an object service
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/DynamicObject", post(routes::create_object))
        .route("/api/DynamicObject/{object_type}/{id}", get(routes::get_object))
        .route(
            "/api/DynamicObject/{id}",
            put(routes::update_object).delete(routes::delete_object),
        )
        .route("/api/types", get(routes::list_types))
        .route("/api/stats", get(routes::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(port: u16, service: ObjectService) -> anyhow::Result<()> {
    let state = Arc::new(AppState { service });
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

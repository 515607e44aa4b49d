mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::orchestrator::Orchestrator;

pub use handlers::{BacklogResponse, ExportBundle};

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let api = Router::new()
        // Generation
        .route("/backlog", post(handlers::generate_backlog))
        .route("/backlog/feature", post(handlers::generate_feature_backlog))
        .route("/backlog/document", post(handlers::generate_document_backlog))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(orchestrator)
}

//! HTTP server for the family tree API

use super::handler::{
    add_member_handler, add_relationship_handler, change_relationship_handler, get_member_handler,
    list_members_handler, remove_member_handler, remove_relationship_handler, search_members_handler,
    status_handler, update_member_handler, SharedFamily,
};
use crate::config::ServerConfig;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Build the API router over a shared family
pub fn router(family: SharedFamily) -> Router {
    Router::new()
        .route("/family", post(add_member_handler).get(list_members_handler))
        .route("/family/search", get(search_members_handler))
        .route(
            "/family/:id",
            get(get_member_handler)
                .patch(update_member_handler)
                .delete(remove_member_handler),
        )
        .route(
            "/relationships",
            post(add_relationship_handler).put(change_relationship_handler),
        )
        .route("/relationships/:source/:target", delete(remove_relationship_handler))
        .route("/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(family)
}

/// HTTP server exposing the family tree API
pub struct HttpServer {
    family: SharedFamily,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(family: SharedFamily, config: ServerConfig) -> Self {
        Self { family, config }
    }

    /// Start the HTTP server
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = router(Arc::clone(&self.family));

        let addr = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Family tree API listening on http://{}", addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}

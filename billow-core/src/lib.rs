//! Billow core server: invoice management over a REST API.
//!
//! Invoices move through a forward-only lifecycle (draft, pending, paid)
//! with status-dependent validation and server-computed payment dates and
//! amounts. Persistence sits behind the [`store::InvoiceStore`] trait with
//! Postgres and in-memory backends.

pub mod db;
pub mod error;
pub mod invoices;
pub mod models;
pub mod payment_terms;
pub mod store;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::store::InvoiceStore;

/// Application state containing shared resources.
///
/// This struct holds the invoice store and other shared state that
/// needs to be accessible to route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Invoice persistence backend
    pub store: Arc<dyn InvoiceStore>,
}

/// Health check endpoint.
///
/// Returns a simple JSON response indicating the server is running.
/// Useful for monitoring and load balancer health checks.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "billow-core",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Store health check endpoint.
///
/// Verifies that the persistence backend is reachable by executing
/// a trivial query.
async fn store_health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state.store.ping().await.map_err(|e| {
        tracing::error!("Store health check failed: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "store": "connected"
    })))
}

/// Creates the main application router.
///
/// Sets up all routes and middleware for the Billow API.
///
/// # Arguments
///
/// * `state` - The application state containing the invoice store
///
/// # Returns
///
/// Returns a configured Axum Router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health routes
        .route("/health", get(health_check))
        .route("/health/db", get(store_health_check))
        // Invoice routes
        .route(
            "/api/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route(
            "/api/invoices/:id/status",
            put(invoices::change_invoice_status),
        )
        // Reference data
        .route("/api/payment-terms", get(payment_terms::list_payment_terms))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

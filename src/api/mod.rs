//! HTTP API in front of the quoting engine.
//!
//! Provides two endpoints:
//! - `POST /api/calculate`: quote for `{ "gastoMensual": number }`
//! - `GET /api/tariff`: the loaded tariff table and constants

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::quote::QuoteEngine;

pub use types::{CalculateRequest, ErrorResponse, TariffBlockRecord, TariffResponse};

/// Immutable application state shared across all request handlers.
///
/// Built once at startup from a validated configuration and wrapped in
/// `Arc`; no locks needed since the engine is read-only.
pub struct AppState {
    /// Quoting engine for the configured tariff.
    pub engine: QuoteEngine,
}

/// Builds the axum router with all API routes.
///
/// Cross-origin requests are allowed so a browser front end served from
/// another origin can post quotes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/calculate", post(handlers::calculate))
        .route("/api/tariff", get(handlers::get_tariff))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind to `addr` or the
/// server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, router(state)).await
}

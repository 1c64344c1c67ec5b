//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for ledgers and advances
//! - Bearer token middleware and the `AuthUser` extractor
//! - Mapping of domain errors onto JSON error responses

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::Router;
use ledgerline_db::LedgerRepository;
use ledgerline_shared::{JwtService, LedgerConfig};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger store.
    pub repository: Arc<LedgerRepository>,
    /// JWT service for token verification.
    pub jwt_service: Arc<JwtService>,
    /// Ledger tunables (page size limits).
    pub ledger_config: LedgerConfig,
}

/// Creates the main application router.
///
/// Routes are mounted at the root path.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

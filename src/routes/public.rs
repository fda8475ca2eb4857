use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are **unauthenticated** and reachable by any client.
///
/// Security Mandate:
/// The public poster view must only release APPROVED material and must
/// answer 404 (never 403) for anything else, so anonymous callers cannot
/// probe which drafts exist.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // New-user creation relayed through the external identity provider,
        // mirroring the resulting profile locally.
        .route("/register", post(handlers::register_user))
        // GET /public/posters/{public_id}
        // The share-link view. APPROVED posters only; everything else is
        // indistinguishable from absent.
        .route(
            "/public/posters/{public_id}",
            get(handlers::get_public_poster),
        )
}

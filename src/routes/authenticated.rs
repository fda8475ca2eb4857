use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for any principal that passed the authentication layer. Every
/// handler here receives a validated `Principal` (id + normalized role)
/// from the extractor middleware and runs its own capability/ownership
/// checks on top; authentication alone grants nothing beyond one's own
/// content.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The authenticated principal's profile.
        .route("/me", get(handlers::get_me))
        // --- Poster Submission & Editing ---
        // GET lists posters role-aware; POST creates a new DRAFT poster.
        .route(
            "/posters",
            get(handlers::list_posters).post(handlers::create_poster),
        )
        // Detail view plus owner-guarded modification and deletion.
        .route(
            "/posters/{id}",
            get(handlers::get_poster_details)
                .put(handlers::update_poster)
                .delete(handlers::delete_poster),
        )
        // --- Review & Audit ---
        // POST /posters/{id}/review
        // Submits one review decision; applies the lifecycle transition
        // and appends to the audit trail atomically.
        .route("/posters/{id}/review", post(handlers::review_poster))
        // Review evidence and the append-only status history.
        .route("/posters/{id}/reviews", get(handlers::get_poster_reviews))
        .route("/posters/{id}/history", get(handlers::get_poster_history))
        // --- Export & Sharing ---
        // POST /posters/{id}/export
        // Gate-checked extraction into one of the fixed output formats;
        // increments the requested usage counter exactly once.
        .route("/posters/{id}/export", post(handlers::export_poster))
        // GET /posters/{id}/share
        // Lazily assigns the stable public identifier (APPROVED only).
        .route("/posters/{id}/share", get(handlers::get_share_link))
        // POST /posters/{id}/artwork-upload
        // Presigned direct-to-storage upload for the master surface.
        .route(
            "/posters/{id}/artwork-upload",
            post(handlers::request_artwork_upload),
        )
        // --- Analytics ---
        // Scoped aggregate statistics (viewAnalytics).
        .route("/analytics", get(handlers::get_analytics))
}

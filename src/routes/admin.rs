use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Moderation and oversight endpoints. The router itself sits behind the
/// authentication layer; each handler then checks the specific capability
/// it needs (`editAllContent`, `reviewContent`, `viewAllAnalytics`), so a
/// reviewer can read the queue without being able to pull global
/// statistics.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Unscoped dashboard metrics (counts by status, usage totals).
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/posters
        // Every poster in the system, including drafts and rejected ones,
        // for moderation and queue management.
        .route("/posters", get(handlers::get_admin_posters))
        // GET /admin/review-queue
        // Posters currently awaiting a decision, oldest first.
        .route("/review-queue", get(handlers::get_review_queue))
}

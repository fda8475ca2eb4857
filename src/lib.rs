use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod permissions;
pub mod render;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::Principal; // The resolved authenticated identity.
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point.
pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use render::{MockRenderService, RenderState, S3RenderSource};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation for the application by
/// aggregating every `#[utoipa::path]` handler and `ToSchema` model.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_me, handlers::register_user, handlers::list_posters,
        handlers::create_poster, handlers::get_poster_details, handlers::update_poster,
        handlers::delete_poster, handlers::review_poster, handlers::get_poster_reviews,
        handlers::get_poster_history, handlers::export_poster, handlers::get_share_link,
        handlers::get_public_poster, handlers::request_artwork_upload,
        handlers::get_analytics, handlers::get_admin_posters, handlers::get_review_queue,
        handlers::get_admin_stats
    ),
    components(
        schemas(
            models::Role, models::PosterStatus, models::ReviewDecision,
            models::ExportFormat, models::ExportKind, models::Poster, models::Review,
            models::StatusHistoryEntry, models::CreatePosterRequest,
            models::UpdatePosterRequest, models::ReviewRequest, models::ReviewResponse,
            models::ExportRequest, models::RegisterUserRequest, models::User,
            models::ArtworkUploadRequest, models::ArtworkUploadResponse,
            models::ShareLinkResponse, models::PublicPosterResponse,
            models::UserProfile, models::AnalyticsOverview,
        )
    ),
    tags(
        (name = "poster-portal", description = "Health Awareness Poster Governance API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across every incoming request.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: durable storage for posters, reviews, history,
    /// and profiles.
    pub repo: RepositoryState,
    /// Render Collaborator: master surface retrieval and artwork upload.
    pub render: RenderState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow handlers and extractors to selectively pull components from the
// shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for RenderState {
    fn from_ref(app_state: &AppState) -> RenderState {
        app_state.render.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the authenticated router by attempting to
/// extract `Principal` from the request. The extractor rejects with 401
/// before the handler runs if JWT validation or the profile lookup fails;
/// on success the request proceeds and handlers re-extract the same
/// principal value.
async fn auth_middleware(_principal: Principal, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: protected by the auth middleware.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin Routes: nested under '/admin', authenticated like the rest;
        // capability checks happen inside the handlers.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID per request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle
                // in a span correlated by the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the TraceLayer span with the `x-request-id` header so every
/// log line of a single request carries the same correlation ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

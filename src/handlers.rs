use crate::{
    AppState,
    auth::Principal,
    error::ApiError,
    export::{self, ExportArtifact},
    lifecycle,
    models::{
        self, AnalyticsOverview, ArtworkUploadRequest, ArtworkUploadResponse,
        CreatePosterRequest, ExportRequest, Poster, PosterStatus, PublicPosterResponse,
        RegisterUserRequest, Review, ReviewRequest, ReviewResponse, Role, ShareLinkResponse,
        StatusHistoryEntry, UpdatePosterRequest, User, UserProfile,
    },
    permissions::{self, Capability},
    render,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rand::{Rng, distributions::Alphanumeric};
use serde::Deserialize;
use uuid::Uuid;

/// IdentityProviderResponse
///
/// Minimal struct to deserialize the external identity provider's signup
/// response, capturing the newly created user's UUID.
#[derive(Deserialize)]
struct IdentityProviderResponse {
    id: Uuid,
}

// --- Poster Access Helpers ---

/// Fetches a poster or terminates the request with NotFound.
async fn require_poster(state: &AppState, id: Uuid) -> Result<Poster, ApiError> {
    state.repo.get_poster(id).await.ok_or(ApiError::NotFound)
}

/// Read access to a poster's governance data (detail view, reviews,
/// history): the owner, anyone who can edit all content, and anyone who
/// can review content.
fn can_view_governed(principal: &Principal, poster: &Poster) -> bool {
    poster.owner_id == principal.id
        || permissions::has_capability(principal.role, Capability::EditAllContent)
        || permissions::has_capability(principal.role, Capability::ReviewContent)
}

// --- Profile & Registration Handlers ---

/// get_me
///
/// [Authenticated Route] The authenticated principal's profile, read back
/// from the mirrored profile row.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .get_user(principal.id)
        .await
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        role: Role::from_str_lossy(&user.role),
    }))
}

/// register_user
///
/// [Public Route] Relays registration to the external identity provider,
/// then mirrors the resulting identity into the local `profiles` table so
/// primary keys stay synchronized between the provider and this schema.
/// The requested role string is normalized through the fail-closed parser
/// before it is stored.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses((status = 200, description = "Registered", body = User))
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<User>, ApiError> {
    let provider_url =
        std::env::var("IDENTITY_PROVIDER_URL").map_err(|_| ApiError::Internal)?;
    let provider_key =
        std::env::var("IDENTITY_PROVIDER_KEY").map_err(|_| ApiError::Internal)?;

    // Step 1: Call the external identity provider.
    let client = reqwest::Client::new();
    let signup_url = format!("{}/signup", provider_url);

    let response = client
        .post(signup_url)
        .header("apikey", provider_key)
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({ "email": payload.email, "password": payload.password }))
        .send()
        .await
        .map_err(|_| ApiError::Internal)?;

    if !response.status().is_success() {
        // The provider rejected the signup (duplicate email, weak password).
        return Err(ApiError::Validation("registration rejected".to_string()));
    }

    // Step 2: Extract the canonical user ID from the provider response.
    let identity = response
        .json::<IdentityProviderResponse>()
        .await
        .map_err(|_| ApiError::Internal)?;

    // Step 3: Mirror the profile locally, with the role normalized.
    let new_user = User {
        id: identity.id,
        email: payload.email,
        role: Role::from_str_lossy(&payload.role).as_str().to_string(),
    };

    let created_user = state.repo.create_user(new_user).await?;

    Ok(Json(created_user))
}

// --- Poster CRUD Handlers ---

/// list_posters
///
/// [Authenticated Route] Role-aware listing: principals holding
/// `editAllContent` see every poster (the moderation view), everyone else
/// sees only their own, including drafts and rejected ones.
#[utoipa::path(
    get,
    path = "/posters",
    responses((status = 200, description = "Posters", body = [Poster]))
)]
pub async fn list_posters(
    principal: Principal,
    State(state): State<AppState>,
) -> Json<Vec<models::Poster>> {
    let posters = if permissions::has_capability(principal.role, Capability::EditAllContent) {
        state.repo.get_all_posters().await
    } else {
        state.repo.get_posters_for_owner(principal.id).await
    };
    Json(posters)
}

/// create_poster
///
/// [Authenticated Route] Submits a new poster, owned by the principal and
/// created in `DRAFT`. Requires the `createContent` capability; title,
/// topic, and message must be non-empty.
#[utoipa::path(
    post,
    path = "/posters",
    request_body = CreatePosterRequest,
    responses(
        (status = 201, description = "Created", body = Poster),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_poster(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreatePosterRequest>,
) -> Result<(StatusCode, Json<models::Poster>), ApiError> {
    if !permissions::has_capability(principal.role, Capability::CreateContent) {
        return Err(ApiError::Forbidden);
    }
    for (field, value) in [
        ("title", &payload.title),
        ("topic", &payload.topic),
        ("message", &payload.message),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{field} is required")));
        }
    }

    let poster = state.repo.create_poster(payload, principal.id).await?;
    Ok((StatusCode::CREATED, Json(poster)))
}

/// get_poster_details
///
/// [Authenticated Route] Single poster detail view, for the owner and for
/// principals who moderate or review content.
#[utoipa::path(
    get,
    path = "/posters/{id}",
    params(("id" = Uuid, Path, description = "Poster ID")),
    responses(
        (status = 200, description = "Found", body = Poster),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_poster_details(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Poster>, ApiError> {
    let poster = require_poster(&state, id).await?;
    if !can_view_governed(&principal, &poster) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(poster))
}

/// update_poster
///
/// [Authenticated Route] Partial update of a poster's content fields.
///
/// *Authorization*: the ownership guard with the edit capability pair.
/// Principals with `editAllContent` act on any poster; `editOwnContent`
/// holders only on their own.
#[utoipa::path(
    put,
    path = "/posters/{id}",
    request_body = UpdatePosterRequest,
    responses(
        (status = 200, description = "Updated", body = Poster),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_poster(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePosterRequest>,
) -> Result<Json<models::Poster>, ApiError> {
    let poster = require_poster(&state, id).await?;
    if !permissions::can_edit_poster(&principal, &poster) {
        return Err(ApiError::Forbidden);
    }
    // A concurrent delete between the check and the update reads as gone.
    state
        .repo
        .update_poster(id, payload)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_poster
///
/// [Authenticated Route] Deletes a poster and, as a cascade, its reviews
/// and status history.
///
/// *Authorization*: the ownership guard with the delete capability pair;
/// exactly the edit check with a different pair supplied.
#[utoipa::path(
    delete,
    path = "/posters/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_poster(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let poster = require_poster(&state, id).await?;
    if !permissions::can_delete_poster(&principal, &poster) {
        return Err(ApiError::Forbidden);
    }
    if state.repo.delete_poster(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Review & Audit Handlers ---

/// review_poster
///
/// [Authenticated Route] Submits one review decision, driving the poster
/// lifecycle. Preconditions: `reviewContent` (plus `approveContent` when
/// the decision is APPROVED) and a non-empty comment. The accepted
/// transition is applied atomically: Review record, status update, and
/// StatusHistoryEntry all land in one transaction or not at all.
///
/// Re-reviewing an APPROVED or REJECTED poster is allowed; review here is
/// revisable, not final.
#[utoipa::path(
    post,
    path = "/posters/{id}/review",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Reviewed", body = ReviewResponse),
        (status = 400, description = "Missing comment"),
        (status = 403, description = "Not a reviewer"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Poster changed concurrently")
    )
)]
pub async fn review_poster(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    lifecycle::authorize_review(principal.role, payload.decision)?;
    lifecycle::validate_comment(&payload.comment)?;

    // Existence check before any mutation: an insufficient capability or
    // a missing poster leaves nothing appended anywhere.
    require_poster(&state, id).await?;

    let transition = lifecycle::transition_for(payload.decision);
    let (review, poster) = state
        .repo
        .apply_review(id, principal.id, payload.decision, &payload.comment, transition)
        .await
        .map_err(|e| match e {
            // The poster was deleted between the check and the transaction.
            sqlx::Error::RowNotFound => {
                ApiError::Conflict("poster no longer exists".to_string())
            }
            other => ApiError::from(other),
        })?;

    Ok(Json(ReviewResponse {
        review,
        new_status: poster.status,
    }))
}

/// get_poster_reviews
///
/// [Authenticated Route] The immutable review records for a poster,
/// newest first.
#[utoipa::path(
    get,
    path = "/posters/{id}/reviews",
    responses((status = 200, description = "Reviews", body = [Review]))
)]
pub async fn get_poster_reviews(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<models::Review>>, ApiError> {
    let poster = require_poster(&state, id).await?;
    if !can_view_governed(&principal, &poster) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(state.repo.get_reviews(id).await))
}

/// get_poster_history
///
/// [Authenticated Route] The append-only audit trail of status changes,
/// oldest first. Readable by everyone who could already see the inputs:
/// the owner and review-capable principals.
#[utoipa::path(
    get,
    path = "/posters/{id}/history",
    responses((status = 200, description = "Status history", body = [StatusHistoryEntry]))
)]
pub async fn get_poster_history(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<models::StatusHistoryEntry>>, ApiError> {
    let poster = require_poster(&state, id).await?;
    if !can_view_governed(&principal, &poster) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(state.repo.get_status_history(id).await))
}

// --- Export & Sharing Handlers ---

/// export_poster
///
/// [Authenticated Route] Extracts a poster into one of the fixed output
/// representations.
///
/// Order of operations: the export gate re-checks the *current* status
/// and the principal, the render collaborator supplies the source
/// surface, the engine reshapes it, and only then is the requested usage
/// counter incremented (atomically, exactly once). A render failure
/// therefore increments nothing and surfaces as the generic ExportFailed.
#[utoipa::path(
    post,
    path = "/posters/{id}/export",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Artifact bytes"),
        (status = 403, description = "Not exportable by this principal"),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Render collaborator failed")
    )
)]
pub async fn export_poster(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExportRequest>,
) -> Result<ExportArtifact, ApiError> {
    let poster = require_poster(&state, id).await?;
    if !export::can_export(&principal, &poster) {
        return Err(ApiError::Forbidden);
    }

    let surface = state.render.fetch_surface(id).await.map_err(|e| {
        // Log the collaborator's detail, return the generic failure.
        tracing::error!("render collaborator failed for poster {}: {}", id, e);
        ApiError::ExportFailed
    })?;

    let artifact = export::render(&surface, payload.format);

    if !state.repo.record_export(id, payload.kind).await {
        // The poster vanished after authorization; the artifact must not
        // leave without its counter.
        return Err(ApiError::Conflict("poster no longer exists".to_string()));
    }

    Ok(artifact)
}

/// get_share_link
///
/// [Authenticated Route] Returns the poster's stable public identifier and
/// URL, generating the identifier lazily on first request. Only APPROVED
/// posters are shareable.
///
/// Concurrent first requests race on the lazy claim; the conditional
/// single-row update means one writer wins and everyone else rereads and
/// returns the winner's identifier.
#[utoipa::path(
    get,
    path = "/posters/{id}/share",
    responses(
        (status = 200, description = "Share link", body = ShareLinkResponse),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Poster is not approved")
    )
)]
pub async fn get_share_link(
    _principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareLinkResponse>, ApiError> {
    let poster = require_poster(&state, id).await?;
    if poster.status != PosterStatus::Approved {
        return Err(ApiError::Conflict("poster is not approved".to_string()));
    }

    let public_id = match poster.public_id {
        Some(existing) => existing,
        None => {
            let candidate = new_public_id(poster.id);
            match state.repo.try_claim_public_id(id, &candidate).await? {
                Some(claimed) => claimed,
                // Lost the race: reread and return the winner's value.
                None => require_poster(&state, id)
                    .await?
                    .public_id
                    .ok_or(ApiError::Internal)?,
            }
        }
    };

    let public_url = format!(
        "{}/public/posters/{}",
        state.config.public_base_url, public_id
    );
    Ok(Json(ShareLinkResponse {
        public_id,
        public_url,
    }))
}

/// Short, unique, URL-safe share identifier: a stable poster prefix plus
/// a random suffix, collision-guarded by the unique index on the column.
fn new_public_id(poster_id: Uuid) -> String {
    let prefix: String = poster_id.simple().to_string().chars().take(8).collect();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("poster-{prefix}-{suffix}")
}

/// get_public_poster
///
/// [Public Route] The unauthenticated share view. Serves a reduced
/// projection of APPROVED posters only; any other status answers 404, the
/// same as a missing poster, so unauthenticated callers cannot learn that
/// unapproved content exists.
#[utoipa::path(
    get,
    path = "/public/posters/{public_id}",
    params(("public_id" = String, Path, description = "Public share ID")),
    responses(
        (status = 200, description = "Poster", body = PublicPosterResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_public_poster(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Json<PublicPosterResponse>, ApiError> {
    let poster = state
        .repo
        .get_poster_by_public_id(&public_id)
        .await
        .ok_or(ApiError::NotFound)?;

    if poster.status != PosterStatus::Approved {
        return Err(ApiError::NotFound);
    }

    Ok(Json(PublicPosterResponse::from(poster)))
}

/// request_artwork_upload
///
/// [Authenticated Route] Issues a short-lived presigned URL for uploading
/// a poster's master artwork surface directly to object storage,
/// bypassing the application server.
///
/// *Authorization*: the ownership guard with the edit capability pair;
/// replacing artwork is an edit.
#[utoipa::path(
    post,
    path = "/posters/{id}/artwork-upload",
    request_body = ArtworkUploadRequest,
    responses(
        (status = 200, description = "Upload URL", body = ArtworkUploadResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn request_artwork_upload(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ArtworkUploadRequest>,
) -> Result<Json<ArtworkUploadResponse>, ApiError> {
    let poster = require_poster(&state, id).await?;
    if !permissions::can_edit_poster(&principal, &poster) {
        return Err(ApiError::Forbidden);
    }

    let upload_url = state
        .render
        .artwork_upload_url(id, &payload.content_type)
        .await
        .map_err(|e| {
            tracing::error!("artwork upload url error: {}", e);
            ApiError::Internal
        })?;

    Ok(Json(ArtworkUploadResponse {
        upload_url,
        surface_key: render::surface_key(id),
    }))
}

// --- Analytics & Admin Handlers ---

/// get_analytics
///
/// [Authenticated Route] Aggregate poster statistics. Requires
/// `viewAnalytics`; the scope widens from own posters to the whole system
/// when the role also holds `viewAllAnalytics`.
#[utoipa::path(
    get,
    path = "/analytics",
    responses((status = 200, description = "Analytics", body = AnalyticsOverview))
)]
pub async fn get_analytics(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsOverview>, ApiError> {
    if !permissions::has_capability(principal.role, Capability::ViewAnalytics) {
        return Err(ApiError::Forbidden);
    }
    let owner = if permissions::has_capability(principal.role, Capability::ViewAllAnalytics) {
        None
    } else {
        Some(principal.id)
    };
    Ok(Json(state.repo.get_analytics(owner).await))
}

/// get_admin_posters
///
/// [Admin Route] Every poster in the system regardless of owner and
/// status, for moderation oversight. Requires `editAllContent`.
#[utoipa::path(
    get,
    path = "/admin/posters",
    responses((status = 200, description = "All posters", body = [Poster]))
)]
pub async fn get_admin_posters(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Poster>>, ApiError> {
    if !permissions::has_capability(principal.role, Capability::EditAllContent) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(state.repo.get_all_posters().await))
}

/// get_review_queue
///
/// [Admin Route] Posters awaiting a decision (UNDER_REVIEW), oldest
/// first. Requires `reviewContent`.
#[utoipa::path(
    get,
    path = "/admin/review-queue",
    responses((status = 200, description = "Review queue", body = [Poster]))
)]
pub async fn get_review_queue(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Poster>>, ApiError> {
    if !permissions::has_capability(principal.role, Capability::ReviewContent) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(
        state
            .repo
            .get_posters_by_status(PosterStatus::UnderReview)
            .await,
    ))
}

/// get_admin_stats
///
/// [Admin Route] The unscoped analytics overview for the dashboard.
/// Requires `viewAllAnalytics`.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = AnalyticsOverview))
)]
pub async fn get_admin_stats(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsOverview>, ApiError> {
    if !permissions::has_capability(principal.role, Capability::ViewAllAnalytics) {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(state.repo.get_analytics(None).await))
}

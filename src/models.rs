use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations (Fixed Vocabularies) ---

/// Role
///
/// The fixed, ordered role set of the platform: `SUPER_ADMIN > ADMIN >
/// CONTENT_MANAGER > REVIEWER > USER`. Roles are not extensible at runtime;
/// every capability decision is a lookup against the constant tables in
/// `permissions.rs`.
///
/// Parsing is fail-closed: any string that is not one of the five known
/// role names resolves to `User`, the least-privileged role, so a corrupt
/// or stale role value degrades to maximally restrictive behavior instead
/// of failing the request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    SuperAdmin,
    Admin,
    ContentManager,
    Reviewer,
    #[default]
    User,
}

impl Role {
    /// Normalizes an arbitrary stored role string into a `Role`.
    /// Unknown values map to `Role::User` (fail-closed).
    pub fn from_str_lossy(value: &str) -> Role {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Role::SuperAdmin,
            "ADMIN" => Role::Admin,
            "CONTENT_MANAGER" => Role::ContentManager,
            "REVIEWER" => Role::Reviewer,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::ContentManager => "CONTENT_MANAGER",
            Role::Reviewer => "REVIEWER",
            Role::User => "USER",
        }
    }

    /// All roles, most privileged first. Used by the exhaustive matrix tests.
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::ContentManager,
        Role::Reviewer,
        Role::User,
    ];
}

/// UnknownVariant
///
/// Decode error for enum-typed TEXT columns. A poster row whose `status`
/// column holds an unknown value is corrupt data, not a degradable input,
/// so (unlike `Role`) these parses are strict.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// PosterStatus
///
/// The poster lifecycle states. `Draft` is initial. `Approved` and
/// `Rejected` are re-reviewable, not terminal: a later review can move a
/// poster out of either state again.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PosterStatus {
    #[default]
    Draft,
    UnderReview,
    Approved,
    Rejected,
}

impl PosterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PosterStatus::Draft => "DRAFT",
            PosterStatus::UnderReview => "UNDER_REVIEW",
            PosterStatus::Approved => "APPROVED",
            PosterStatus::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for PosterStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "DRAFT" => Ok(PosterStatus::Draft),
            "UNDER_REVIEW" => Ok(PosterStatus::UnderReview),
            "APPROVED" => Ok(PosterStatus::Approved),
            "REJECTED" => Ok(PosterStatus::Rejected),
            other => Err(UnknownVariant {
                kind: "poster status",
                value: other.to_string(),
            }),
        }
    }
}

/// ReviewDecision
///
/// One reviewer's verdict on a poster. The decision drives the lifecycle
/// transition table in `lifecycle.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ReviewDecision {
    Approved,
    Rejected,
    RequestChanges,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "APPROVED",
            ReviewDecision::Rejected => "REJECTED",
            ReviewDecision::RequestChanges => "REQUEST_CHANGES",
        }
    }
}

impl std::str::FromStr for ReviewDecision {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "APPROVED" => Ok(ReviewDecision::Approved),
            "REJECTED" => Ok(ReviewDecision::Rejected),
            "REQUEST_CHANGES" => Ok(ReviewDecision::RequestChanges),
            other => Err(UnknownVariant {
                kind: "review decision",
                value: other.to_string(),
            }),
        }
    }
}

/// ExportFormat
///
/// The fixed output-representation enumeration for the export engine.
/// Target boxes, orientation, and document wrapping live in `export.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum ExportFormat {
    PngHq,
    PdfA4,
    PdfA3,
    Instagram,
    Whatsapp,
    Facebook,
}

/// ExportKind
///
/// Which usage counter a permitted export increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ExportKind {
    #[default]
    Download,
    Print,
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The mirrored profile row for an externally-authenticated identity.
/// The role is stored as text and normalized into `Role` only at the
/// `Principal` boundary in `auth.rs`, so a bad stored value can never
/// escalate privileges.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// Poster
///
/// The governed entity. Status is always one of the four lifecycle states;
/// `public_id`, once assigned, never changes; the two counters are
/// monotonically non-decreasing (incremented only through the atomic
/// repository update, never read-modify-write).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Poster {
    pub id: Uuid,
    // FK to public.profiles.id (Owner).
    pub owner_id: Uuid,
    pub title: String,
    pub topic: String,
    pub message: String,
    pub footer_text: String,

    pub status: PosterStatus,
    // Stable share identifier, assigned once on first share-link request.
    pub public_id: Option<String>,
    // The most recent reviewer (last-writer-wins under concurrent review).
    pub reviewer_id: Option<Uuid>,
    pub rejection_reason: Option<String>,

    pub download_count: i64,
    pub print_count: i64,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub approved_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub rejected_at: Option<DateTime<Utc>>,
}

/// Manual row mapping: `status` is stored as TEXT and decoded strictly,
/// so a corrupt row surfaces as a column decode error instead of a
/// silently mislabeled poster.
impl FromRow<'_, PgRow> for Poster {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Poster {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            topic: row.try_get("topic")?,
            message: row.try_get("message")?,
            footer_text: row.try_get("footer_text")?,
            status: status.parse().map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".into(),
                source: Box::new(e),
            })?,
            public_id: row.try_get("public_id")?,
            reviewer_id: row.try_get("reviewer_id")?,
            rejection_reason: row.try_get("rejection_reason")?,
            download_count: row.try_get("download_count")?,
            print_count: row.try_get("print_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            approved_at: row.try_get("approved_at")?,
            rejected_at: row.try_get("rejected_at")?,
        })
    }
}

/// Review
///
/// An immutable record of one reviewer's decision. Created once per review
/// action, never mutated or deleted; it is evidence, not configuration.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub poster_id: Uuid,
    pub reviewer_id: Uuid,
    pub decision: ReviewDecision,
    pub comment: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for Review {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let decision: String = row.try_get("decision")?;
        Ok(Review {
            id: row.try_get("id")?,
            poster_id: row.try_get("poster_id")?,
            reviewer_id: row.try_get("reviewer_id")?,
            decision: decision.parse().map_err(|e| sqlx::Error::ColumnDecode {
                index: "decision".into(),
                source: Box::new(e),
            })?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// StatusHistoryEntry
///
/// One append-only audit row per status change, including the first
/// transition out of `DRAFT`. Owned by the poster's lifecycle; removed
/// only as a cascade of poster deletion, never independently.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub poster_id: Uuid,
    pub resulting_status: PosterStatus,
    pub changed_by: Uuid,
    pub comment: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for StatusHistoryEntry {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let resulting_status: String = row.try_get("resulting_status")?;
        Ok(StatusHistoryEntry {
            id: row.try_get("id")?,
            poster_id: row.try_get("poster_id")?,
            resulting_status: resulting_status.parse().map_err(|e| {
                sqlx::Error::ColumnDecode {
                    index: "resulting_status".into(),
                    source: Box::new(e),
                }
            })?,
            changed_by: row.try_get("changed_by")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreatePosterRequest
///
/// Input payload for submitting a new poster (POST /posters). The poster
/// is created in `DRAFT` and owned by the authenticated principal.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePosterRequest {
    pub title: String,
    pub topic: String,
    pub message: String,
    /// Defaults to the ministry attribution line when omitted.
    pub footer_text: Option<String>,
}

/// UpdatePosterRequest
///
/// Partial update payload (PUT /posters/{id}). Uses `Option<T>` plus
/// `skip_serializing_if` so only provided fields travel on the wire and
/// only those columns are touched (COALESCE in the repository).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePosterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
}

/// ReviewRequest
///
/// Input payload for POST /posters/{id}/review. The comment is mandatory:
/// a review without a stated reason is invalid input, not a silently
/// accepted decision.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub comment: String,
}

/// ExportRequest
///
/// Input payload for POST /posters/{id}/export. `kind` selects which
/// usage counter the export increments and defaults to `download`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ExportRequest {
    pub format: ExportFormat,
    #[serde(default)]
    pub kind: ExportKind,
}

/// RegisterUserRequest
///
/// Input payload for the public registration endpoint (POST /register).
/// The password is only relayed to the external identity provider and
/// never persisted or logged by this application.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

/// ArtworkUploadRequest
///
/// Input payload for requesting a presigned master-artwork upload URL.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArtworkUploadRequest {
    /// The MIME type the upload will be constrained to.
    #[schema(example = "application/octet-stream")]
    pub content_type: String,
}

/// ArtworkUploadResponse
///
/// The time-limited URL for the PUT request plus the object key the
/// surface will live under.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArtworkUploadResponse {
    pub upload_url: String,
    pub surface_key: String,
}

// --- Output Schemas ---

/// ReviewResponse
///
/// Result of an accepted review: the created evidence record and the
/// poster's new live status.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReviewResponse {
    pub review: Review,
    pub new_status: PosterStatus,
}

/// ShareLinkResponse
///
/// The stable public identifier and the fully-qualified public URL for a
/// shareable (approved) poster.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ShareLinkResponse {
    pub public_id: String,
    pub public_url: String,
}

/// PublicPosterResponse
///
/// The reduced projection served on the unauthenticated public view.
/// Deliberately excludes owner, reviewer, and counter data.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PublicPosterResponse {
    pub id: Uuid,
    pub title: String,
    pub topic: String,
    pub message: String,
    pub footer_text: String,
    pub status: PosterStatus,
}

impl From<Poster> for PublicPosterResponse {
    fn from(p: Poster) -> Self {
        PublicPosterResponse {
            id: p.id,
            title: p.title,
            topic: p.topic,
            message: p.message,
            footer_text: p.footer_text,
            status: p.status,
        }
    }
}

/// UserProfile
///
/// Output schema for the authenticated principal's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// AnalyticsOverview
///
/// Aggregate counters for the analytics dashboard. Scoped to the caller's
/// own posters unless the role holds `viewAllAnalytics`; `total_users` is
/// populated only for the unscoped (privileged) view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AnalyticsOverview {
    pub total_posters: i64,
    pub draft_posters: i64,
    pub under_review_posters: i64,
    pub approved_posters: i64,
    pub rejected_posters: i64,
    pub total_downloads: i64,
    pub total_prints: i64,
    /// Posters created in the last 30 days.
    pub recent_posters: i64,
    pub total_users: i64,
}

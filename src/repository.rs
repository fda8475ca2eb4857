use crate::lifecycle::Transition;
use crate::models::{
    AnalyticsOverview, CreatePosterRequest, ExportKind, Poster, PosterStatus, Review,
    ReviewDecision, StatusHistoryEntry, UpdatePosterRequest, User,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for all persistence operations, so handlers talk
/// to the data layer without knowing the implementation (Postgres in
/// production, in-memory in tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's async task
/// boundaries.
///
/// Read failures degrade to empty results after logging; mutations either
/// report whether a row was touched or propagate the error so the handler
/// can map it onto the request-terminal taxonomy.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Poster Retrieval ---
    async fn get_poster(&self, id: Uuid) -> Option<Poster>;
    // Public share path: resolves the stable public identifier.
    async fn get_poster_by_public_id(&self, public_id: &str) -> Option<Poster>;
    async fn get_posters_for_owner(&self, owner_id: Uuid) -> Vec<Poster>;
    // Privileged access: every poster regardless of owner and status.
    async fn get_all_posters(&self) -> Vec<Poster>;
    // Review queue and similar status-scoped listings.
    async fn get_posters_by_status(&self, status: PosterStatus) -> Vec<Poster>;

    // --- Poster Actions ---
    async fn create_poster(
        &self,
        req: CreatePosterRequest,
        owner_id: Uuid,
    ) -> Result<Poster, sqlx::Error>;
    // Partial update via COALESCE; authorization happens in the handler
    // through the ownership guard, so no owner filter here.
    async fn update_poster(&self, id: Uuid, req: UpdatePosterRequest) -> Option<Poster>;
    // Deletes the poster and cascades to its reviews and status history
    // (they have no independent lifecycle).
    async fn delete_poster(&self, id: Uuid) -> bool;

    // --- Lifecycle (applied atomically) ---
    /// Applies one accepted review decision in a single transaction:
    /// insert the Review, update the Poster's status/reviewer/timestamps,
    /// append one StatusHistoryEntry. A reader never observes a Review
    /// without its history row or vice versa. `RowNotFound` means the
    /// poster vanished between the handler's check and the transaction.
    async fn apply_review(
        &self,
        poster_id: Uuid,
        reviewer_id: Uuid,
        decision: ReviewDecision,
        comment: &str,
        transition: Transition,
    ) -> Result<(Review, Poster), sqlx::Error>;
    async fn get_reviews(&self, poster_id: Uuid) -> Vec<Review>;

    // --- Status History (append-only audit trail) ---
    // Appends happen only inside `apply_review`; this interface offers no
    // mutation of existing entries. Ordered oldest first, unbounded.
    async fn get_status_history(&self, poster_id: Uuid) -> Vec<StatusHistoryEntry>;

    // --- Export Side Effects ---
    /// Atomic single-field increment of the download or print counter.
    /// Never read-modify-write: concurrent exports must not lose updates.
    async fn record_export(&self, poster_id: Uuid, kind: ExportKind) -> bool;
    /// Single-row conditional claim of the lazy public identifier
    /// (`WHERE public_id IS NULL`). `Ok(None)` means another request won
    /// the race (or the poster is gone); the caller rereads and returns
    /// the winner's value. A duplicate-key write on the unique index is
    /// treated as the same lost race, not an error.
    async fn try_claim_public_id(
        &self,
        poster_id: Uuid,
        candidate: &str,
    ) -> Result<Option<String>, sqlx::Error>;

    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn create_user(&self, user: User) -> Result<User, sqlx::Error>;

    // --- Analytics ---
    /// Aggregate counters, scoped to one owner when `owner` is Some.
    /// `total_users` is only computed for the unscoped view.
    async fn get_analytics(&self, owner: Option<Uuid>) -> AnalyticsOverview;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by
/// PostgreSQL. All queries use the runtime query API with explicit binds,
/// so the crate builds without a live database and there is no SQL string
/// interpolation of caller data anywhere.
pub struct PostgresRepository {
    pool: PgPool,
}

/// The full poster projection; every poster query returns the same shape.
const POSTER_COLUMNS: &str = "id, owner_id, title, topic, message, footer_text, status, \
     public_id, reviewer_id, rejection_reason, download_count, print_count, \
     created_at, updated_at, approved_at, rejected_at";

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_poster(&self, id: Uuid) -> Option<Poster> {
        sqlx::query_as::<_, Poster>(&format!(
            "SELECT {POSTER_COLUMNS} FROM posters WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_poster error: {:?}", e);
            None
        })
    }

    async fn get_poster_by_public_id(&self, public_id: &str) -> Option<Poster> {
        sqlx::query_as::<_, Poster>(&format!(
            "SELECT {POSTER_COLUMNS} FROM posters WHERE public_id = $1"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_poster_by_public_id error: {:?}", e);
            None
        })
    }

    async fn get_posters_for_owner(&self, owner_id: Uuid) -> Vec<Poster> {
        sqlx::query_as::<_, Poster>(&format!(
            "SELECT {POSTER_COLUMNS} FROM posters WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_posters_for_owner error: {:?}", e);
            vec![]
        })
    }

    async fn get_all_posters(&self) -> Vec<Poster> {
        sqlx::query_as::<_, Poster>(&format!(
            "SELECT {POSTER_COLUMNS} FROM posters ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_all_posters error: {:?}", e);
            vec![]
        })
    }

    async fn get_posters_by_status(&self, status: PosterStatus) -> Vec<Poster> {
        sqlx::query_as::<_, Poster>(&format!(
            "SELECT {POSTER_COLUMNS} FROM posters WHERE status = $1 ORDER BY created_at ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_posters_by_status error: {:?}", e);
            vec![]
        })
    }

    /// Inserts a new poster. Every poster starts in DRAFT with zeroed
    /// counters and no public identifier.
    async fn create_poster(
        &self,
        req: CreatePosterRequest,
        owner_id: Uuid,
    ) -> Result<Poster, sqlx::Error> {
        let footer = req
            .footer_text
            .unwrap_or_else(|| "وزارة الصحة".to_string());
        sqlx::query_as::<_, Poster>(&format!(
            "INSERT INTO posters \
                 (id, owner_id, title, topic, message, footer_text, status, \
                  download_count, print_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, NOW(), NOW()) \
             RETURNING {POSTER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(req.title)
        .bind(req.topic)
        .bind(req.message)
        .bind(footer)
        .bind(PosterStatus::Draft.as_str())
        .fetch_one(&self.pool)
        .await
    }

    /// COALESCE keeps any column whose field arrived as `None` untouched.
    async fn update_poster(&self, id: Uuid, req: UpdatePosterRequest) -> Option<Poster> {
        sqlx::query_as::<_, Poster>(&format!(
            "UPDATE posters \
             SET title = COALESCE($2, title), \
                 topic = COALESCE($3, topic), \
                 message = COALESCE($4, message), \
                 footer_text = COALESCE($5, footer_text), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {POSTER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.topic)
        .bind(req.message)
        .bind(req.footer_text)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_poster error: {:?}", e);
            None
        })
    }

    /// Reviews and history rows are owned by the poster's lifecycle, so
    /// the cascade is explicit and transactional.
    async fn delete_poster(&self, id: Uuid) -> bool {
        let result: Result<bool, sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("DELETE FROM reviews WHERE poster_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM status_history WHERE poster_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            let deleted = sqlx::query("DELETE FROM posters WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(deleted.rows_affected() > 0)
        }
        .await;

        match result {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!("delete_poster error: {:?}", e);
                false
            }
        }
    }

    async fn apply_review(
        &self,
        poster_id: Uuid,
        reviewer_id: Uuid,
        decision: ReviewDecision,
        comment: &str,
        transition: Transition,
    ) -> Result<(Review, Poster), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (id, poster_id, reviewer_id, decision, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             RETURNING id, poster_id, reviewer_id, decision, comment, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(poster_id)
        .bind(reviewer_id)
        .bind(decision.as_str())
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        // Terminal timestamps accumulate: re-review never clears the
        // other outcome's stamp, matching the append-only evidence model.
        let poster = sqlx::query_as::<_, Poster>(&format!(
            "UPDATE posters \
             SET status = $2, \
                 reviewer_id = $3, \
                 approved_at = CASE WHEN $4 THEN NOW() ELSE approved_at END, \
                 rejected_at = CASE WHEN $5 THEN NOW() ELSE rejected_at END, \
                 rejection_reason = CASE WHEN $5 THEN $6 ELSE rejection_reason END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {POSTER_COLUMNS}"
        ))
        .bind(poster_id)
        .bind(transition.resulting_status.as_str())
        .bind(reviewer_id)
        .bind(transition.sets_approved_at)
        .bind(transition.sets_rejected_at)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO status_history \
                 (id, poster_id, resulting_status, changed_by, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(poster_id)
        .bind(transition.resulting_status.as_str())
        .bind(reviewer_id)
        .bind(comment)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((review, poster))
    }

    async fn get_reviews(&self, poster_id: Uuid) -> Vec<Review> {
        sqlx::query_as::<_, Review>(
            "SELECT id, poster_id, reviewer_id, decision, comment, created_at \
             FROM reviews WHERE poster_id = $1 ORDER BY created_at DESC",
        )
        .bind(poster_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_reviews error: {:?}", e);
            vec![]
        })
    }

    async fn get_status_history(&self, poster_id: Uuid) -> Vec<StatusHistoryEntry> {
        sqlx::query_as::<_, StatusHistoryEntry>(
            "SELECT id, poster_id, resulting_status, changed_by, comment, created_at \
             FROM status_history WHERE poster_id = $1 ORDER BY created_at ASC",
        )
        .bind(poster_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_status_history error: {:?}", e);
            vec![]
        })
    }

    /// The increment happens in the database, so concurrent exports each
    /// add exactly one and no update is lost.
    async fn record_export(&self, poster_id: Uuid, kind: ExportKind) -> bool {
        let query = match kind {
            ExportKind::Download => {
                "UPDATE posters SET download_count = download_count + 1 WHERE id = $1"
            }
            ExportKind::Print => "UPDATE posters SET print_count = print_count + 1 WHERE id = $1",
        };
        match sqlx::query(query).bind(poster_id).execute(&self.pool).await {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("record_export error: {:?}", e);
                false
            }
        }
    }

    async fn try_claim_public_id(
        &self,
        poster_id: Uuid,
        candidate: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posters SET public_id = $2, updated_at = NOW() \
             WHERE id = $1 AND public_id IS NULL",
        )
        .bind(poster_id)
        .bind(candidate)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) if res.rows_affected() > 0 => Ok(Some(candidate.to_string())),
            // Zero rows: the identifier was already assigned.
            Ok(_) => Ok(None),
            // The unique index on public_id caught a colliding candidate:
            // same outcome as losing the race, the caller rereads.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or(None)
    }

    /// Creates the mirroring profile record after external identity
    /// provider success.
    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO profiles (id, email, role) VALUES ($1, $2, $3) \
             RETURNING id, email, role",
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_analytics(&self, owner: Option<Uuid>) -> AnalyticsOverview {
        let row = sqlx::query(
            "SELECT \
                 COUNT(*) AS total_posters, \
                 COUNT(*) FILTER (WHERE status = 'DRAFT') AS draft_posters, \
                 COUNT(*) FILTER (WHERE status = 'UNDER_REVIEW') AS under_review_posters, \
                 COUNT(*) FILTER (WHERE status = 'APPROVED') AS approved_posters, \
                 COUNT(*) FILTER (WHERE status = 'REJECTED') AS rejected_posters, \
                 COALESCE(SUM(download_count), 0)::BIGINT AS total_downloads, \
                 COALESCE(SUM(print_count), 0)::BIGINT AS total_prints, \
                 COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '30 days') \
                     AS recent_posters \
             FROM posters WHERE $1::uuid IS NULL OR owner_id = $1",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await;

        let mut overview = match row {
            Ok(row) => AnalyticsOverview {
                total_posters: row.try_get("total_posters").unwrap_or(0),
                draft_posters: row.try_get("draft_posters").unwrap_or(0),
                under_review_posters: row.try_get("under_review_posters").unwrap_or(0),
                approved_posters: row.try_get("approved_posters").unwrap_or(0),
                rejected_posters: row.try_get("rejected_posters").unwrap_or(0),
                total_downloads: row.try_get("total_downloads").unwrap_or(0),
                total_prints: row.try_get("total_prints").unwrap_or(0),
                recent_posters: row.try_get("recent_posters").unwrap_or(0),
                total_users: 0,
            },
            Err(e) => {
                tracing::error!("get_analytics error: {:?}", e);
                AnalyticsOverview::default()
            }
        };

        if owner.is_none() {
            overview.total_users = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
                .fetch_one(&self.pool)
                .await
                .unwrap_or(0);
        }

        overview
    }
}

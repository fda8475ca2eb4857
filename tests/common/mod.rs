//! Shared test fixtures: an in-memory `Repository` implementation that
//! honors the persistence contract (transactional review application,
//! atomic counter increments, conditional public-id claim) plus builders
//! for principals, posters, and surfaces.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use poster_portal::{
    AppState,
    auth::Principal,
    config::AppConfig,
    export::Surface,
    lifecycle::Transition,
    models::{
        AnalyticsOverview, CreatePosterRequest, ExportKind, Poster, PosterStatus, Review,
        ReviewDecision, Role, StatusHistoryEntry, UpdatePosterRequest, User,
    },
    render::MockRenderService,
    repository::Repository,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// --- In-Memory Repository ---

#[derive(Default)]
struct Store {
    posters: HashMap<Uuid, Poster>,
    reviews: Vec<Review>,
    history: Vec<StatusHistoryEntry>,
    users: HashMap<Uuid, User>,
}

/// InMemoryRepository
///
/// Models the Postgres repository's visible behavior over a mutex-held
/// map, so handler tests exercise the full orchestration (authorization,
/// lifecycle, audit growth, counters) without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_poster(&self, poster: Poster) {
        self.store
            .lock()
            .unwrap()
            .posters
            .insert(poster.id, poster);
    }

    pub fn seed_user(&self, user: User) {
        self.store.lock().unwrap().users.insert(user.id, user);
    }

    /// Direct read-back for assertions.
    pub fn poster(&self, id: Uuid) -> Option<Poster> {
        self.store.lock().unwrap().posters.get(&id).cloned()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_poster(&self, id: Uuid) -> Option<Poster> {
        self.store.lock().unwrap().posters.get(&id).cloned()
    }

    async fn get_poster_by_public_id(&self, public_id: &str) -> Option<Poster> {
        self.store
            .lock()
            .unwrap()
            .posters
            .values()
            .find(|p| p.public_id.as_deref() == Some(public_id))
            .cloned()
    }

    async fn get_posters_for_owner(&self, owner_id: Uuid) -> Vec<Poster> {
        self.store
            .lock()
            .unwrap()
            .posters
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect()
    }

    async fn get_all_posters(&self) -> Vec<Poster> {
        self.store.lock().unwrap().posters.values().cloned().collect()
    }

    async fn get_posters_by_status(&self, status: PosterStatus) -> Vec<Poster> {
        self.store
            .lock()
            .unwrap()
            .posters
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect()
    }

    async fn create_poster(
        &self,
        req: CreatePosterRequest,
        owner_id: Uuid,
    ) -> Result<Poster, sqlx::Error> {
        let now = Utc::now();
        let poster = Poster {
            id: Uuid::new_v4(),
            owner_id,
            title: req.title,
            topic: req.topic,
            message: req.message,
            footer_text: req.footer_text.unwrap_or_else(|| "وزارة الصحة".to_string()),
            status: PosterStatus::Draft,
            public_id: None,
            reviewer_id: None,
            rejection_reason: None,
            download_count: 0,
            print_count: 0,
            created_at: now,
            updated_at: now,
            approved_at: None,
            rejected_at: None,
        };
        self.seed_poster(poster.clone());
        Ok(poster)
    }

    async fn update_poster(&self, id: Uuid, req: UpdatePosterRequest) -> Option<Poster> {
        let mut store = self.store.lock().unwrap();
        let poster = store.posters.get_mut(&id)?;
        if let Some(title) = req.title {
            poster.title = title;
        }
        if let Some(topic) = req.topic {
            poster.topic = topic;
        }
        if let Some(message) = req.message {
            poster.message = message;
        }
        if let Some(footer_text) = req.footer_text {
            poster.footer_text = footer_text;
        }
        poster.updated_at = Utc::now();
        Some(poster.clone())
    }

    async fn delete_poster(&self, id: Uuid) -> bool {
        let mut store = self.store.lock().unwrap();
        let removed = store.posters.remove(&id).is_some();
        if removed {
            store.reviews.retain(|r| r.poster_id != id);
            store.history.retain(|h| h.poster_id != id);
        }
        removed
    }

    async fn apply_review(
        &self,
        poster_id: Uuid,
        reviewer_id: Uuid,
        decision: ReviewDecision,
        comment: &str,
        transition: Transition,
    ) -> Result<(Review, Poster), sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        if !store.posters.contains_key(&poster_id) {
            return Err(sqlx::Error::RowNotFound);
        }

        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4(),
            poster_id,
            reviewer_id,
            decision,
            comment: comment.to_string(),
            created_at: now,
        };
        store.reviews.push(review.clone());

        let poster = store.posters.get_mut(&poster_id).unwrap();
        poster.status = transition.resulting_status;
        poster.reviewer_id = Some(reviewer_id);
        if transition.sets_approved_at {
            poster.approved_at = Some(now);
        }
        if transition.sets_rejected_at {
            poster.rejected_at = Some(now);
            poster.rejection_reason = Some(comment.to_string());
        }
        poster.updated_at = now;
        let poster = poster.clone();

        store.history.push(StatusHistoryEntry {
            id: Uuid::new_v4(),
            poster_id,
            resulting_status: transition.resulting_status,
            changed_by: reviewer_id,
            comment: comment.to_string(),
            created_at: now,
        });

        Ok((review, poster))
    }

    async fn get_reviews(&self, poster_id: Uuid) -> Vec<Review> {
        self.store
            .lock()
            .unwrap()
            .reviews
            .iter()
            .rev()
            .filter(|r| r.poster_id == poster_id)
            .cloned()
            .collect()
    }

    async fn get_status_history(&self, poster_id: Uuid) -> Vec<StatusHistoryEntry> {
        self.store
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|h| h.poster_id == poster_id)
            .cloned()
            .collect()
    }

    async fn record_export(&self, poster_id: Uuid, kind: ExportKind) -> bool {
        let mut store = self.store.lock().unwrap();
        match store.posters.get_mut(&poster_id) {
            Some(poster) => {
                match kind {
                    ExportKind::Download => poster.download_count += 1,
                    ExportKind::Print => poster.print_count += 1,
                }
                true
            }
            None => false,
        }
    }

    async fn try_claim_public_id(
        &self,
        poster_id: Uuid,
        candidate: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        match store.posters.get_mut(&poster_id) {
            Some(poster) if poster.public_id.is_none() => {
                poster.public_id = Some(candidate.to_string());
                Ok(Some(candidate.to_string()))
            }
            // Already claimed, or the poster is gone: the caller rereads.
            _ => Ok(None),
        }
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.store.lock().unwrap().users.get(&id).cloned()
    }

    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        self.seed_user(user.clone());
        Ok(user)
    }

    async fn get_analytics(&self, owner: Option<Uuid>) -> AnalyticsOverview {
        let store = self.store.lock().unwrap();
        let scoped: Vec<&Poster> = store
            .posters
            .values()
            .filter(|p| owner.is_none_or(|o| p.owner_id == o))
            .collect();

        let count_status = |status: PosterStatus| -> i64 {
            scoped.iter().filter(|p| p.status == status).count() as i64
        };

        AnalyticsOverview {
            total_posters: scoped.len() as i64,
            draft_posters: count_status(PosterStatus::Draft),
            under_review_posters: count_status(PosterStatus::UnderReview),
            approved_posters: count_status(PosterStatus::Approved),
            rejected_posters: count_status(PosterStatus::Rejected),
            total_downloads: scoped.iter().map(|p| p.download_count).sum(),
            total_prints: scoped.iter().map(|p| p.print_count).sum(),
            recent_posters: scoped.len() as i64,
            total_users: if owner.is_none() {
                store.users.len() as i64
            } else {
                0
            },
        }
    }
}

// --- State & Fixture Builders ---

/// Assembles an AppState over the in-memory repository and a mock render
/// collaborator.
pub fn test_state(repo: &Arc<InMemoryRepository>, render: MockRenderService) -> AppState {
    AppState {
        repo: repo.clone(),
        render: Arc::new(render),
        config: AppConfig::default(),
    }
}

pub fn principal(role: Role) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        role,
    }
}

pub fn principal_with(id: Uuid, role: Role) -> Principal {
    Principal { id, role }
}

/// A DRAFT poster owned by `owner_id`, with realistic content fields.
pub fn draft_poster(owner_id: Uuid) -> Poster {
    let now = Utc::now();
    Poster {
        id: Uuid::new_v4(),
        owner_id,
        title: "Hand Hygiene Saves Lives".to_string(),
        topic: "Infection Prevention".to_string(),
        message: "Wash your hands with soap for at least twenty seconds.".to_string(),
        footer_text: "وزارة الصحة".to_string(),
        status: PosterStatus::Draft,
        public_id: None,
        reviewer_id: None,
        rejection_reason: None,
        download_count: 0,
        print_count: 0,
        created_at: now,
        updated_at: now,
        approved_at: None,
        rejected_at: None,
    }
}

pub fn poster_with_status(owner_id: Uuid, status: PosterStatus) -> Poster {
    Poster {
        status,
        ..draft_poster(owner_id)
    }
}

/// A uniformly-colored RGBA surface.
pub fn solid_surface(width: u32, height: u32, rgba: [u8; 4]) -> Surface {
    let pixels: Vec<u8> = rgba
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 4)
        .collect();
    Surface::new(width, height, pixels).expect("valid test surface")
}

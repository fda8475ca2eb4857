//! Export gate tests: eligibility policy, counter side effects, render
//! collaborator failure, and the export request wire format.

mod common;

use axum::Json;
use axum::extract::{Path, State};
use common::{
    InMemoryRepository, draft_poster, poster_with_status, principal, principal_with,
    solid_surface, test_state,
};
use poster_portal::{
    error::ApiError,
    export::{ExportArtifact, can_export},
    handlers,
    models::{ExportFormat, ExportKind, ExportRequest, PosterStatus, Role},
    render::MockRenderService,
};
use uuid::Uuid;

fn export(format: ExportFormat, kind: ExportKind) -> ExportRequest {
    ExportRequest { format, kind }
}

// --- Eligibility Policy ---

#[test]
fn draft_posters_export_only_for_owner_and_moderators() {
    let owner_id = Uuid::new_v4();
    let poster = draft_poster(owner_id);

    assert!(can_export(&principal_with(owner_id, Role::User), &poster));
    assert!(can_export(&principal(Role::Admin), &poster));
    assert!(can_export(&principal(Role::ContentManager), &poster));

    // Without ownership or editAllContent, unapproved material stays in.
    assert!(!can_export(&principal(Role::User), &poster));
    assert!(!can_export(&principal(Role::Reviewer), &poster));
}

#[test]
fn approved_posters_export_for_any_principal() {
    let poster = poster_with_status(Uuid::new_v4(), PosterStatus::Approved);
    for role in Role::ALL {
        assert!(can_export(&principal(role), &poster), "{role:?}");
    }
}

#[test]
fn under_review_and_rejected_behave_like_draft() {
    for status in [PosterStatus::UnderReview, PosterStatus::Rejected] {
        let poster = poster_with_status(Uuid::new_v4(), status);
        assert!(!can_export(&principal(Role::User), &poster));
        assert!(can_export(&principal(Role::Admin), &poster));
    }
}

// --- Handler: Side Effects ---

#[tokio::test]
async fn owner_export_returns_an_artifact_and_increments_download_count() {
    let repo = InMemoryRepository::new();
    let owner_id = Uuid::new_v4();
    let poster = draft_poster(owner_id);
    let poster_id = poster.id;
    repo.seed_poster(poster);
    let state = test_state(
        &repo,
        MockRenderService::new(solid_surface(200, 300, [0x12, 0x34, 0x56, 0xFF])),
    );

    let artifact = handlers::export_poster(
        principal_with(owner_id, Role::User),
        State(state),
        Path(poster_id),
        Json(export(ExportFormat::Instagram, ExportKind::Download)),
    )
    .await
    .expect("owner export of a draft is permitted");

    let ExportArtifact::Bitmap(bitmap) = artifact else {
        panic!("instagram export must be a bitmap");
    };
    assert_eq!((bitmap.width, bitmap.height), (1080, 1080));

    let poster = repo.poster(poster_id).unwrap();
    assert_eq!(poster.download_count, 1);
    assert_eq!(poster.print_count, 0);
}

#[tokio::test]
async fn stranger_export_of_a_draft_is_forbidden_and_counts_nothing() {
    let repo = InMemoryRepository::new();
    let poster = draft_poster(Uuid::new_v4());
    let poster_id = poster.id;
    repo.seed_poster(poster);
    let state = test_state(
        &repo,
        MockRenderService::new(solid_surface(200, 300, [0, 0, 0, 0xFF])),
    );

    let result = handlers::export_poster(
        principal(Role::User),
        State(state),
        Path(poster_id),
        Json(export(ExportFormat::PngHq, ExportKind::Download)),
    )
    .await;

    assert!(matches!(result, Err(ApiError::Forbidden)));
    assert_eq!(repo.poster(poster_id).unwrap().download_count, 0);
}

#[tokio::test]
async fn print_kind_increments_the_print_counter() {
    let repo = InMemoryRepository::new();
    let poster = poster_with_status(Uuid::new_v4(), PosterStatus::Approved);
    let poster_id = poster.id;
    repo.seed_poster(poster);
    let state = test_state(
        &repo,
        MockRenderService::new(solid_surface(2000, 3000, [0xAA, 0xBB, 0xCC, 0xFF])),
    );

    let artifact = handlers::export_poster(
        principal(Role::User),
        State(state),
        Path(poster_id),
        Json(export(ExportFormat::PdfA4, ExportKind::Print)),
    )
    .await
    .expect("approved posters export for anyone");

    assert!(matches!(artifact, ExportArtifact::Document { .. }));
    assert_eq!(artifact.content_type(), "application/pdf");

    let poster = repo.poster(poster_id).unwrap();
    assert_eq!(poster.print_count, 1);
    assert_eq!(poster.download_count, 0);
}

#[tokio::test]
async fn each_export_adds_exactly_one() {
    let repo = InMemoryRepository::new();
    let poster = poster_with_status(Uuid::new_v4(), PosterStatus::Approved);
    let poster_id = poster.id;
    repo.seed_poster(poster);
    let state = test_state(
        &repo,
        MockRenderService::new(solid_surface(100, 100, [0, 0, 0, 0xFF])),
    );

    for _ in 0..3 {
        handlers::export_poster(
            principal(Role::User),
            State(state.clone()),
            Path(poster_id),
            Json(export(ExportFormat::Facebook, ExportKind::Download)),
        )
        .await
        .unwrap();
    }

    assert_eq!(repo.poster(poster_id).unwrap().download_count, 3);
}

#[tokio::test]
async fn render_failure_surfaces_as_export_failed_and_counts_nothing() {
    let repo = InMemoryRepository::new();
    let poster = poster_with_status(Uuid::new_v4(), PosterStatus::Approved);
    let poster_id = poster.id;
    repo.seed_poster(poster);
    let state = test_state(&repo, MockRenderService::new_failing());

    let result = handlers::export_poster(
        principal(Role::User),
        State(state),
        Path(poster_id),
        Json(export(ExportFormat::PngHq, ExportKind::Download)),
    )
    .await;

    assert!(matches!(result, Err(ApiError::ExportFailed)));
    let poster = repo.poster(poster_id).unwrap();
    assert_eq!(poster.download_count, 0);
    assert_eq!(poster.print_count, 0);
}

#[tokio::test]
async fn exporting_a_missing_poster_is_not_found() {
    let repo = InMemoryRepository::new();
    let state = test_state(&repo, MockRenderService::new_failing());

    let result = handlers::export_poster(
        principal(Role::Admin),
        State(state),
        Path(Uuid::new_v4()),
        Json(export(ExportFormat::PngHq, ExportKind::Download)),
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotFound)));
}

// --- Wire Format ---

#[test]
fn export_request_parses_kebab_case_formats_and_defaults_the_kind() {
    let request: ExportRequest = serde_json::from_str(r#"{ "format": "png-hq" }"#).unwrap();
    assert_eq!(request.format, ExportFormat::PngHq);
    assert_eq!(request.kind, ExportKind::Download);

    let request: ExportRequest =
        serde_json::from_str(r#"{ "format": "pdf-a3", "kind": "print" }"#).unwrap();
    assert_eq!(request.format, ExportFormat::PdfA3);
    assert_eq!(request.kind, ExportKind::Print);
}

#[test]
fn unknown_formats_are_rejected_at_the_boundary() {
    assert!(serde_json::from_str::<ExportRequest>(r#"{ "format": "tiktok" }"#).is_err());
    assert!(serde_json::from_str::<ExportRequest>(r#"{ "format": "" }"#).is_err());
}

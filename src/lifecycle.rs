use crate::error::ApiError;
use crate::models::{PosterStatus, ReviewDecision, Role};
use crate::permissions::{Capability, has_capability};

/// Lifecycle State Machine
///
/// The poster status progression is driven exclusively by review
/// decisions. `DRAFT` is the initial state; `APPROVED` and `REJECTED` are
/// re-reviewable rather than terminal, so a later review can pull a poster
/// back into `UNDER_REVIEW` or flip it to the other outcome directly.
///
/// The functions here are the pure half of the machine: the decision
/// table and the preconditions. Applying an accepted transition (review
/// insert, poster update, history append) is a single repository
/// transaction so a reader never observes one without the others.

/// Transition
///
/// What an accepted decision does to the poster, beyond setting `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub resulting_status: PosterStatus,
    /// APPROVED stamps `approved_at`.
    pub sets_approved_at: bool,
    /// REJECTED stamps `rejected_at` and copies the comment into
    /// `rejection_reason`.
    pub sets_rejected_at: bool,
}

/// The decision table. Total over `ReviewDecision`; no decision is ever
/// refused for being made from the "wrong" current status (re-review is
/// modeled, not finality).
pub fn transition_for(decision: ReviewDecision) -> Transition {
    match decision {
        ReviewDecision::Approved => Transition {
            resulting_status: PosterStatus::Approved,
            sets_approved_at: true,
            sets_rejected_at: false,
        },
        ReviewDecision::Rejected => Transition {
            resulting_status: PosterStatus::Rejected,
            sets_approved_at: false,
            sets_rejected_at: true,
        },
        ReviewDecision::RequestChanges => Transition {
            resulting_status: PosterStatus::UnderReview,
            sets_approved_at: false,
            sets_rejected_at: false,
        },
    }
}

/// Capability preconditions for submitting a decision.
///
/// Every decision requires `reviewContent`. Granting final approval
/// additionally requires `approveContent`, which separates "can comment
/// and gatekeep" from "can publish": an organization can have reviewers
/// who triage without being able to put material in front of the public.
pub fn authorize_review(role: Role, decision: ReviewDecision) -> Result<(), ApiError> {
    if !has_capability(role, Capability::ReviewContent) {
        return Err(ApiError::Forbidden);
    }
    if decision == ReviewDecision::Approved && !has_capability(role, Capability::ApproveContent) {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// A review without a stated reason is invalid input.
pub fn validate_comment(comment: &str) -> Result<(), ApiError> {
    if comment.trim().is_empty() {
        return Err(ApiError::Validation("review comment is required".to_string()));
    }
    Ok(())
}

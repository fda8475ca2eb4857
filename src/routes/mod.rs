/// Router Module Index
///
/// Organizes the application's routing into security-segregated modules so
/// access control is applied explicitly at the module level (via Axum
/// layers) and protected endpoints cannot be exposed by accident.

/// Routes accessible to anonymous callers. The public poster view hides
/// the existence of anything that is not APPROVED.
pub mod public;

/// Routes protected by the `Principal` extractor middleware.
/// Requires a validated identity.
pub mod authenticated;

/// Routes for moderation and oversight, capability-gated inside the
/// handlers after authentication.
pub mod admin;

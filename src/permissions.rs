use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::{Poster, Role};
use crate::auth::Principal;

/// Capability
///
/// One named permission axis, evaluated independently of the others.
/// The set is fixed and shared by every role; policy changes mean editing
/// the constant tables below, never mutating anything at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum Capability {
    // Content Management
    CreateContent,
    EditOwnContent,
    EditAllContent,
    DeleteOwnContent,
    DeleteAllContent,

    // Templates
    CreateTemplate,
    EditTemplate,
    DeleteTemplate,
    UseTemplate,

    // Review & Approval
    ReviewContent,
    ApproveContent,
    RejectContent,

    // User Management
    ViewUsers,
    CreateUsers,
    EditUsers,
    DeleteUsers,
    ChangeUserRoles,

    // Analytics
    ViewAnalytics,
    ViewAllAnalytics,

    // Organization
    ManageOrganization,
}

impl Capability {
    /// Every capability axis, in table order. Drives the exhaustive matrix test.
    pub const ALL: [Capability; 20] = [
        Capability::CreateContent,
        Capability::EditOwnContent,
        Capability::EditAllContent,
        Capability::DeleteOwnContent,
        Capability::DeleteAllContent,
        Capability::CreateTemplate,
        Capability::EditTemplate,
        Capability::DeleteTemplate,
        Capability::UseTemplate,
        Capability::ReviewContent,
        Capability::ApproveContent,
        Capability::RejectContent,
        Capability::ViewUsers,
        Capability::CreateUsers,
        Capability::EditUsers,
        Capability::DeleteUsers,
        Capability::ChangeUserRoles,
        Capability::ViewAnalytics,
        Capability::ViewAllAnalytics,
        Capability::ManageOrganization,
    ];
}

/// PermissionSet
///
/// A total mapping from Capability to bool: every role has a value for
/// every capability, no missing keys. The per-role instances are `const`
/// tables, recomputed from nothing and mutated by nothing, so lookups are
/// safe from any concurrent context without synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PermissionSet {
    pub create_content: bool,
    pub edit_own_content: bool,
    pub edit_all_content: bool,
    pub delete_own_content: bool,
    pub delete_all_content: bool,

    pub create_template: bool,
    pub edit_template: bool,
    pub delete_template: bool,
    pub use_template: bool,

    pub review_content: bool,
    pub approve_content: bool,
    pub reject_content: bool,

    pub view_users: bool,
    pub create_users: bool,
    pub edit_users: bool,
    pub delete_users: bool,
    pub change_user_roles: bool,

    pub view_analytics: bool,
    pub view_all_analytics: bool,

    pub manage_organization: bool,
}

impl PermissionSet {
    /// Total lookup of one capability axis.
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::CreateContent => self.create_content,
            Capability::EditOwnContent => self.edit_own_content,
            Capability::EditAllContent => self.edit_all_content,
            Capability::DeleteOwnContent => self.delete_own_content,
            Capability::DeleteAllContent => self.delete_all_content,
            Capability::CreateTemplate => self.create_template,
            Capability::EditTemplate => self.edit_template,
            Capability::DeleteTemplate => self.delete_template,
            Capability::UseTemplate => self.use_template,
            Capability::ReviewContent => self.review_content,
            Capability::ApproveContent => self.approve_content,
            Capability::RejectContent => self.reject_content,
            Capability::ViewUsers => self.view_users,
            Capability::CreateUsers => self.create_users,
            Capability::EditUsers => self.edit_users,
            Capability::DeleteUsers => self.delete_users,
            Capability::ChangeUserRoles => self.change_user_roles,
            Capability::ViewAnalytics => self.view_analytics,
            Capability::ViewAllAnalytics => self.view_all_analytics,
            Capability::ManageOrganization => self.manage_organization,
        }
    }
}

// --- Per-Role Constant Tables ---

const SUPER_ADMIN: PermissionSet = PermissionSet {
    create_content: true,
    edit_own_content: true,
    edit_all_content: true,
    delete_own_content: true,
    delete_all_content: true,
    create_template: true,
    edit_template: true,
    delete_template: true,
    use_template: true,
    review_content: true,
    approve_content: true,
    reject_content: true,
    view_users: true,
    create_users: true,
    edit_users: true,
    delete_users: true,
    change_user_roles: true,
    view_analytics: true,
    view_all_analytics: true,
    manage_organization: true,
};

const ADMIN: PermissionSet = PermissionSet {
    create_content: true,
    edit_own_content: true,
    edit_all_content: true,
    delete_own_content: true,
    delete_all_content: true,
    create_template: true,
    edit_template: true,
    delete_template: true,
    use_template: true,
    review_content: true,
    approve_content: true,
    reject_content: true,
    view_users: true,
    create_users: true,
    edit_users: true,
    delete_users: true,
    change_user_roles: true,
    view_analytics: true,
    view_all_analytics: true,
    manage_organization: false,
};

const CONTENT_MANAGER: PermissionSet = PermissionSet {
    create_content: true,
    edit_own_content: true,
    edit_all_content: true,
    delete_own_content: true,
    delete_all_content: false,
    create_template: true,
    edit_template: true,
    delete_template: false,
    use_template: true,
    review_content: true,
    approve_content: true,
    reject_content: true,
    view_users: true,
    create_users: false,
    edit_users: false,
    delete_users: false,
    change_user_roles: false,
    view_analytics: true,
    view_all_analytics: false,
    manage_organization: false,
};

// Reviewers triage and gatekeep but cannot grant final approval; the
// approveContent axis stays with the manager and admin tiers.
const REVIEWER: PermissionSet = PermissionSet {
    create_content: true,
    edit_own_content: true,
    edit_all_content: false,
    delete_own_content: true,
    delete_all_content: false,
    create_template: false,
    edit_template: false,
    delete_template: false,
    use_template: true,
    review_content: true,
    approve_content: false,
    reject_content: true,
    view_users: false,
    create_users: false,
    edit_users: false,
    delete_users: false,
    change_user_roles: false,
    view_analytics: false,
    view_all_analytics: false,
    manage_organization: false,
};

const USER: PermissionSet = PermissionSet {
    create_content: true,
    edit_own_content: true,
    edit_all_content: false,
    delete_own_content: true,
    delete_all_content: false,
    create_template: false,
    edit_template: false,
    delete_template: false,
    use_template: true,
    review_content: false,
    approve_content: false,
    reject_content: false,
    view_users: false,
    create_users: false,
    edit_users: false,
    delete_users: false,
    change_user_roles: false,
    view_analytics: false,
    view_all_analytics: false,
    manage_organization: false,
};

// --- Permission Engine ---

/// capabilities_for
///
/// The complete permission set for a role. Total and pure: a plain table
/// lookup with no failure mode and no side effects.
pub fn capabilities_for(role: Role) -> &'static PermissionSet {
    match role {
        Role::SuperAdmin => &SUPER_ADMIN,
        Role::Admin => &ADMIN,
        Role::ContentManager => &CONTENT_MANAGER,
        Role::Reviewer => &REVIEWER,
        Role::User => &USER,
    }
}

/// has_capability
///
/// Single-axis check. Role normalization already happened at the
/// `Principal` boundary, so every input here resolves against a real table.
pub fn has_capability(role: Role, capability: Capability) -> bool {
    capabilities_for(role).allows(capability)
}

// --- Ownership Guard ---

/// can_mutate
///
/// Arbitrates "can actor X act on poster P" for mutation-shaped
/// operations. A principal holding the "all" capability acts on any
/// poster; one holding only the "own" capability acts on posters it owns;
/// everyone else is refused. Edit and delete differ only in which
/// capability pair is supplied.
pub fn can_mutate(
    principal: &Principal,
    poster: &Poster,
    own_capability: Capability,
    all_capability: Capability,
) -> bool {
    let permissions = capabilities_for(principal.role);
    if permissions.allows(all_capability) {
        return true;
    }
    permissions.allows(own_capability) && poster.owner_id == principal.id
}

/// Edit check: (editOwnContent, editAllContent) pair.
pub fn can_edit_poster(principal: &Principal, poster: &Poster) -> bool {
    can_mutate(
        principal,
        poster,
        Capability::EditOwnContent,
        Capability::EditAllContent,
    )
}

/// Delete check: (deleteOwnContent, deleteAllContent) pair.
pub fn can_delete_poster(principal: &Principal, poster: &Poster) -> bool {
    can_mutate(
        principal,
        poster,
        Capability::DeleteOwnContent,
        Capability::DeleteAllContent,
    )
}

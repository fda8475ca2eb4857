//! Exhaustive verification of the permission engine against the fixed
//! reference table, plus the ownership guard truth table.

mod common;

use common::{draft_poster, principal, principal_with};
use poster_portal::models::Role;
use poster_portal::permissions::{
    Capability, can_delete_poster, can_edit_poster, can_mutate, capabilities_for, has_capability,
};
use uuid::Uuid;

/// The independent oracle: the capability grants per role, transcribed
/// from the product's permission table. Any drift between this list and
/// the engine's constant tables fails the matrix test below.
fn expected(role: Role, capability: Capability) -> bool {
    use Capability::*;
    let granted: &[Capability] = match role {
        Role::SuperAdmin => &[
            CreateContent,
            EditOwnContent,
            EditAllContent,
            DeleteOwnContent,
            DeleteAllContent,
            CreateTemplate,
            EditTemplate,
            DeleteTemplate,
            UseTemplate,
            ReviewContent,
            ApproveContent,
            RejectContent,
            ViewUsers,
            CreateUsers,
            EditUsers,
            DeleteUsers,
            ChangeUserRoles,
            ViewAnalytics,
            ViewAllAnalytics,
            ManageOrganization,
        ],
        Role::Admin => &[
            CreateContent,
            EditOwnContent,
            EditAllContent,
            DeleteOwnContent,
            DeleteAllContent,
            CreateTemplate,
            EditTemplate,
            DeleteTemplate,
            UseTemplate,
            ReviewContent,
            ApproveContent,
            RejectContent,
            ViewUsers,
            CreateUsers,
            EditUsers,
            DeleteUsers,
            ChangeUserRoles,
            ViewAnalytics,
            ViewAllAnalytics,
        ],
        Role::ContentManager => &[
            CreateContent,
            EditOwnContent,
            EditAllContent,
            DeleteOwnContent,
            CreateTemplate,
            EditTemplate,
            UseTemplate,
            ReviewContent,
            ApproveContent,
            RejectContent,
            ViewUsers,
            ViewAnalytics,
        ],
        Role::Reviewer => &[
            CreateContent,
            EditOwnContent,
            DeleteOwnContent,
            UseTemplate,
            ReviewContent,
            RejectContent,
        ],
        Role::User => &[CreateContent, EditOwnContent, DeleteOwnContent, UseTemplate],
    };
    granted.contains(&capability)
}

#[test]
fn every_role_and_capability_matches_the_reference_table() {
    for role in Role::ALL {
        for capability in Capability::ALL {
            assert_eq!(
                has_capability(role, capability),
                expected(role, capability),
                "mismatch for {:?} / {:?}",
                role,
                capability
            );
        }
    }
}

#[test]
fn capabilities_for_is_consistent_with_has_capability() {
    for role in Role::ALL {
        let set = capabilities_for(role);
        for capability in Capability::ALL {
            assert_eq!(set.allows(capability), has_capability(role, capability));
        }
    }
}

#[test]
fn unknown_role_strings_normalize_to_least_privilege() {
    for junk in ["", "root", "SUPERUSER", "admin; DROP TABLE", "   ", "NONE"] {
        assert_eq!(Role::from_str_lossy(junk), Role::User, "input: {junk:?}");
    }
}

#[test]
fn role_parsing_is_case_insensitive_and_trimmed() {
    assert_eq!(Role::from_str_lossy("admin"), Role::Admin);
    assert_eq!(Role::from_str_lossy(" super_admin "), Role::SuperAdmin);
    assert_eq!(Role::from_str_lossy("Content_Manager"), Role::ContentManager);
    assert_eq!(Role::from_str_lossy("REVIEWER"), Role::Reviewer);
}

// --- Ownership Guard ---

#[test]
fn owner_with_own_capability_may_mutate_without_the_all_capability() {
    let owner = principal(Role::User);
    let poster = draft_poster(owner.id);

    assert!(can_edit_poster(&owner, &poster));
    assert!(can_delete_poster(&owner, &poster));
}

#[test]
fn all_capability_overrides_ownership() {
    let admin = principal(Role::Admin);
    let poster = draft_poster(Uuid::new_v4());

    assert!(can_edit_poster(&admin, &poster));
    assert!(can_delete_poster(&admin, &poster));
}

#[test]
fn non_owner_without_all_capability_is_refused() {
    let stranger = principal(Role::User);
    let poster = draft_poster(Uuid::new_v4());

    assert!(!can_edit_poster(&stranger, &poster));
    assert!(!can_delete_poster(&stranger, &poster));

    let reviewer = principal(Role::Reviewer);
    assert!(!can_edit_poster(&reviewer, &poster));
}

#[test]
fn edit_and_delete_differ_only_in_the_capability_pair() {
    // A content manager edits anyone's poster (editAllContent) but may
    // only delete their own (no deleteAllContent).
    let manager = principal(Role::ContentManager);
    let foreign = draft_poster(Uuid::new_v4());
    let own = draft_poster(manager.id);

    assert!(can_edit_poster(&manager, &foreign));
    assert!(!can_delete_poster(&manager, &foreign));
    assert!(can_delete_poster(&manager, &own));
}

#[test]
fn can_mutate_honors_the_supplied_pair_directly() {
    let user_id = Uuid::new_v4();
    let poster = draft_poster(user_id);
    let owner = principal_with(user_id, Role::User);

    assert!(can_mutate(
        &owner,
        &poster,
        Capability::EditOwnContent,
        Capability::EditAllContent
    ));
    // The same principal fails a pair it holds neither side of.
    assert!(!can_mutate(
        &owner,
        &poster,
        Capability::ReviewContent,
        Capability::ApproveContent
    ));
}

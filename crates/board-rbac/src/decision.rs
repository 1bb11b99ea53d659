//! # Access Decisions
//!
//! The pure decision rule behind workspace authorization. Storage lookups
//! (workspace owner, membership row) happen in the engine; this module only
//! combines them.

use board_org::PermissionLevel;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capability::Capability;

/// Why access was granted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "via", content = "level")]
pub enum Grant {
    /// The actor owns the workspace.
    Owner,
    /// The actor holds a membership row with this level.
    Member(PermissionLevel),
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Not the owner and no membership row.
    NotMember,
    /// Membership exists but its level does not satisfy the capability.
    InsufficientPermission {
        /// Level the member holds.
        held: PermissionLevel,
        /// Capability that was requested.
        required: Capability,
    },
    /// The operation is reserved to the workspace owner.
    OwnerOnly,
}

impl DenyReason {
    /// Machine-readable reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotMember => "not_a_member",
            DenyReason::InsufficientPermission { .. } => "insufficient_permission",
            DenyReason::OwnerOnly => "owner_only",
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// The actor may proceed.
    Allow(Grant),
    /// The actor may not proceed.
    Deny(DenyReason),
}

impl AccessDecision {
    /// Check if the decision allows the operation.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow(_))
    }
}

/// Decide whether `user_id` holds `capability` on a workspace.
///
/// 1. The owner is allowed any capability, with or without a membership row.
/// 2. Otherwise, no membership row means deny.
/// 3. Otherwise the membership level must satisfy the capability: VIEW is
///    satisfied by either level, EDIT only by EDIT.
///
/// # Example
///
/// ```
/// use board_org::PermissionLevel;
/// use board_rbac::{evaluate, AccessDecision, Capability, Grant};
/// use uuid::Uuid;
///
/// let owner = Uuid::now_v7();
/// let viewer = Uuid::now_v7();
///
/// assert_eq!(
///     evaluate(owner, owner, None, Capability::Edit),
///     AccessDecision::Allow(Grant::Owner)
/// );
/// assert!(evaluate(owner, viewer, Some(PermissionLevel::View), Capability::View).is_allowed());
/// assert!(!evaluate(owner, viewer, Some(PermissionLevel::View), Capability::Edit).is_allowed());
/// ```
pub fn evaluate(
    owner_id: Uuid,
    user_id: Uuid,
    membership: Option<PermissionLevel>,
    capability: Capability,
) -> AccessDecision {
    if owner_id == user_id {
        return AccessDecision::Allow(Grant::Owner);
    }

    match membership {
        None => AccessDecision::Deny(DenyReason::NotMember),
        Some(level) if capability.is_satisfied_by(level) => {
            AccessDecision::Allow(Grant::Member(level))
        }
        Some(level) => AccessDecision::Deny(DenyReason::InsufficientPermission {
            held: level,
            required: capability,
        }),
    }
}

/// Decide an owner-only operation.
pub fn evaluate_owner_only(owner_id: Uuid, user_id: Uuid) -> AccessDecision {
    if owner_id == user_id {
        AccessDecision::Allow(Grant::Owner)
    } else {
        AccessDecision::Deny(DenyReason::OwnerOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_passes_everything_without_membership() {
        let owner = Uuid::now_v7();
        for capability in Capability::all() {
            assert_eq!(
                evaluate(owner, owner, None, capability),
                AccessDecision::Allow(Grant::Owner)
            );
        }
    }

    #[test]
    fn test_owner_wins_over_stray_membership_row() {
        let owner = Uuid::now_v7();
        assert_eq!(
            evaluate(owner, owner, Some(PermissionLevel::View), Capability::Edit),
            AccessDecision::Allow(Grant::Owner)
        );
    }

    #[test]
    fn test_stranger_fails_everything() {
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        for capability in Capability::all() {
            assert_eq!(
                evaluate(owner, stranger, None, capability),
                AccessDecision::Deny(DenyReason::NotMember)
            );
        }
    }

    #[test]
    fn test_view_member() {
        let owner = Uuid::now_v7();
        let member = Uuid::now_v7();

        assert_eq!(
            evaluate(owner, member, Some(PermissionLevel::View), Capability::View),
            AccessDecision::Allow(Grant::Member(PermissionLevel::View))
        );
        assert_eq!(
            evaluate(owner, member, Some(PermissionLevel::View), Capability::Edit),
            AccessDecision::Deny(DenyReason::InsufficientPermission {
                held: PermissionLevel::View,
                required: Capability::Edit,
            })
        );
    }

    #[test]
    fn test_edit_member() {
        let owner = Uuid::now_v7();
        let member = Uuid::now_v7();

        for capability in Capability::all() {
            assert!(evaluate(owner, member, Some(PermissionLevel::Edit), capability).is_allowed());
        }
    }

    #[test]
    fn test_owner_only() {
        let owner = Uuid::now_v7();
        assert!(evaluate_owner_only(owner, owner).is_allowed());
        assert_eq!(
            evaluate_owner_only(owner, Uuid::now_v7()),
            AccessDecision::Deny(DenyReason::OwnerOnly)
        );
    }

    #[test]
    fn test_deny_reason_codes() {
        assert_eq!(DenyReason::NotMember.as_str(), "not_a_member");
        assert_eq!(DenyReason::OwnerOnly.as_str(), "owner_only");
    }
}

//! Error types for engine operations
//!
//! Every public operation fails with exactly one [`EngineError`]. Storage
//! faults are translated here and never cross the service boundary raw.

use board_rbac::EntityKind;
use thiserror::Error;

use crate::store::StorageError;

/// Reason codes carried by [`EngineError`] variants.
pub mod reason {
    /// The default pipeline of a workspace cannot be deleted.
    pub const DEFAULT_PIPELINE_DELETION_NOT_ALLOWED: &str = "default_pipeline_deletion_not_allowed";
    /// Two reorder entries claim the same index in one target scope.
    pub const DUPLICATE_TARGET_INDEX: &str = "duplicate_target_index";
    /// The same child id appears twice in a reorder payload.
    pub const DUPLICATE_CHILD: &str = "duplicate_child";
    /// A top-level reorder entry does not live in the reordered scope.
    pub const CHILD_NOT_IN_SCOPE: &str = "child_not_in_scope";
    /// A move would cross a workspace boundary.
    pub const CROSS_WORKSPACE_MOVE: &str = "cross_workspace_move";
    /// Records of this kind never change parent.
    pub const PARENT_CHANGE_NOT_ALLOWED: &str = "parent_change_not_allowed";
    /// A nested entry names a parent other than its enclosing entry.
    pub const NESTED_PARENT_MISMATCH: &str = "nested_parent_mismatch";
    /// Reorder payload nests deeper than one level.
    pub const NESTING_TOO_DEEP: &str = "nesting_too_deep";
    /// The user is already a member of the client assignment or task.
    pub const MEMBER_ALREADY_ASSIGNED: &str = "member_already_assigned";
    /// The user already has a membership row in the workspace.
    pub const MEMBER_ALREADY_EXISTS: &str = "member_already_exists";
    /// The workspace owner never gets a membership row.
    pub const OWNER_MEMBERSHIP_NOT_ALLOWED: &str = "owner_membership_not_allowed";
    /// The client belongs to another workspace.
    pub const CLIENT_NOT_IN_WORKSPACE: &str = "client_not_in_workspace";
    /// The user is neither owner nor member of the workspace.
    pub const USER_NOT_IN_WORKSPACE: &str = "user_not_in_workspace";
    /// The user is not a member of the task's client assignment.
    pub const USER_NOT_ON_ASSIGNMENT: &str = "user_not_on_assignment";
    /// The user is not assigned.
    pub const MEMBER_NOT_ASSIGNED: &str = "member_not_assigned";
    /// The user has no membership row.
    pub const MEMBERSHIP_NOT_FOUND: &str = "membership_not_found";
    /// The scope has no positional children.
    pub const UNORDERED_SCOPE: &str = "unordered_scope";
    /// A title is empty.
    pub const EMPTY_TITLE: &str = "empty_title";
    /// A client name is empty.
    pub const EMPTY_NAME: &str = "empty_name";
    /// A unit of work wrote outside the scopes it locked.
    pub const CONCURRENT_MODIFICATION: &str = "concurrent_modification";
    /// A scope lock could not be taken in time.
    pub const LOCK_TIMEOUT: &str = "lock_timeout";
    /// Two live rows share a position.
    pub const POSITION_CONFLICT: &str = "position_conflict";
    /// A row references a missing parent.
    pub const FOREIGN_KEY_VIOLATION: &str = "foreign_key_violation";
    /// A row with this id already exists.
    pub const DUPLICATE_KEY: &str = "duplicate_key";
    /// The storage backend failed.
    pub const STORAGE_FAILURE: &str = "storage_failure";
}

/// Engine error kinds.
///
/// Each variant carries a snake_case reason code (see [`reason`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Entity, parent link, or workspace missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access evaluation denied the actor
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Default pipeline deletion, position collision or concurrent write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed request, such as a broken reorder payload
    #[error("Invalid request: {0}")]
    Invalid(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// `NotFound` for a missing record of `kind` (e.g. `pipeline_not_found`).
    pub fn not_found(kind: EntityKind) -> Self {
        EngineError::NotFound(format!("{}_not_found", kind.as_str()))
    }

    /// `Invalid` with a reason code.
    pub fn invalid(reason: &str) -> Self {
        EngineError::Invalid(reason.to_string())
    }

    /// `Conflict` with a reason code.
    pub fn conflict(reason: &str) -> Self {
        EngineError::Conflict(reason.to_string())
    }

    /// The snake_case reason code.
    pub fn reason(&self) -> &str {
        match self {
            EngineError::NotFound(r)
            | EngineError::Unauthorized(r)
            | EngineError::Conflict(r)
            | EngineError::Invalid(r) => r,
        }
    }

    /// Check if the caller may retry the operation.
    ///
    /// Only conflicts are worth retrying; the engine never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NotFound(_) => 404,
            EngineError::Unauthorized(_) => 403,
            EngineError::Conflict(_) => 409,
            EngineError::Invalid(_) => 422,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Unauthorized(_) => "UNAUTHORIZED",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::Invalid(_) => "INVALID",
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, .. } => EngineError::not_found(kind),
            StorageError::Duplicate { .. } => EngineError::conflict(reason::DUPLICATE_KEY),
            StorageError::ScopeNotLocked(_) => {
                EngineError::conflict(reason::CONCURRENT_MODIFICATION)
            }
            StorageError::UniqueViolation { .. } => {
                EngineError::conflict(reason::POSITION_CONFLICT)
            }
            StorageError::ForeignKeyViolation(_) => {
                EngineError::conflict(reason::FOREIGN_KEY_VIOLATION)
            }
            StorageError::LockTimeout(_) => EngineError::conflict(reason::LOCK_TIMEOUT),
            StorageError::Backend(_) => EngineError::conflict(reason::STORAGE_FAILURE),
        }
    }
}

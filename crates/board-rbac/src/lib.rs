//! # Board RBAC (Capability-Based Access Control)
//!
//! This crate provides the authorization vocabulary of the workspace board.
//!
//! ## Overview
//!
//! The board-rbac crate handles:
//! - **Capabilities**: VIEW and EDIT, the two levels evaluated per operation
//! - **Entity Kinds**: Every record kind and its fixed parent chain
//! - **Permissions**: Entity kind + capability, one per operation
//! - **Decisions**: The owner/member/level rule that allows or denies
//!
//! ## Architecture
//!
//! ```text
//! Operation ──→ Permission = EntityKind + Capability
//!
//! evaluate(owner, actor, membership level?, capability)
//!   owner                      → Allow(Owner)
//!   no membership              → Deny(NotMember)
//!   level satisfies capability → Allow(Member(level))
//!   otherwise                  → Deny(InsufficientPermission)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use board_org::PermissionLevel;
//! use board_rbac::{evaluate, Capability, Operation};
//! use uuid::Uuid;
//!
//! let owner = Uuid::now_v7();
//! let member = Uuid::now_v7();
//!
//! let capability = Operation::ReorderPipelines.capability();
//! let decision = evaluate(owner, member, Some(PermissionLevel::View), capability);
//! assert!(!decision.is_allowed());
//! ```
//!
//! ## Capability Implications
//!
//! - `Edit` implies `View`
//! - The workspace owner holds both without a membership row

pub mod capability;
pub mod decision;
pub mod permissions;
pub mod resources;

// Re-export main types for convenience
pub use capability::Capability;
pub use decision::{evaluate, evaluate_owner_only, AccessDecision, DenyReason, Grant};
pub use permissions::{Operation, Permission};
pub use resources::EntityKind;

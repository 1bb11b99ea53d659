//! Stored records and the scopes they live in.

use board_org::{Client, ClientAssignment, Membership, Pipeline, Task, Workspace};
use board_rbac::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// A parent scope: the children of kind `kind` under the record `parent`.
///
/// Scopes order by `(parent, kind)`, which is the order locks are taken in.
///
/// # Example
///
/// ```
/// use board_engine::Scope;
/// use board_rbac::EntityKind;
/// use uuid::Uuid;
///
/// let pipeline_id = Uuid::now_v7();
/// let scope = Scope::assignments(pipeline_id);
/// assert_eq!(scope.kind, EntityKind::ClientAssignment);
/// assert_eq!(scope.parent_kind(), Some(EntityKind::Pipeline));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Id of the parent record (the owner's user id for workspaces).
    pub parent: Uuid,
    /// Kind of the children.
    pub kind: EntityKind,
}

impl Scope {
    /// Create a scope.
    pub fn new(parent: Uuid, kind: EntityKind) -> Self {
        Self { parent, kind }
    }

    /// Workspaces owned by a user.
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self::new(owner_id, EntityKind::Workspace)
    }

    /// Pipelines of a workspace.
    pub fn pipelines(workspace_id: Uuid) -> Self {
        Self::new(workspace_id, EntityKind::Pipeline)
    }

    /// Client assignments of a pipeline.
    pub fn assignments(pipeline_id: Uuid) -> Self {
        Self::new(pipeline_id, EntityKind::ClientAssignment)
    }

    /// Tasks of a client assignment.
    pub fn tasks(assignment_id: Uuid) -> Self {
        Self::new(assignment_id, EntityKind::Task)
    }

    /// Clients of a workspace.
    pub fn clients(workspace_id: Uuid) -> Self {
        Self::new(workspace_id, EntityKind::Client)
    }

    /// Membership rows of a workspace.
    pub fn memberships(workspace_id: Uuid) -> Self {
        Self::new(workspace_id, EntityKind::Membership)
    }

    /// The ordered child scope of a record, if its kind has one.
    pub fn ordered_children_of(kind: EntityKind, id: Uuid) -> Option<Self> {
        kind.ordered_child_kind().map(|child| Self::new(id, child))
    }

    /// Kind of the parent record; `None` for the owner scope of workspaces.
    pub fn parent_kind(&self) -> Option<EntityKind> {
        self.kind.parent_kind()
    }

    /// Check if children of this scope carry a dense position.
    pub fn is_positional(&self) -> bool {
        self.kind.is_positional()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.parent)
    }
}

/// Ordered set of scopes a unit of work locks.
///
/// Iteration is ascending, i.e. lowest id first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSet(BTreeSet<Scope>);

impl LockSet {
    /// Create an empty lock set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope.
    pub fn insert(&mut self, scope: Scope) -> bool {
        self.0.insert(scope)
    }

    /// Builder form of [`LockSet::insert`].
    pub fn with(mut self, scope: Scope) -> Self {
        self.0.insert(scope);
        self
    }

    /// Check if the set contains a scope.
    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    /// Scopes in lock order.
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }

    /// Number of scopes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Scope> for LockSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Scope> for LockSet {
    fn extend<I: IntoIterator<Item = Scope>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

/// Any record the board stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Workspace(Workspace),
    Pipeline(Pipeline),
    ClientAssignment(ClientAssignment),
    Task(Task),
    Client(Client),
    Membership(Membership),
}

impl Record {
    /// Kind of this record.
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Workspace(_) => EntityKind::Workspace,
            Record::Pipeline(_) => EntityKind::Pipeline,
            Record::ClientAssignment(_) => EntityKind::ClientAssignment,
            Record::Task(_) => EntityKind::Task,
            Record::Client(_) => EntityKind::Client,
            Record::Membership(_) => EntityKind::Membership,
        }
    }

    /// Record id.
    pub fn id(&self) -> Uuid {
        match self {
            Record::Workspace(r) => r.id,
            Record::Pipeline(r) => r.id,
            Record::ClientAssignment(r) => r.id,
            Record::Task(r) => r.id,
            Record::Client(r) => r.id,
            Record::Membership(r) => r.id,
        }
    }

    /// Id of the parent record. Workspaces have none.
    pub fn parent_id(&self) -> Option<Uuid> {
        match self {
            Record::Workspace(_) => None,
            Record::Pipeline(r) => Some(r.workspace_id),
            Record::ClientAssignment(r) => Some(r.pipeline_id),
            Record::Task(r) => Some(r.client_assignment_id),
            Record::Client(r) => Some(r.workspace_id),
            Record::Membership(r) => Some(r.workspace_id),
        }
    }

    /// The scope this record lives in.
    pub fn scope(&self) -> Scope {
        match self {
            Record::Workspace(r) => Scope::owned_by(r.owner_id),
            Record::Pipeline(r) => Scope::pipelines(r.workspace_id),
            Record::ClientAssignment(r) => Scope::assignments(r.pipeline_id),
            Record::Task(r) => Scope::tasks(r.client_assignment_id),
            Record::Client(r) => Scope::clients(r.workspace_id),
            Record::Membership(r) => Scope::memberships(r.workspace_id),
        }
    }

    /// Every record this one points at, as `(kind, id)`.
    pub fn references(&self) -> Vec<(EntityKind, Uuid)> {
        match self {
            Record::Workspace(_) => Vec::new(),
            Record::Pipeline(r) => vec![(EntityKind::Workspace, r.workspace_id)],
            Record::ClientAssignment(r) => vec![
                (EntityKind::Pipeline, r.pipeline_id),
                (EntityKind::Client, r.client_id),
            ],
            Record::Task(r) => vec![(EntityKind::ClientAssignment, r.client_assignment_id)],
            Record::Client(r) => vec![(EntityKind::Workspace, r.workspace_id)],
            Record::Membership(r) => vec![(EntityKind::Workspace, r.workspace_id)],
        }
    }

    /// Position within the scope, for positional kinds.
    pub fn pos(&self) -> Option<u32> {
        match self {
            Record::Pipeline(r) => Some(r.pos),
            Record::ClientAssignment(r) => Some(r.pos),
            Record::Task(r) => Some(r.pos),
            _ => None,
        }
    }

    /// Set the position. Returns `false` for kinds without one.
    pub fn set_pos(&mut self, pos: u32) -> bool {
        match self {
            Record::Pipeline(r) => r.pos = pos,
            Record::ClientAssignment(r) => r.pos = pos,
            Record::Task(r) => r.pos = pos,
            _ => return false,
        }
        self.touch();
        true
    }

    /// Move the record under another parent of the same kind.
    ///
    /// Only client assignments and tasks can move; returns `false` otherwise.
    pub fn set_parent(&mut self, parent_id: Uuid) -> bool {
        match self {
            Record::ClientAssignment(r) => r.pipeline_id = parent_id,
            Record::Task(r) => r.client_assignment_id = parent_id,
            _ => return false,
        }
        self.touch();
        true
    }

    /// Creation time, the ordering key for kinds without a position.
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Record::Workspace(r) => r.created_at,
            Record::Pipeline(r) => r.created_at,
            Record::ClientAssignment(r) => r.created_at,
            Record::Task(r) => r.created_at,
            Record::Client(r) => r.created_at,
            Record::Membership(r) => r.added_at,
        }
    }

    fn touch(&mut self) {
        let now = Utc::now();
        match self {
            Record::Workspace(r) => r.updated_at = now,
            Record::Pipeline(r) => r.updated_at = now,
            Record::ClientAssignment(r) => r.updated_at = now,
            Record::Task(r) => r.updated_at = now,
            Record::Client(r) => r.updated_at = now,
            Record::Membership(_) => {}
        }
    }
}

/// A concrete record type that can be stored as a [`Record`].
pub trait Entity: Sized + Into<Record> {
    /// Kind of this record type.
    const KIND: EntityKind;

    /// Unwrap a record of this kind.
    fn from_record(record: Record) -> Option<Self>;
}

impl Entity for Workspace {
    const KIND: EntityKind = EntityKind::Workspace;

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Workspace(r) => Some(r),
            _ => None,
        }
    }
}

impl Entity for Pipeline {
    const KIND: EntityKind = EntityKind::Pipeline;

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Pipeline(r) => Some(r),
            _ => None,
        }
    }
}

impl Entity for ClientAssignment {
    const KIND: EntityKind = EntityKind::ClientAssignment;

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::ClientAssignment(r) => Some(r),
            _ => None,
        }
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Task(r) => Some(r),
            _ => None,
        }
    }
}

impl Entity for Client {
    const KIND: EntityKind = EntityKind::Client;

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Client(r) => Some(r),
            _ => None,
        }
    }
}

impl Entity for Membership {
    const KIND: EntityKind = EntityKind::Membership;

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Membership(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Workspace> for Record {
    fn from(r: Workspace) -> Self {
        Record::Workspace(r)
    }
}

impl From<Pipeline> for Record {
    fn from(r: Pipeline) -> Self {
        Record::Pipeline(r)
    }
}

impl From<ClientAssignment> for Record {
    fn from(r: ClientAssignment) -> Self {
        Record::ClientAssignment(r)
    }
}

impl From<Task> for Record {
    fn from(r: Task) -> Self {
        Record::Task(r)
    }
}

impl From<Client> for Record {
    fn from(r: Client) -> Self {
        Record::Client(r)
    }
}

impl From<Membership> for Record {
    fn from(r: Membership) -> Self {
        Record::Membership(r)
    }
}

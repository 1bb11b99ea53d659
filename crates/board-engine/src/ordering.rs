//! Dense positional ordering.
//!
//! Children of every positional scope carry `pos` values forming exactly
//! `0..n`. Appends take `max + 1` under the scope lock; reorders rebuild and
//! renumber every scope they touch inside one transaction.
//!
//! ## Reorder payload
//!
//! ```text
//! reorder(pipelines@W, [
//!     { id: B },                                  // B → slot 0
//!     { id: A, children: [                        // A → slot 1
//!         { id: X },                              //   X → A's assignments, slot 0
//!         { id: Y, index: 1 },                    //   Y → slot 1 (may come from another pipeline)
//!     ]},
//! ])
//! ```
//!
//! Each touched scope (the reordered one, every target scope, every scope a
//! child left) ends up as: claimed entries in their claimed slots, the
//! remaining children filling the free slots in their previous order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use crate::error::{reason, EngineError, EngineResult};
use crate::resolver::TenantResolver;
use crate::store::{Entity, LockSet, Reader, Record, Scope, Transaction};

/// One child in a reorder payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderEntry {
    /// Child being placed.
    pub id: Uuid,

    /// Target slot; defaults to the entry's position in its list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// New parent, for moves between parents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,

    /// Order of this child's own children, one level deep.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReorderEntry>,
}

impl ReorderEntry {
    /// Create an entry placed at its list position.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            index: None,
            parent_id: None,
            children: Vec::new(),
        }
    }

    /// Claim an explicit slot.
    pub fn at(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Move the child under another parent.
    pub fn into_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Order the child's own children.
    pub fn with_children(mut self, children: Vec<ReorderEntry>) -> Self {
        self.children = children;
        self
    }
}

/// Result of a reorder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReorderOutcome {
    /// Every scope that was rebuilt, in lock order.
    pub scopes: Vec<Scope>,
    /// Rows whose position or parent changed.
    pub updated: usize,
}

/// Maintains dense ordering inside a transaction.
///
/// Every scope the manager writes must be held by the transaction;
/// otherwise the call fails `Conflict`.
pub struct OrderedCollectionManager<'a, T: Transaction> {
    tx: &'a mut T,
}

impl<'a, T: Transaction> OrderedCollectionManager<'a, T> {
    /// Create a manager over a transaction.
    pub fn new(tx: &'a mut T) -> Self {
        Self { tx }
    }

    /// Next free position of a scope: `max(pos) + 1`, or 0 when empty.
    pub async fn append(&self, scope: Scope) -> EngineResult<u32> {
        self.ensure_held(scope)?;
        let children = self.tx.find_children(scope).await?;
        Ok(children
            .iter()
            .filter_map(Record::pos)
            .max()
            .map_or(0, |max| max + 1))
    }

    /// Insert `entity` at the end of its scope and return it with its
    /// position set.
    pub async fn insert<E: Entity>(&mut self, entity: E) -> EngineResult<E> {
        let mut record: Record = entity.into();
        let pos = self.append(record.scope()).await?;
        record.set_pos(pos);
        self.tx.create(record.clone()).await?;
        E::from_record(record).ok_or_else(|| EngineError::not_found(E::KIND))
    }

    /// Renumber a scope to `0..n`, keeping its order.
    ///
    /// Returns the number of rows that moved.
    pub async fn compact(&mut self, scope: Scope) -> EngineResult<usize> {
        self.ensure_held(scope)?;

        let mut updated = 0;
        for (pos, mut record) in self.tx.find_children(scope).await?.into_iter().enumerate() {
            let pos = pos as u32;
            if record.pos() != Some(pos) {
                record.set_pos(pos);
                self.tx.update(record).await?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Apply a reorder payload to `scope`.
    ///
    /// Validates the payload, then rebuilds every touched scope. Fails
    /// `Invalid` for a malformed payload, `NotFound` for unknown ids and
    /// `Conflict` if a touched scope is not held.
    pub async fn reorder(
        &mut self,
        scope: Scope,
        entries: &[ReorderEntry],
    ) -> EngineResult<ReorderOutcome> {
        let ReorderPlan {
            claims,
            mut records,
            touched,
        } = plan(&*self.tx, scope, entries).await?;

        for touched_scope in &touched {
            self.ensure_held(*touched_scope)?;
        }

        let mut current = Vec::with_capacity(touched.len());
        for touched_scope in &touched {
            current.push((*touched_scope, self.tx.find_children(*touched_scope).await?));
        }

        let claimed: HashSet<Uuid> = records.keys().copied().collect();
        let mut updated = 0;
        for (target, children) in current {
            let mut slots: Vec<(u32, Uuid)> = claims
                .iter()
                .filter(|c| c.target == target)
                .map(|c| (c.index, c.id))
                .collect();
            slots.sort_unstable();

            let mut rest = Vec::with_capacity(children.len());
            let mut unclaimed = HashMap::with_capacity(children.len());
            for record in children {
                if !claimed.contains(&record.id()) {
                    rest.push(record.id());
                    unclaimed.insert(record.id(), record);
                }
            }

            for (pos, id) in arrange(slots, rest).into_iter().enumerate() {
                let Some(mut record) = records.remove(&id).or_else(|| unclaimed.remove(&id))
                else {
                    continue;
                };

                let pos = pos as u32;
                let moved = record.parent_id() != Some(target.parent);
                if moved || record.pos() != Some(pos) {
                    if moved {
                        record.set_parent(target.parent);
                    }
                    record.set_pos(pos);
                    self.tx.update(record).await?;
                    updated += 1;
                }
            }
        }

        tracing::debug!(
            scope = %scope,
            scopes = touched.len(),
            updated,
            "reorder applied"
        );

        Ok(ReorderOutcome {
            scopes: touched.into_iter().collect(),
            updated,
        })
    }

    fn ensure_held(&self, scope: Scope) -> EngineResult<()> {
        if self.tx.holds(&scope) {
            Ok(())
        } else {
            tracing::debug!(scope = %scope, "scope not held by unit of work");
            Err(EngineError::conflict(reason::CONCURRENT_MODIFICATION))
        }
    }
}

/// Scopes a reorder of `scope` would touch, computed from `reader`.
///
/// Run against a snapshot before beginning the transaction; the reorder
/// re-validates under the locks.
pub async fn reorder_locks<R: Reader + ?Sized>(
    reader: &R,
    scope: Scope,
    entries: &[ReorderEntry],
) -> EngineResult<LockSet> {
    Ok(plan(reader, scope, entries)
        .await?
        .touched
        .into_iter()
        .collect())
}

struct Claim {
    id: Uuid,
    target: Scope,
    index: u32,
}

#[derive(Default)]
struct ReorderPlan {
    claims: Vec<Claim>,
    records: HashMap<Uuid, Record>,
    touched: BTreeSet<Scope>,
}

impl ReorderPlan {
    fn claim(&mut self, record: Record, target: Scope, index: u32) {
        self.touched.insert(record.scope());
        self.touched.insert(target);
        self.claims.push(Claim {
            id: record.id(),
            target,
            index,
        });
        self.records.insert(record.id(), record);
    }
}

async fn plan<R: Reader + ?Sized>(
    reader: &R,
    scope: Scope,
    entries: &[ReorderEntry],
) -> EngineResult<ReorderPlan> {
    let kind = scope.kind;
    let parent_kind = match scope.parent_kind() {
        Some(parent_kind) if kind.is_positional() => parent_kind,
        _ => return Err(EngineError::invalid(reason::UNORDERED_SCOPE)),
    };
    let child_kind = kind.ordered_child_kind();

    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.id) {
            return Err(EngineError::invalid(reason::DUPLICATE_CHILD));
        }
        if !entry.children.is_empty() && child_kind.is_none() {
            return Err(EngineError::invalid(reason::NESTING_TOO_DEEP));
        }
        for child in &entry.children {
            if !child.children.is_empty() {
                return Err(EngineError::invalid(reason::NESTING_TOO_DEEP));
            }
            if !seen.insert(child.id) {
                return Err(EngineError::invalid(reason::DUPLICATE_CHILD));
            }
        }
    }

    let resolver = TenantResolver::new(reader);
    let workspace_id = resolver.resolve_workspace(parent_kind, scope.parent).await?;

    let mut plan = ReorderPlan::default();
    plan.touched.insert(scope);

    for (i, entry) in entries.iter().enumerate() {
        let record = reader
            .find(kind, entry.id)
            .await?
            .ok_or_else(|| EngineError::not_found(kind))?;
        if record.scope() != scope {
            return Err(EngineError::invalid(reason::CHILD_NOT_IN_SCOPE));
        }

        let target_parent = entry.parent_id.unwrap_or(scope.parent);
        if target_parent != scope.parent {
            if !kind.can_change_parent() {
                return Err(EngineError::invalid(reason::PARENT_CHANGE_NOT_ALLOWED));
            }
            if resolver.resolve_workspace(parent_kind, target_parent).await? != workspace_id {
                return Err(EngineError::invalid(reason::CROSS_WORKSPACE_MOVE));
            }
        }
        plan.claim(
            record,
            Scope::new(target_parent, kind),
            entry.index.unwrap_or(i as u32),
        );

        let Some(child_kind) = child_kind else {
            continue;
        };
        for (j, child) in entry.children.iter().enumerate() {
            if child.parent_id.is_some_and(|p| p != entry.id) {
                return Err(EngineError::invalid(reason::NESTED_PARENT_MISMATCH));
            }
            let record = reader
                .find(child_kind, child.id)
                .await?
                .ok_or_else(|| EngineError::not_found(child_kind))?;

            let source_parent = record.scope().parent;
            if source_parent != entry.id
                && resolver.resolve_workspace(kind, source_parent).await? != workspace_id
            {
                return Err(EngineError::invalid(reason::CROSS_WORKSPACE_MOVE));
            }
            plan.claim(
                record,
                Scope::new(entry.id, child_kind),
                child.index.unwrap_or(j as u32),
            );
        }
    }

    let mut slots = HashSet::new();
    for claim in &plan.claims {
        if !slots.insert((claim.target, claim.index)) {
            return Err(EngineError::invalid(reason::DUPLICATE_TARGET_INDEX));
        }
    }

    Ok(plan)
}

/// Lay out one scope.
///
/// `claims` are `(index, id)` sorted by index; `rest` are the unclaimed
/// children in their previous order. Claims take their slot as soon as it
/// comes up, the rest fill the gaps, and claims past the end close up.
fn arrange(claims: Vec<(u32, Uuid)>, rest: Vec<Uuid>) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(claims.len() + rest.len());
    let mut claims = claims.into_iter().peekable();
    let mut rest = rest.into_iter();

    loop {
        match claims.peek() {
            Some(&(index, _)) if index as usize <= out.len() => {
                if let Some((_, id)) = claims.next() {
                    out.push(id);
                }
            }
            _ => match rest.next() {
                Some(id) => out.push(id),
                None => {
                    out.extend(claims.map(|(_, id)| id));
                    break;
                }
            },
        }
    }

    out
}

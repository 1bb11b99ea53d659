//! Client operations.

use board_org::{Client, ClientAssignment, Pipeline};
use board_rbac::{EntityKind, Operation};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{require_text, BoardService};
use crate::access::admit;
use crate::error::{reason, EngineResult};
use crate::lifecycle::DeletionReport;
use crate::store::{load_children, run_atomic, LockSet, Reader, Scope, Storage, Transaction};
use crate::views::{ClientListing, Placement};

/// Payload for creating a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClient {
    /// Display name; must not be blank.
    pub name: String,
    /// Contact email; a blank one is dropped.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone; a blank one is dropped.
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewClient {
    /// A client with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn into_client(self, workspace_id: Uuid) -> Client {
        let mut client = Client::new(workspace_id, self.name.trim());
        if let Some(email) = self.email.filter(|e| !e.trim().is_empty()) {
            client = client.with_email(email);
        }
        if let Some(phone) = self.phone.filter(|p| !p.trim().is_empty()) {
            client = client.with_phone(phone);
        }
        client
    }
}

impl<S: Storage> BoardService<S> {
    /// Add a client to a workspace. Requires EDIT.
    pub async fn create_client(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        new_client: NewClient,
    ) -> EngineResult<Client> {
        require_text(&new_client.name, reason::EMPTY_NAME)?;
        let locks = LockSet::new().with(Scope::clients(workspace_id));
        let client = new_client.into_client(workspace_id);

        let client = run_atomic(self.store(), locks, |mut tx| async move {
            let result = create_client_in(&mut tx, actor, client).await;
            (tx, result)
        })
        .await?;

        tracing::debug!(workspace_id = %workspace_id, client_id = %client.id, "client created");
        Ok(client)
    }

    /// Every client of a workspace with the pipelines it is placed in.
    /// Requires VIEW.
    pub async fn list_clients(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
    ) -> EngineResult<Vec<ClientListing>> {
        let snapshot = self.store.snapshot().await?;
        admit(
            &snapshot,
            actor,
            EntityKind::Workspace,
            workspace_id,
            Operation::ListClients,
        )
        .await?;

        let mut placements = placements_by_client(&snapshot, workspace_id).await?;
        let clients: Vec<Client> = load_children(&snapshot, Scope::clients(workspace_id)).await?;

        Ok(clients
            .into_iter()
            .map(|client| ClientListing {
                placements: placements.remove(&client.id).unwrap_or_default(),
                client,
            })
            .collect())
    }

    /// Clients of a workspace that are not placed in any pipeline, filtered
    /// by a case-insensitive search on name, email or phone. Requires VIEW.
    pub async fn list_unassigned_clients(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        search: Option<&str>,
    ) -> EngineResult<Vec<Client>> {
        let snapshot = self.store.snapshot().await?;
        admit(
            &snapshot,
            actor,
            EntityKind::Workspace,
            workspace_id,
            Operation::ListClients,
        )
        .await?;

        let placed = placements_by_client(&snapshot, workspace_id).await?;
        let clients: Vec<Client> = load_children(&snapshot, Scope::clients(workspace_id)).await?;
        let query = search.unwrap_or_default();

        Ok(clients
            .into_iter()
            .filter(|c| !placed.contains_key(&c.id) && c.matches_search(query))
            .collect())
    }

    /// Delete a client with every assignment of it and their tasks.
    /// Requires EDIT.
    pub async fn delete_client(&self, actor: Uuid, client_id: Uuid) -> EngineResult<DeletionReport> {
        self.lifecycle.delete_client(actor, client_id).await
    }
}

async fn create_client_in<T: Transaction>(
    tx: &mut T,
    actor: Uuid,
    client: Client,
) -> EngineResult<Client> {
    admit(
        &*tx,
        actor,
        EntityKind::Workspace,
        client.workspace_id,
        Operation::CreateClient,
    )
    .await?;
    tx.create(client.clone().into()).await?;
    Ok(client)
}

/// Placements of every placed client of a workspace, in board order.
async fn placements_by_client<R: Reader + ?Sized>(
    reader: &R,
    workspace_id: Uuid,
) -> EngineResult<HashMap<Uuid, Vec<Placement>>> {
    let mut placements: HashMap<Uuid, Vec<Placement>> = HashMap::new();

    let pipelines: Vec<Pipeline> = load_children(reader, Scope::pipelines(workspace_id)).await?;
    for pipeline in pipelines {
        let assignments: Vec<ClientAssignment> =
            load_children(reader, Scope::assignments(pipeline.id)).await?;
        for assignment in assignments {
            placements
                .entry(assignment.client_id)
                .or_default()
                .push(Placement {
                    client_assignment_id: assignment.id,
                    pipeline_id: pipeline.id,
                    pipeline_title: pipeline.title.clone(),
                });
        }
    }

    Ok(placements)
}

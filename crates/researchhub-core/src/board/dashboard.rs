use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult};
use crate::auth::ValidationError;
use crate::models::Workspace;

use super::optimistic::OptimisticList;

/// The signed-in user's workspaces.
pub struct WorkspaceBoard {
    api: ApiClient,
    workspaces: OptimisticList<Workspace>,
}

impl WorkspaceBoard {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            workspaces: OptimisticList::default(),
        }
    }

    pub fn workspaces(&self) -> &[Workspace] {
        self.workspaces.items()
    }

    pub async fn refresh(&mut self) -> ApiResult<&[Workspace]> {
        let workspaces = self.api.list_workspaces().await?;
        debug!(count = workspaces.len(), "Workspaces loaded");
        self.workspaces.replace(workspaces);
        Ok(self.workspaces.items())
    }

    /// Create a workspace and show it first.
    pub async fn create(&mut self, name: &str, description: &str) -> ApiResult<Workspace> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("Name").into());
        }
        let workspace = self.api.create_workspace(name, description.trim()).await?;
        self.workspaces.insert_front(workspace.clone());
        Ok(workspace)
    }

    /// Remove a workspace, restoring it if the server refuses.
    pub async fn delete(&mut self, id: i64) -> ApiResult<()> {
        let removed = self.workspaces.remove(id);
        match self.api.delete_workspace(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(workspace_id = id, error = %e, "Failed to delete workspace");
                if let Some(removed) = removed {
                    self.workspaces.rollback(removed);
                }
                Err(e)
            }
        }
    }
}

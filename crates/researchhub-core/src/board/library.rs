use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult};
use crate::models::{Paper, Workspace};

use super::optimistic::OptimisticList;

/// One workspace and the papers imported into it.
pub struct WorkspaceLibrary {
    api: ApiClient,
    workspace: Workspace,
    papers: OptimisticList<Paper>,
}

impl WorkspaceLibrary {
    /// Fetch the workspace and its papers concurrently.
    pub async fn load(api: ApiClient, workspace_id: i64) -> ApiResult<Self> {
        let (workspace, papers) = futures::try_join!(
            api.get_workspace(workspace_id),
            api.list_papers(workspace_id)
        )?;
        debug!(workspace_id, papers = papers.len(), "Workspace loaded");

        Ok(Self {
            api,
            workspace,
            papers: OptimisticList::new(papers),
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn papers(&self) -> &[Paper] {
        self.papers.items()
    }

    pub async fn reload_papers(&mut self) -> ApiResult<&[Paper]> {
        let papers = self.api.list_papers(self.workspace.id).await?;
        self.workspace.paper_count = papers.len() as i64;
        self.papers.replace(papers);
        Ok(self.papers.items())
    }

    /// Remove a paper, restoring it if the server refuses.
    pub async fn delete_paper(&mut self, paper_id: i64) -> ApiResult<()> {
        let removed = self.papers.remove(paper_id);
        match self.api.delete_paper(paper_id).await {
            Ok(()) => {
                if removed.is_some() {
                    self.workspace.paper_count = (self.workspace.paper_count - 1).max(0);
                }
                Ok(())
            }
            Err(e) => {
                warn!(paper_id, error = %e, "Failed to delete paper");
                if let Some(removed) = removed {
                    self.papers.rollback(removed);
                }
                Err(e)
            }
        }
    }
}

use std::collections::HashSet;

use tracing::{debug, info};

use crate::api::{ApiClient, ApiResult};
use crate::models::{Paper, PaperImport, SearchResult};

/// Result of importing a search hit.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Imported(Paper),
    /// The workspace already holds this paper. Not an error.
    AlreadyPresent,
}

/// Search results plus which of them were imported where.
pub struct SearchSession {
    api: ApiClient,
    results: Vec<SearchResult>,
    imported: HashSet<(i64, String)>,
}

impl SearchSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            results: Vec::new(),
            imported: HashSet::new(),
        }
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Run a search, replacing the previous results.
    pub async fn search(&mut self, query: &str, limit: u32) -> ApiResult<&[SearchResult]> {
        self.results.clear();
        self.results = self.api.search_papers(query, limit).await?;
        debug!(count = self.results.len(), "Search complete");
        Ok(&self.results)
    }

    pub async fn import(
        &mut self,
        workspace_id: i64,
        result: &SearchResult,
    ) -> ApiResult<ImportOutcome> {
        let request = PaperImport::from_result(workspace_id, result);
        let outcome = match self.api.import_paper(&request).await {
            Ok(paper) => {
                info!(workspace_id, paper_id = paper.id, "Paper imported");
                ImportOutcome::Imported(paper)
            }
            Err(e) if e.is_conflict() => {
                debug!(workspace_id, key = result.import_key(), "Paper already in workspace");
                ImportOutcome::AlreadyPresent
            }
            Err(e) => return Err(e),
        };
        self.imported
            .insert((workspace_id, result.import_key().to_string()));
        Ok(outcome)
    }

    pub fn is_imported(&self, workspace_id: i64, result: &SearchResult) -> bool {
        self.imported
            .contains(&(workspace_id, result.import_key().to_string()))
    }
}

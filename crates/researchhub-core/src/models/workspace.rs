use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
    pub owner_id: i64,
    #[serde(default)]
    pub paper_count: i64,
}

impl Workspace {
    pub fn display_paper_count(&self) -> String {
        match self.paper_count {
            1 => "1 paper".to_string(),
            n => format!("{} papers", n),
        }
    }
}

/// Body of `POST /workspaces/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewWorkspace {
    pub name: String,
    pub description: String,
}

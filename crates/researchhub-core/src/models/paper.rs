use serde::{Deserialize, Serialize};

/// Source tag the server assumes when an import does not name one.
pub const DEFAULT_SOURCE: &str = "openalex";

/// A paper stored in a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: i64,
    pub title: String,
    pub authors: String,
    pub r#abstract: String,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub source: String,
    pub imported_at: String,
    pub workspace_id: i64,
}

/// A search hit from the external catalogue; not stored until imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub authors: String,
    pub r#abstract: String,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub source: String,
    pub external_id: Option<String>,
}

impl SearchResult {
    /// Key identifying this hit when tracking what has been imported:
    /// the external id when there is one, the title otherwise.
    pub fn import_key(&self) -> &str {
        match self.external_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.title,
        }
    }
}

/// Body of `POST /papers/import`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperImport {
    pub workspace_id: i64,
    pub title: String,
    pub authors: String,
    pub r#abstract: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl PaperImport {
    pub fn from_result(workspace_id: i64, result: &SearchResult) -> Self {
        Self {
            workspace_id,
            title: result.title.clone(),
            authors: result.authors.clone(),
            r#abstract: result.r#abstract.clone(),
            year: result.year,
            doi: result.doi.clone(),
            url: result.url.clone(),
            source: Some(result.source.clone()),
            external_id: result.external_id.clone(),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::edit::EditOperation;
use crate::tree::Document;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    /// The service refused a batch; the message is passed through verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One atomic batch of edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub edits: Vec<EditOperation>,
    /// Reject the batch unless the document is still at this revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_revision_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Revision after the batch was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSummary {
    pub tab_id: String,
    pub title: String,
    /// 0 for top-level tabs.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub document_id: String,
    pub title: String,
}

pub trait DocumentService {
    /// Fetch a document with the content of every tab.
    fn fetch_document(&self, document_id: &str) -> Result<Document, ServiceError>;

    /// Apply a batch atomically: either every edit lands or none does.
    fn apply_edits(
        &self,
        document_id: &str,
        request: &BatchRequest,
    ) -> Result<BatchResponse, ServiceError>;

    fn list_tabs(&self, document_id: &str) -> Result<Vec<TabSummary>, ServiceError>;

    fn create_document(&self, title: &str) -> Result<String, ServiceError>;

    fn delete_document(&self, document_id: &str) -> Result<(), ServiceError>;

    fn search_documents(&self, query: &str) -> Result<Vec<DocumentSummary>, ServiceError>;
}

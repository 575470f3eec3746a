//! Save and load of whole document snapshots, keyed by document id.

pub mod file_store;
pub mod memory_store;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::model::{PageDimension, Paragraph};
use crate::pipeline::page_dimensions_or_default;
use crate::state::{Action, DocumentInfo, DocumentState, HistoryEntry};

pub use file_store::FileSnapshotStore;
pub use memory_store::MemorySnapshotStore;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("no saved document with id '{0}'")]
    NotFound(String),

    #[error("'{0}' cannot be used as a document id")]
    InvalidId(String),

    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted form of a document.
///
/// Structure read back from storage is never trusted; loading goes through
/// [`Action::Load`], which normalizes both paragraph lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
    #[serde(alias = "document_id")]
    pub document_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default, alias = "page_dimensions")]
    pub page_dimensions: Vec<PageDimension>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, alias = "initial_paragraphs", skip_serializing_if = "Option::is_none")]
    pub initial_paragraphs: Option<Vec<Paragraph>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Vec<String>>,
}

impl PersistedDocument {
    /// Snapshot of a loaded document, or `None` when nothing is loaded.
    pub fn from_state(state: &DocumentState) -> Option<Self> {
        let document = state.document.as_ref()?;
        Some(Self {
            document_id: document.id.clone(),
            filename: document.filename.clone(),
            paragraphs: state.paragraphs.clone(),
            page_dimensions: state.page_dimensions.clone(),
            history: state.history.clone(),
            initial_paragraphs: Some(state.initial_paragraphs.to_vec()),
            suggestions: state.suggestions.groups().to_vec(),
        })
    }

    pub fn into_action(self) -> Action {
        let page_dimensions = page_dimensions_or_default(self.page_dimensions, &self.paragraphs);
        Action::Load {
            document: DocumentInfo::new(self.document_id, self.filename),
            paragraphs: self.paragraphs,
            page_dimensions,
            suggestions: self.suggestions,
            initial: self.initial_paragraphs,
            history: self.history,
        }
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, document: &PersistedDocument) -> Result<(), PersistError>;
    async fn load(&self, document_id: &str) -> Result<PersistedDocument, PersistError>;
    /// Ids of every saved document, sorted.
    async fn list(&self) -> Result<Vec<String>, PersistError>;
}

pub(crate) fn validate_id(document_id: &str) -> Result<(), PersistError> {
    let valid = !document_id.is_empty()
        && document_id != "."
        && document_id != ".."
        && !document_id.contains(&['/', '\\', '\0'][..]);
    if valid {
        Ok(())
    } else {
        Err(PersistError::InvalidId(document_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::SequentialIds;
    use crate::state::DocumentStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_backend_snake_case_payload() {
        let raw = r#"{
            "document_id": "doc-9",
            "filename": "cv.pdf",
            "paragraphs": [
                {"id": "a", "parent_id": "missing", "content": "Intro", "page_number": 2},
                {"id": "b", "parent_id": "a", "content": "Body"}
            ]
        }"#;
        let persisted: PersistedDocument = serde_json::from_str(raw).unwrap();
        assert!(persisted.initial_paragraphs.is_none());

        let mut store = DocumentStore::with_ids(SequentialIds::new());
        let state = store.dispatch(persisted.into_action()).unwrap();
        let root = crate::tree::root_of(&state.paragraphs).unwrap();
        assert_eq!(root.id, crate::tree::SYNTHETIC_ROOT_ID);
        assert_eq!(state.paragraph("b").unwrap().level, 2);
        assert_eq!(state.page_dimensions.len(), 2);
        assert_eq!(state.initial_paragraphs.len(), 3);
    }

    #[test]
    fn unloaded_state_has_nothing_to_persist() {
        assert!(PersistedDocument::from_state(&DocumentState::default()).is_none());
    }

    #[test]
    fn rejects_path_like_ids() {
        assert!(validate_id("doc-1").is_ok());
        assert!(validate_id("../etc").is_err());
        assert!(validate_id("").is_err());
        assert!(validate_id("..").is_err());
    }
}

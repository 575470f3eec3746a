//! The document state aggregate and the transitions that produce new
//! snapshots from it.

pub mod action;
pub mod history;
pub mod reducer;
pub mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::model::{MergeResult, PageDimension, Paragraph};
use crate::suggest::{Selection, SuggestionGroups};

pub use action::Action;
pub use history::HistoryEntry;
pub use reducer::reduce;
pub use store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub filename: String,
}

impl DocumentInfo {
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeMode {
    AiDefault,
    AiCustom,
}

/// An assisted merge staged for user confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReview {
    pub mode: MergeMode,
    /// Paragraphs to merge, in display order at the time the review opened.
    pub candidates: Vec<Paragraph>,
    pub instructions: Option<String>,
    pub suggestion: Option<MergeResult>,
    /// Revision the review was opened at; replies carrying another ticket are
    /// stale and ignored.
    pub ticket: u64,
}

impl MergeReview {
    pub fn candidate_ids(&self) -> Vec<String> {
        self.candidates.iter().map(|p| p.id.clone()).collect()
    }
}

/// One immutable snapshot of everything the workbench knows about a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentState {
    pub document: Option<DocumentInfo>,
    /// Frozen at load time; unmerge restores originals from here.
    pub initial_paragraphs: Arc<[Paragraph]>,
    /// Current tree in display order.
    pub paragraphs: Vec<Paragraph>,
    pub page_dimensions: Vec<PageDimension>,
    pub selection: Selection,
    pub suggestions: SuggestionGroups,
    pub history: Vec<HistoryEntry>,
    pub loading: bool,
    pub loading_message: String,
    pub saving: bool,
    pub error: Option<String>,
    pub review: Option<MergeReview>,
    /// Incremented by every applied transition.
    pub revision: u64,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            document: None,
            initial_paragraphs: Arc::from(Vec::new()),
            paragraphs: Vec::new(),
            page_dimensions: Vec::new(),
            selection: Selection::new(),
            suggestions: SuggestionGroups::default(),
            history: Vec::new(),
            loading: false,
            loading_message: String::new(),
            saving: false,
            error: None,
            review: None,
            revision: 0,
        }
    }
}

impl DocumentState {
    pub fn paragraph(&self, id: &str) -> Option<&Paragraph> {
        self.paragraphs.iter().find(|p| p.id == id)
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document.as_ref().map(|doc| doc.id.as_str())
    }
}

use crate::core::model::{MergeResult, PageDimension, Paragraph};
use crate::suggest::Selection;

use super::{DocumentInfo, HistoryEntry, MergeMode};

/// Every transition the document state accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the whole document with freshly loaded data.
    Load {
        document: DocumentInfo,
        paragraphs: Vec<Paragraph>,
        page_dimensions: Vec<PageDimension>,
        suggestions: Vec<Vec<String>>,
        /// Snapshot to unmerge from; defaults to `paragraphs`.
        initial: Option<Vec<Paragraph>>,
        history: Vec<HistoryEntry>,
    },
    /// Forget the current document and wait for a new one to be processed.
    StartProcessing(DocumentInfo),
    SetLoading(String),
    ClearLoading,
    Fail(String),
    ClearError,

    Select(Selection),
    ToggleSelection(String),
    ClearSelection,
    SelectSuggestion(usize),
    SetSuggestions(Vec<Vec<String>>),

    EditContent {
        id: String,
        content: String,
    },
    ConcatMerge(Vec<String>),
    Unmerge(String),

    /// Stage the current selection for an assisted merge.
    OpenMergeReview {
        mode: MergeMode,
        instructions: Option<String>,
    },
    MergeSuggestionReady {
        ticket: u64,
        result: MergeResult,
    },
    MergeSuggestionFailed {
        ticket: u64,
        message: String,
    },
    /// Commit the reviewed suggestion, possibly edited by the user.
    ConfirmMerge {
        result: MergeResult,
        prompt: String,
        custom_instructions: Option<String>,
    },
    CloseMergeReview,

    SaveStarted,
    SaveSucceeded,
    SaveFailed(String),

    Reset,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Load { .. } => "load",
            Action::StartProcessing(_) => "start-processing",
            Action::SetLoading(_) => "set-loading",
            Action::ClearLoading => "clear-loading",
            Action::Fail(_) => "fail",
            Action::ClearError => "clear-error",
            Action::Select(_) => "select",
            Action::ToggleSelection(_) => "toggle-selection",
            Action::ClearSelection => "clear-selection",
            Action::SelectSuggestion(_) => "select-suggestion",
            Action::SetSuggestions(_) => "set-suggestions",
            Action::EditContent { .. } => "edit-content",
            Action::ConcatMerge(_) => "concat-merge",
            Action::Unmerge(_) => "unmerge",
            Action::OpenMergeReview { .. } => "open-merge-review",
            Action::MergeSuggestionReady { .. } => "merge-suggestion-ready",
            Action::MergeSuggestionFailed { .. } => "merge-suggestion-failed",
            Action::ConfirmMerge { .. } => "confirm-merge",
            Action::CloseMergeReview => "close-merge-review",
            Action::SaveStarted => "save-started",
            Action::SaveSucceeded => "save-succeeded",
            Action::SaveFailed(_) => "save-failed",
            Action::Reset => "reset",
        }
    }
}

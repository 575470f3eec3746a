//! Structural edits on the paragraph list: merge, unmerge and content edits.
//!
//! Every operation takes the current list by reference and returns a new,
//! normalized list. A rejected operation never touches its input.

pub mod content;
pub mod merge;
pub mod unmerge;

use thiserror::Error;
use uuid::Uuid;

pub use content::edit_content;
pub use merge::{merge, merge_concat, MergeContent, MergeOutcome};
pub use unmerge::{unmerge, SourceIndex, UnmergeOutcome};

/// An edit request that cannot be applied to the current snapshot.
///
/// The `Display` text is meant to be shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Paragraph '{0}' does not exist")]
    UnknownParagraph(String),

    #[error("Paragraph '{0}' is not a merged paragraph and cannot be unmerged")]
    NotMerged(String),

    #[error("Cannot unmerge '{id}': source paragraph '{source_id}' is no longer available")]
    SourceUnavailable { id: String, source_id: String },

    #[error("Cannot unmerge '{id}': source paragraph '{source_id}' is already in the document")]
    SourceConsumed { id: String, source_id: String },

    #[error("At least two paragraphs must be selected to merge")]
    TooFewParagraphs,

    #[error("No merge is awaiting confirmation")]
    NoPendingReview,

    #[error("Suggestion group {0} does not exist")]
    UnknownSuggestion(usize),
}

/// Allocates ids for paragraphs created by merges.
pub trait IdSource: Send {
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Random short ids, e.g. `merged-3f9a01c2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        let simple = Uuid::new_v4().simple().to_string();
        format!("{prefix}-{}", &simple[..8])
    }
}

/// Deterministic ids (`merged-1`, `merged-2`, ...) for replay and tests.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: usize,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{prefix}-{}", self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_carry_prefix() {
        let id = RandomIds.next_id("merged");
        assert!(id.starts_with("merged-"));
        assert_eq!(id.len(), "merged-".len() + 8);
        assert_ne!(id, RandomIds.next_id("merged"));
    }

    #[test]
    fn sequential_ids_count_up() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id("merged"), "merged-1");
        assert_eq!(ids.next_id("merged"), "merged-2");
    }
}

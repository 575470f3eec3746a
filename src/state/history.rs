use serde::{Deserialize, Serialize};

use crate::core::model::Paragraph;

/// Audit record of a user action, persisted with the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum HistoryEntry {
    #[serde(rename = "EDIT_CONTENT", rename_all = "camelCase")]
    Edit {
        id: String,
        #[serde(alias = "old_content")]
        old_content: String,
        #[serde(alias = "new_content")]
        new_content: String,
    },
    #[serde(rename = "SIMPLE_MERGE", rename_all = "camelCase")]
    ConcatMerge {
        ids: Vec<String>,
        #[serde(alias = "new_paragraph")]
        new_paragraph: Paragraph,
    },
    #[serde(rename = "AI_MERGE", rename_all = "camelCase")]
    AiMerge {
        ids: Vec<String>,
        #[serde(alias = "new_paragraph")]
        new_paragraph: Paragraph,
        #[serde(default)]
        prompt: String,
        #[serde(default, alias = "custom_instructions")]
        custom_instructions: Option<String>,
    },
    #[serde(rename = "UNMERGE", rename_all = "camelCase")]
    Unmerge {
        id: String,
        #[serde(alias = "restored_ids")]
        restored_ids: Vec<String>,
    },
}

impl HistoryEntry {
    /// The paragraph this entry created, for merge entries.
    pub fn created_paragraph(&self) -> Option<&Paragraph> {
        match self {
            HistoryEntry::ConcatMerge { new_paragraph, .. } | HistoryEntry::AiMerge { new_paragraph, .. } => {
                Some(new_paragraph)
            }
            HistoryEntry::Edit { .. } | HistoryEntry::Unmerge { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HistoryEntry::Edit { .. } => "edit",
            HistoryEntry::ConcatMerge { .. } => "concat-merge",
            HistoryEntry::AiMerge { .. } => "ai-merge",
            HistoryEntry::Unmerge { .. } => "unmerge",
        }
    }
}

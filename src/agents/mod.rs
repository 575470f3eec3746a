//! Contracts for the external collaborators the workbench depends on.
//!
//! Every collaborator is passed in explicitly; nothing here keeps a process
//! wide client. [`CommandBridge`] talks to an external program over JSON and
//! implements all of them; the local types cover the ones that do not need a
//! model.

pub mod bridge;
pub mod local;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::model::{EnrichmentUpdate, LayoutExtraction, MergeResult, OcrBlock, Paragraph};

pub use bridge::CommandBridge;
pub use local::{FlatStructurer, HeuristicSuggester};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to start collaborator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("collaborator call '{operation}' failed ({status}): {stderr}")]
    Failed {
        operation: String,
        status: String,
        stderr: String,
    },

    #[error("collaborator call '{0}' returned an empty response")]
    EmptyResponse(String),

    #[error("collaborator call '{operation}' returned malformed JSON: {source}")]
    Malformed {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("collaborator I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Rejected(String),
}

/// OCR over an uploaded file.
#[async_trait]
pub trait LayoutExtractor: Send + Sync {
    async fn extract_layout(&self, file: &Path) -> Result<LayoutExtraction, AgentError>;
}

/// Turns flat OCR blocks into an initial parent/child tree with ids.
#[async_trait]
pub trait HierarchyStructurer: Send + Sync {
    async fn structure_hierarchy(&self, blocks: &[OcrBlock]) -> Result<Vec<Paragraph>, AgentError>;
}

/// Optional pass that pre-merges fragmented siblings.
#[async_trait]
pub trait CoherenceRefiner: Send + Sync {
    async fn refine_coherence(&self, paragraphs: &[Paragraph]) -> Result<Vec<Paragraph>, AgentError>;
}

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, paragraphs: &[Paragraph]) -> Result<Vec<EnrichmentUpdate>, AgentError>;
}

/// Proposes groups of paragraph ids worth merging.
#[async_trait]
pub trait MergeSuggester: Send + Sync {
    async fn suggest_merges(&self, paragraphs: &[Paragraph]) -> Result<Vec<Vec<String>>, AgentError>;
}

/// Writes merged content for paragraphs the user selected.
#[async_trait]
pub trait MergeAssistant: Send + Sync {
    async fn merge_paragraphs(
        &self,
        paragraphs: &[Paragraph],
        instructions: Option<&str>,
    ) -> Result<MergeResult, AgentError>;
}

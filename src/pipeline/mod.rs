//! Turning an uploaded file into a loadable document, either locally through
//! the collaborator chain or by waiting on a server-side job.

pub mod poll;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::agents::{CoherenceRefiner, Enricher, HierarchyStructurer, LayoutExtractor, MergeSuggester};
use crate::core::model::{default_unit, EnrichmentUpdate, PageDimension, Paragraph};
use crate::state::{Action, DocumentInfo};
use crate::suggest::suggest_merges;
use crate::tree::normalize;

pub use poll::{cancel_pair, poll_job, CancelHandle, CancelSignal, JobStatus, PollError, StatusReport, StatusSource};

pub const DEFAULT_PAGE_WIDTH: f64 = 8.5;
pub const DEFAULT_PAGE_HEIGHT: f64 = 11.0;

/// Collaborators used by [`process_document`]. Refinement and enrichment are
/// skipped when absent; without a suggester the local heuristic is used.
pub struct Collaborators<'a> {
    pub extractor: &'a dyn LayoutExtractor,
    pub structurer: &'a dyn HierarchyStructurer,
    pub refiner: Option<&'a dyn CoherenceRefiner>,
    pub enricher: Option<&'a dyn Enricher>,
    pub suggester: Option<&'a dyn MergeSuggester>,
}

impl<'a> Collaborators<'a> {
    pub fn new(extractor: &'a dyn LayoutExtractor, structurer: &'a dyn HierarchyStructurer) -> Self {
        Self {
            extractor,
            structurer,
            refiner: None,
            enricher: None,
            suggester: None,
        }
    }

    pub fn with_refiner(mut self, refiner: &'a dyn CoherenceRefiner) -> Self {
        self.refiner = Some(refiner);
        self
    }

    pub fn with_enricher(mut self, enricher: &'a dyn Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_suggester(mut self, suggester: &'a dyn MergeSuggester) -> Self {
        self.suggester = Some(suggester);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Structuring,
    Refining,
    Enriching,
    Finalizing,
}

impl Stage {
    pub fn message(self) -> &'static str {
        match self {
            Stage::Extracting => "Extracting text and layout...",
            Stage::Structuring => "Building document hierarchy...",
            Stage::Refining => "Refining paragraph coherence...",
            Stage::Enriching => "Enriching paragraphs...",
            Stage::Finalizing => "Preparing data for display...",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDocument {
    pub paragraphs: Vec<Paragraph>,
    pub page_dimensions: Vec<PageDimension>,
    pub suggestions: Vec<Vec<String>>,
}

impl ProcessedDocument {
    pub fn into_action(self, document: DocumentInfo) -> Action {
        Action::Load {
            document,
            paragraphs: self.paragraphs,
            page_dimensions: self.page_dimensions,
            suggestions: self.suggestions,
            initial: None,
            history: Vec::new(),
        }
    }
}

/// Runs extraction, structuring and the optional passes over `file`.
pub async fn process_document(
    file: &Path,
    collaborators: &Collaborators<'_>,
    mut progress: impl FnMut(Stage) + Send,
) -> Result<ProcessedDocument> {
    progress(Stage::Extracting);
    let extraction = collaborators
        .extractor
        .extract_layout(file)
        .await
        .with_context(|| format!("layout extraction failed for {}", file.display()))?;
    if extraction.blocks.is_empty() {
        bail!("no text blocks found in {}", file.display());
    }
    info!(blocks = extraction.blocks.len(), pages = extraction.page_dimensions.len(), "layout extracted");

    progress(Stage::Structuring);
    let mut paragraphs = collaborators
        .structurer
        .structure_hierarchy(&extraction.blocks)
        .await
        .context("hierarchy structuring failed")?;

    if let Some(refiner) = collaborators.refiner {
        progress(Stage::Refining);
        paragraphs = refiner
            .refine_coherence(&paragraphs)
            .await
            .context("coherence refinement failed")?;
    }

    if let Some(enricher) = collaborators.enricher {
        progress(Stage::Enriching);
        let updates = enricher.enrich(&paragraphs).await.context("enrichment failed")?;
        paragraphs = attach_enrichment(paragraphs, updates);
    }

    progress(Stage::Finalizing);
    let paragraphs = normalize(&paragraphs);
    let page_dimensions = page_dimensions_or_default(extraction.page_dimensions, &paragraphs);
    let suggestions = match collaborators.suggester {
        Some(suggester) => suggester
            .suggest_merges(&paragraphs)
            .await
            .context("merge suggestion failed")?,
        None => suggest_merges(&paragraphs),
    };
    info!(
        paragraphs = paragraphs.len(),
        suggestions = suggestions.len(),
        "document processed"
    );
    Ok(ProcessedDocument {
        paragraphs,
        page_dimensions,
        suggestions,
    })
}

/// Replaces each paragraph's enrichment with the update for its id, if any.
pub fn attach_enrichment(paragraphs: Vec<Paragraph>, updates: Vec<EnrichmentUpdate>) -> Vec<Paragraph> {
    let mut by_id: HashMap<String, _> = updates
        .into_iter()
        .map(|update| (update.id, update.enrichment))
        .collect();
    paragraphs
        .into_iter()
        .map(|mut paragraph| {
            if let Some(enrichment) = by_id.remove(&paragraph.id) {
                paragraph.enrichment = Some(enrichment);
            }
            paragraph
        })
        .collect()
}

/// `raw` when non-empty, otherwise one default-sized page for every page
/// number up to the highest one referenced.
pub fn page_dimensions_or_default(raw: Vec<PageDimension>, paragraphs: &[Paragraph]) -> Vec<PageDimension> {
    if !raw.is_empty() {
        return raw;
    }
    let last_page = paragraphs.iter().filter_map(|p| p.page_number).max().unwrap_or(0);
    debug!(pages = last_page, "generating default page dimensions");
    (1..=last_page)
        .map(|page_number| PageDimension {
            page_number,
            width: DEFAULT_PAGE_WIDTH,
            height: DEFAULT_PAGE_HEIGHT,
            unit: default_unit(),
        })
        .collect()
}

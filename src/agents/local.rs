use async_trait::async_trait;

use crate::core::model::{OcrBlock, Paragraph};
use crate::suggest::suggest_merges;

use super::{AgentError, HierarchyStructurer, MergeSuggester};

/// Suggests merges with the local fragment heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicSuggester;

#[async_trait]
impl MergeSuggester for HeuristicSuggester {
    async fn suggest_merges(&self, paragraphs: &[Paragraph]) -> Result<Vec<Vec<String>>, AgentError> {
        Ok(suggest_merges(paragraphs))
    }
}

/// Keeps the reading order of the blocks and hangs every block below the
/// first one. Used when no structuring model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatStructurer;

#[async_trait]
impl HierarchyStructurer for FlatStructurer {
    async fn structure_hierarchy(&self, blocks: &[OcrBlock]) -> Result<Vec<Paragraph>, AgentError> {
        let mut paragraphs = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            let id = format!("block-{}", index + 1);
            let parent = (index > 0).then_some("block-1");
            let mut paragraph =
                Paragraph::new(id, parent, block.text.trim()).with_region(block.bounding_box, block.page_number);
            paragraph.role = block.role.clone();
            paragraphs.push(paragraph);
        }
        Ok(paragraphs)
    }
}

//! Selection state and merge suggestions.
//!
//! Neither type here mutates the paragraph list; they only describe which ids
//! the user picked and which ids look like fragments of one another.

pub mod heuristic;
pub mod selection;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::model::Paragraph;

pub use heuristic::{looks_fragmented, suggest_merges};
pub use selection::Selection;

/// Number of highlight colors suggestion groups cycle through.
pub const PALETTE_SIZE: usize = 5;

/// Proposed merge groups, each holding at least two ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionGroups(Vec<Vec<String>>);

impl SuggestionGroups {
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self(groups)
    }

    /// Keeps only groups that still name at least two distinct present ids.
    pub fn sanitized(groups: Vec<Vec<String>>, paragraphs: &[Paragraph]) -> Self {
        let mut sanitized = Self(groups);
        sanitized.retain_present(paragraphs);
        sanitized
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&[String]> {
        self.0.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the group containing `id`.
    pub fn group_of(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|group| group.iter().any(|member| member == id))
    }

    /// Color slot used to highlight `id`, stable for a given group index.
    pub fn color_slot(&self, id: &str) -> Option<usize> {
        self.group_of(id).map(|index| {
            let checksum: u32 = group_label(index).chars().map(u32::from).sum();
            checksum as usize % PALETTE_SIZE
        })
    }

    pub fn retain_present(&mut self, paragraphs: &[Paragraph]) {
        let present: HashSet<&str> = paragraphs.iter().map(|p| p.id.as_str()).collect();
        for group in &mut self.0 {
            let mut seen = HashSet::new();
            group.retain(|id| present.contains(id.as_str()) && seen.insert(id.clone()));
        }
        self.0.retain(|group| group.len() >= 2);
    }
}

/// Label of the group at `index`, e.g. `suggestion-0`.
pub fn group_label(index: usize) -> String {
    format!("suggestion-{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn color_slot_follows_group_label_checksum() {
        let groups = SuggestionGroups::new(vec![ids(&["a", "b"]), ids(&["c", "d"])]);
        let expected = |index: usize| group_label(index).chars().map(u32::from).sum::<u32>() as usize % PALETTE_SIZE;
        assert_eq!(groups.color_slot("a"), Some(expected(0)));
        assert_eq!(groups.color_slot("d"), Some(expected(1)));
        assert_eq!(groups.color_slot("zzz"), None);
    }

    #[test]
    fn pruning_drops_groups_that_lost_members() {
        let paragraphs = vec![
            Paragraph::new("a", None, ""),
            Paragraph::new("b", Some("a"), ""),
            Paragraph::new("c", Some("a"), ""),
        ];
        let groups = SuggestionGroups::sanitized(
            vec![ids(&["a", "b", "gone"]), ids(&["c", "gone"]), ids(&["b", "b"])],
            &paragraphs,
        );
        assert_eq!(groups.groups(), &[ids(&["a", "b"])]);
        assert_eq!(groups.group_of("b"), Some(0));
    }
}

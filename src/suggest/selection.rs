use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::model::Paragraph;

/// Set of selected paragraph ids.
///
/// Storage order carries no meaning; consumers recover display order from the
/// paragraph list with [`Selection::in_display_order`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeSet<String>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>) {
        self.0.insert(id.into());
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.0.remove(id) {
            self.0.insert(id.to_string());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn in_display_order<'a>(&self, paragraphs: &'a [Paragraph]) -> Vec<&'a Paragraph> {
        paragraphs.iter().filter(|p| self.contains(&p.id)).collect()
    }

    pub fn ordered_ids(&self, paragraphs: &[Paragraph]) -> Vec<String> {
        self.in_display_order(paragraphs)
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    /// Forgets ids that no longer exist in `paragraphs`.
    pub fn retain_present(&mut self, paragraphs: &[Paragraph]) {
        let present: HashSet<&str> = paragraphs.iter().map(|p| p.id.as_str()).collect();
        self.0.retain(|id| present.contains(id.as_str()));
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

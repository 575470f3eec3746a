use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::model::Paragraph;
use crate::edit::EditError;
use crate::tree::normalize;

/// Where unmerge looks up the records a merged paragraph replaced.
///
/// The frozen initial snapshot is consulted first. Paragraphs that were
/// themselves created by an earlier merge are found among `created`, the
/// records captured when each merge was applied.
#[derive(Debug, Default)]
pub struct SourceIndex<'a> {
    initial: HashMap<&'a str, &'a Paragraph>,
    created: HashMap<&'a str, &'a Paragraph>,
}

impl<'a> SourceIndex<'a> {
    pub fn new(initial: &'a [Paragraph]) -> Self {
        Self {
            initial: initial.iter().map(|p| (p.id.as_str(), p)).collect(),
            created: HashMap::new(),
        }
    }

    /// Registers a merge-created record. Later registrations win.
    pub fn with_created(mut self, records: impl IntoIterator<Item = &'a Paragraph>) -> Self {
        for record in records {
            self.created.insert(record.id.as_str(), record);
        }
        self
    }

    pub fn lookup(&self, id: &str) -> Option<&'a Paragraph> {
        self.initial.get(id).or_else(|| self.created.get(id)).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnmergeOutcome {
    pub paragraphs: Vec<Paragraph>,
    pub restored_ids: Vec<String>,
}

/// Replaces a merged paragraph with the records it was built from.
///
/// Restored records are spliced in at the merged paragraph's position, in
/// `source_ids` order. Paragraphs parented to the merged node go back to the
/// parent recorded for them in `sources`.
pub fn unmerge(paragraphs: &[Paragraph], id: &str, sources: &SourceIndex<'_>) -> Result<UnmergeOutcome, EditError> {
    let position = paragraphs
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| EditError::UnknownParagraph(id.to_string()))?;
    let merged = &paragraphs[position];
    if !merged.is_unmergeable() {
        return Err(EditError::NotMerged(id.to_string()));
    }

    let present: HashSet<&str> = paragraphs.iter().map(|p| p.id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut restored: Vec<Paragraph> = Vec::with_capacity(merged.source_ids.len());
    for source_id in &merged.source_ids {
        if !seen.insert(source_id.as_str()) {
            continue;
        }
        if present.contains(source_id.as_str()) {
            return Err(EditError::SourceConsumed {
                id: id.to_string(),
                source_id: source_id.clone(),
            });
        }
        let record = sources.lookup(source_id).ok_or_else(|| EditError::SourceUnavailable {
            id: id.to_string(),
            source_id: source_id.clone(),
        })?;
        restored.push(record.clone());
    }

    let restored_ids: HashSet<&str> = restored.iter().map(|p| p.id.as_str()).collect();
    let available = |parent: &str| {
        parent != id && (present.contains(parent) || restored_ids.contains(parent))
    };

    // A restored record whose recorded parent is gone stays where the merged
    // node was.
    let restored: Vec<Paragraph> = restored
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if !record.parent().is_some_and(&available) {
                record.parent_id = merged.parent_id.clone();
            }
            record
        })
        .collect();
    let fallback_parent = restored.first().map(|p| p.id.clone());

    let mut next = Vec::with_capacity(paragraphs.len() + restored.len());
    for (idx, p) in paragraphs.iter().enumerate() {
        if idx == position {
            next.extend(restored.iter().cloned());
            continue;
        }
        let mut kept = p.clone();
        if kept.parent() == Some(id) {
            kept.parent_id = sources
                .lookup(&kept.id)
                .and_then(|original| original.parent())
                .filter(|parent| available(*parent))
                .map(str::to_string)
                .or_else(|| fallback_parent.clone());
        }
        next.push(kept);
    }

    let restored_ids: Vec<String> = restored.into_iter().map(|p| p.id).collect();
    debug!(merged_id = %id, restored = restored_ids.len(), "paragraph unmerged");
    Ok(UnmergeOutcome {
        paragraphs: normalize(&next),
        restored_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::merge::merge_concat;
    use crate::tree::is_well_formed;
    use pretty_assertions::assert_eq;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn initial() -> Vec<Paragraph> {
        normalize(&[
            Paragraph::new("r", None, "root"),
            Paragraph::new("a", Some("r"), "Deloitte India"),
            Paragraph::new("a1", Some("a"), "child of a"),
            Paragraph::new("b", Some("r"), "and led teams"),
            Paragraph::new("b1", Some("b"), "child of b"),
            Paragraph::new("c", Some("r"), "tail"),
        ])
    }

    #[test]
    fn round_trip_restores_sources_and_parents() {
        let initial = initial();
        let merged = merge_concat(&initial, &ids(&["a", "b"]), "m".into()).unwrap();
        let out = unmerge(&merged.paragraphs, "m", &SourceIndex::new(&initial)).unwrap();

        assert_eq!(out.restored_ids, ids(&["a", "b"]));
        let shape: Vec<_> = out
            .paragraphs
            .iter()
            .map(|p| (p.id.as_str(), p.parent(), p.content.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("r", None, "root"),
                ("a", Some("r"), "Deloitte India"),
                ("b", Some("r"), "and led teams"),
                ("a1", Some("a"), "child of a"),
                ("b1", Some("b"), "child of b"),
                ("c", Some("r"), "tail"),
            ]
        );
        assert!(is_well_formed(&out.paragraphs));
    }

    #[test]
    fn unmerging_original_paragraph_is_rejected() {
        let initial = initial();
        let err = unmerge(&initial, "a", &SourceIndex::new(&initial)).unwrap_err();
        assert_eq!(err, EditError::NotMerged("a".into()));
    }

    #[test]
    fn unknown_id_is_rejected() {
        let initial = initial();
        let err = unmerge(&initial, "nope", &SourceIndex::new(&initial)).unwrap_err();
        assert_eq!(err, EditError::UnknownParagraph("nope".into()));
    }

    #[test]
    fn missing_source_is_reported() {
        let initial = initial();
        let merged = merge_concat(&initial, &ids(&["a", "b"]), "m".into()).unwrap();
        let err = unmerge(&merged.paragraphs, "m", &SourceIndex::new(&[])).unwrap_err();
        assert_eq!(
            err,
            EditError::SourceUnavailable {
                id: "m".into(),
                source_id: "a".into()
            }
        );
    }

    #[test]
    fn source_already_present_is_reported() {
        let initial = initial();
        let mut paragraphs = initial.clone();
        let mut fake = Paragraph::new("m", Some("r"), "x");
        fake.is_merged = true;
        fake.source_ids = ids(&["c"]);
        paragraphs.push(fake);
        let err = unmerge(&paragraphs, "m", &SourceIndex::new(&initial)).unwrap_err();
        assert!(matches!(err, EditError::SourceConsumed { .. }));
    }

    #[test]
    fn nested_merge_unwinds_one_level_at_a_time() {
        let initial = initial();
        let first = merge_concat(&initial, &ids(&["a", "b"]), "m1".into()).unwrap();
        let second = merge_concat(&first.paragraphs, &ids(&["m1", "c"]), "m2".into()).unwrap();
        let sources = SourceIndex::new(&initial).with_created([&first.merged, &second.merged]);

        let outer = unmerge(&second.paragraphs, "m2", &sources).unwrap();
        assert_eq!(outer.restored_ids, ids(&["m1", "c"]));
        let m1 = outer.paragraphs.iter().find(|p| p.id == "m1").unwrap();
        assert!(m1.is_unmergeable());
        assert_eq!(m1.content, "Deloitte India and led teams");

        let inner = unmerge(&outer.paragraphs, "m1", &sources).unwrap();
        let order: Vec<_> = inner.paragraphs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["r", "a", "b", "c", "a1", "b1"]);
        assert!(is_well_formed(&inner.paragraphs));
    }
}

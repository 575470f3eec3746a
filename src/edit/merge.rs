use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::geometry::combine_regions;
use crate::core::model::{MergeResult, Paragraph};
use crate::tree::normalize;

/// Where the merged paragraph's content comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeContent {
    /// Contents joined with a single space; region and role of the first
    /// paragraph in display order.
    Concat,
    /// Content and enrichment supplied by an assistant; role from
    /// `enrichment.role` when present and region combined over all sources.
    Assisted(MergeResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub paragraphs: Vec<Paragraph>,
    /// The new paragraph as created, before re-normalization touched its level.
    pub merged: Paragraph,
}

/// Selected paragraphs in current display order, ignoring ids that are absent.
pub fn gather_in_display_order<'a>(paragraphs: &'a [Paragraph], ids: &[String]) -> Vec<&'a Paragraph> {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    paragraphs
        .iter()
        .filter(|p| wanted.contains(p.id.as_str()))
        .collect()
}

pub fn merge_concat(paragraphs: &[Paragraph], ids: &[String], new_id: String) -> Option<MergeOutcome> {
    merge(paragraphs, ids, new_id, MergeContent::Concat)
}

/// Replaces the selected paragraphs with one merged paragraph.
///
/// Returns `None` when fewer than two of `ids` are present. The new paragraph
/// takes the place of the first selected paragraph in display order, and any
/// paragraph parented to a removed one is moved under it.
pub fn merge(
    paragraphs: &[Paragraph],
    ids: &[String],
    new_id: String,
    content: MergeContent,
) -> Option<MergeOutcome> {
    let selected = gather_in_display_order(paragraphs, ids);
    if selected.len() < 2 {
        debug!(requested = ids.len(), present = selected.len(), "merge ignored");
        return None;
    }
    let first = selected[0];
    let removed: HashSet<&str> = selected.iter().map(|p| p.id.as_str()).collect();

    let mut merged = Paragraph {
        id: new_id,
        parent_id: inherited_parent(paragraphs, first, &removed),
        content: String::new(),
        role: first.role.clone(),
        level: first.level,
        enrichment: None,
        bounding_box: first.bounding_box,
        page_number: first.page_number,
        is_merged: true,
        source_ids: requested_order(ids, &removed),
    };

    match content {
        MergeContent::Concat => {
            merged.content = selected
                .iter()
                .map(|p| p.content.as_str())
                .collect::<Vec<_>>()
                .join(" ");
        }
        MergeContent::Assisted(result) => {
            if let Some(role) = result.role() {
                merged.role = Some(role.to_string());
            }
            let region = combine_regions(selected.iter().copied());
            merged.bounding_box = region.bounding_box;
            merged.page_number = region.page_number;
            merged.content = result.content;
            merged.enrichment = Some(result.enrichment);
        }
    }

    let mut next = Vec::with_capacity(paragraphs.len() + 1 - selected.len());
    for p in paragraphs {
        if p.id == first.id {
            next.push(merged.clone());
        }
        if removed.contains(p.id.as_str()) {
            continue;
        }
        let mut kept = p.clone();
        if kept.parent().is_some_and(|parent| removed.contains(parent)) {
            kept.parent_id = Some(merged.id.clone());
        }
        next.push(kept);
    }

    debug!(merged_id = %merged.id, sources = merged.source_ids.len(), "paragraphs merged");
    Some(MergeOutcome {
        paragraphs: normalize(&next),
        merged,
    })
}

/// Merged ids as the caller listed them, present ones only and without repeats.
/// Unmerge restores sources in this order.
fn requested_order(ids: &[String], removed: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| removed.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Parent of the first selected paragraph, skipping ancestors that are part of
/// the same merge so the new node never points at itself.
fn inherited_parent(paragraphs: &[Paragraph], first: &Paragraph, removed: &HashSet<&str>) -> Option<String> {
    let by_id: HashMap<&str, &Paragraph> = paragraphs.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut parent = first.parent();
    for _ in 0..paragraphs.len() {
        match parent {
            Some(id) if removed.contains(id) => {
                parent = by_id.get(id).and_then(|p| p.parent());
            }
            _ => break,
        }
    }
    parent.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BoundingBox;
    use crate::core::model::Enrichment;
    use crate::tree::is_well_formed;
    use pretty_assertions::assert_eq;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn experience() -> Vec<Paragraph> {
        normalize(&[
            Paragraph::new("p1", None, "Experience").with_role("sectionHeading"),
            Paragraph::new("p2", Some("p1"), "Built ").with_role("paragraph"),
            Paragraph::new("p3", Some("p1"), "a pipeline."),
        ])
    }

    #[test]
    fn concat_merge_joins_with_single_space() {
        let out = merge_concat(&experience(), &ids(&["p2", "p3"]), "m1".into()).unwrap();
        assert_eq!(out.paragraphs.len(), 2);
        assert_eq!(out.paragraphs[0].id, "p1");
        let merged = &out.paragraphs[1];
        assert_eq!(merged.content, "Built  a pipeline.");
        assert_eq!(merged.parent(), Some("p1"));
        assert_eq!(merged.level, 1);
        assert_eq!(merged.role.as_deref(), Some("paragraph"));
        assert!(merged.is_merged);
        assert_eq!(merged.source_ids, ids(&["p2", "p3"]));
    }

    #[test]
    fn content_follows_display_order_and_sources_follow_request() {
        let out = merge_concat(&experience(), &ids(&["p3", "ghost", "p2", "p3"]), "m1".into()).unwrap();
        assert_eq!(out.merged.content, "Built  a pipeline.");
        assert_eq!(out.merged.source_ids, ids(&["p3", "p2"]));
    }

    #[test]
    fn fewer_than_two_present_is_ignored() {
        let paragraphs = experience();
        assert!(merge_concat(&paragraphs, &ids(&["p2"]), "m1".into()).is_none());
        assert!(merge_concat(&paragraphs, &ids(&["p2", "ghost"]), "m1".into()).is_none());
        assert!(merge_concat(&paragraphs, &[], "m1".into()).is_none());
    }

    #[test]
    fn children_of_removed_nodes_move_under_merged_node() {
        let paragraphs = normalize(&[
            Paragraph::new("r", None, "root"),
            Paragraph::new("a", Some("r"), "a"),
            Paragraph::new("a1", Some("a"), "a1"),
            Paragraph::new("b", Some("r"), "b"),
            Paragraph::new("b1", Some("b"), "b1"),
        ]);
        let out = merge_concat(&paragraphs, &ids(&["a", "b"]), "m".into()).unwrap();
        let order: Vec<_> = out.paragraphs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["r", "m", "a1", "b1"]);
        assert_eq!(out.paragraphs[2].parent(), Some("m"));
        assert_eq!(out.paragraphs[3].parent(), Some("m"));
        assert_eq!(out.paragraphs[3].level, 2);
        assert!(is_well_formed(&out.paragraphs));
    }

    #[test]
    fn merging_parent_with_child_keeps_outer_parent() {
        let paragraphs = normalize(&[
            Paragraph::new("r", None, "root"),
            Paragraph::new("child", Some("parent"), "child"),
            Paragraph::new("parent", Some("r"), "parent"),
        ]);
        let out = merge_concat(&paragraphs, &ids(&["parent", "child"]), "m".into()).unwrap();
        assert_eq!(out.merged.parent(), Some("r"));
        assert_eq!(out.merged.content, "child parent");
        assert!(is_well_formed(&out.paragraphs));
    }

    #[test]
    fn assisted_merge_uses_result_and_combined_region() {
        let paragraphs = normalize(&[
            Paragraph::new("r", None, "root"),
            Paragraph::new("a", Some("r"), "Senior")
                .with_role("paragraph")
                .with_region(BoundingBox::new(10.0, 10.0, 10.0, 10.0), 1),
            Paragraph::new("b", Some("r"), "engineer")
                .with_region(BoundingBox::new(30.0, 30.0, 10.0, 10.0), 1),
        ]);
        let mut enrichment = Enrichment::new();
        enrichment.insert("role".into(), serde_json::json!("jobTitle"));
        let result = MergeResult {
            content: "Senior engineer".into(),
            enrichment: enrichment.clone(),
        };
        let out = merge(&paragraphs, &ids(&["a", "b"]), "m".into(), MergeContent::Assisted(result)).unwrap();
        assert_eq!(out.merged.content, "Senior engineer");
        assert_eq!(out.merged.role.as_deref(), Some("jobTitle"));
        assert_eq!(out.merged.enrichment, Some(enrichment));
        assert_eq!(out.merged.bounding_box, Some(BoundingBox::new(10.0, 10.0, 30.0, 30.0)));
        assert_eq!(out.merged.page_number, Some(1));
    }

    #[test]
    fn merging_the_root_promotes_merged_node() {
        let paragraphs = experience();
        let out = merge_concat(&paragraphs, &ids(&["p1", "p2"]), "m".into()).unwrap();
        assert_eq!(out.paragraphs[0].id, "m");
        assert_eq!(out.paragraphs[0].parent_id, None);
        assert_eq!(out.paragraphs[1].parent(), Some("m"));
    }
}

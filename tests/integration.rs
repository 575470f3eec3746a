use std::sync::Arc;

use anyhow::Result;
use pretty_assertions::assert_eq;

use docstruct_workbench::core::geometry::{combine_regions, BoundingBox, Region};
use docstruct_workbench::core::model::Paragraph;
use docstruct_workbench::edit::{merge_concat, unmerge, SequentialIds, SourceIndex};
use docstruct_workbench::export::export_document;
use docstruct_workbench::persist::{FileSnapshotStore, SnapshotStore};
use docstruct_workbench::state::{Action, DocumentInfo, DocumentStore};
use docstruct_workbench::suggest::looks_fragmented;
use docstruct_workbench::tree::{depth_of, normalize, root_of, SYNTHETIC_ROOT_ID};
use docstruct_workbench::Workbench;

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn load(paragraphs: Vec<Paragraph>) -> Action {
    Action::Load {
        document: DocumentInfo::new("resume", "resume.pdf"),
        paragraphs,
        page_dimensions: Vec::new(),
        suggestions: Vec::new(),
        initial: None,
        history: Vec::new(),
    }
}

/// A dangling parent and its child end up under a synthetic root.
#[test]
fn test_normalize_dangling_parent() {
    let normalized = normalize(&[
        Paragraph::new("a", Some("missing"), "A"),
        Paragraph::new("b", Some("a"), "B"),
    ]);

    assert_eq!(root_of(&normalized).map(|p| p.id.as_str()), Some(SYNTHETIC_ROOT_ID));
    let a = normalized.iter().find(|p| p.id == "a").unwrap();
    let b = normalized.iter().find(|p| p.id == "b").unwrap();
    assert_eq!((a.parent(), a.level), (Some(SYNTHETIC_ROOT_ID), 1));
    assert_eq!((b.parent(), b.level), (Some("a"), 2));
    for p in &normalized {
        assert_eq!(depth_of(&normalized, &p.id), Some(p.level));
    }
}

/// Concatenating two siblings keeps the parent and records provenance.
#[test]
fn test_merge_concat_scenario() {
    let paragraphs = normalize(&[
        Paragraph::new("p1", None, "Experience"),
        Paragraph::new("p2", Some("p1"), "Built "),
        Paragraph::new("p3", Some("p1"), "a pipeline."),
    ]);
    let outcome = merge_concat(&paragraphs, &ids(&["p2", "p3"]), "m1".into()).unwrap();

    assert_eq!(outcome.paragraphs.len(), 2);
    let merged = &outcome.paragraphs[1];
    assert_eq!(merged.content, "Built  a pipeline.");
    assert_eq!(merged.parent(), Some("p1"));
    assert_eq!(merged.source_ids, ids(&["p2", "p3"]));
    assert!(merged.is_merged);
}

#[test]
fn test_merge_needs_two_present_ids() {
    let paragraphs = normalize(&[Paragraph::new("p1", None, "x"), Paragraph::new("p2", Some("p1"), "y")]);
    assert!(merge_concat(&paragraphs, &ids(&["p2"]), "m".into()).is_none());
    assert!(merge_concat(&paragraphs, &ids(&["p2", "nope"]), "m".into()).is_none());
}

/// Every sibling pair survives a merge/unmerge round trip, children included.
#[test]
fn test_unmerge_round_trip_for_every_sibling_pair() {
    let initial = normalize(&[
        Paragraph::new("r", None, "root"),
        Paragraph::new("a", Some("r"), "alpha"),
        Paragraph::new("b", Some("r"), "beta"),
        Paragraph::new("c", Some("r"), "gamma"),
        Paragraph::new("a1", Some("a"), "alpha child"),
        Paragraph::new("c1", Some("c"), "gamma child"),
    ]);
    let siblings = ["a", "b", "c"];
    for (i, first) in siblings.iter().enumerate() {
        for second in &siblings[i + 1..] {
            let merged = merge_concat(&initial, &ids(&[*first, *second]), "m".into()).unwrap();
            let restored = unmerge(&merged.paragraphs, "m", &SourceIndex::new(&initial)).unwrap();

            for id in [*first, *second] {
                let original = initial.iter().find(|p| p.id == id).unwrap();
                let back = restored.paragraphs.iter().find(|p| p.id == id).unwrap();
                assert_eq!(back.content, original.content);
            }
            for child in ["a1", "c1"] {
                let before = initial.iter().find(|p| p.id == child).unwrap();
                let after = restored.paragraphs.iter().find(|p| p.id == child).unwrap();
                assert_eq!(after.parent(), before.parent(), "{child} after {first}+{second}");
            }
        }
    }
}

#[test]
fn test_fragment_heuristic_scenario() {
    assert!(looks_fragmented("Deloitte India", "and led teams"));
    assert!(!looks_fragmented("Deloitte India.", "And led teams"));
}

#[test]
fn test_combine_regions_bounds() {
    assert_eq!(combine_regions(&Vec::<Paragraph>::new()), Region::default());

    let boxes = [
        BoundingBox::new(4.0, 2.0, 3.0, 1.0),
        BoundingBox::new(1.0, 5.0, 2.0, 2.0),
        BoundingBox::new(2.0, 3.0, 8.0, 1.0),
    ];
    let paragraphs: Vec<Paragraph> = boxes
        .iter()
        .enumerate()
        .map(|(i, b)| Paragraph::new(format!("p{i}"), None, "").with_region(*b, 1))
        .collect();
    let region = combine_regions(&paragraphs);
    assert_eq!(region.bounding_box, Some(BoundingBox::new(1.0, 2.0, 9.0, 5.0)));
    assert_eq!(region.page_number, Some(1));
}

/// Edits made through the workbench survive a save to disk and a reload.
#[tokio::test]
async fn test_workbench_persists_to_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let snapshots: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(dir.path().join("snapshots")));

    let mut bench = Workbench::with_store(DocumentStore::with_ids(SequentialIds::new()), snapshots.clone());
    bench.dispatch(load(vec![
        Paragraph::new("p1", None, "Experience"),
        Paragraph::new("p2", Some("p1"), "Worked at"),
        Paragraph::new("p3", Some("p1"), "deloitte"),
        Paragraph::new("p4", Some("p3"), "Led teams."),
    ]))?;
    bench.dispatch(Action::ConcatMerge(ids(&["p2", "p3"])))?;
    bench.dispatch(Action::EditContent {
        id: "merged-1".into(),
        content: "Worked at Deloitte".into(),
    })?;
    bench.save().await?;

    assert_eq!(snapshots.list().await?, vec!["resume".to_string()]);

    let mut reopened = Workbench::new(snapshots);
    let state = reopened.open("resume").await?;
    assert_eq!(state.history.len(), 2);
    assert_eq!(state.paragraph("p4").unwrap().parent(), Some("merged-1"));

    let state = reopened.dispatch(Action::Unmerge("merged-1".into()))?;
    assert_eq!(state.paragraph("p3").unwrap().content, "deloitte");
    assert_eq!(state.paragraph("p4").unwrap().parent(), Some("p3"));

    let out = dir.path().join("export");
    export_document(reopened.state(), &out)?;
    assert!(out.join("document.json").exists());
    assert!(out.join("outline.txt").exists());
    Ok(())
}

//! Repair of parent-linked paragraph lists into a single rooted tree.
//!
//! OCR and AI output is never assumed clean: dangling parents, self-parenting,
//! several roots and cycles are all fixed here rather than reported.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::core::model::Paragraph;

pub const SYNTHETIC_ROOT_ID: &str = "synthetic-root";
pub const SYNTHETIC_ROOT_ROLE: &str = "documentRoot";

/// Produces a well-formed tree from an arbitrary paragraph list.
///
/// The result has exactly one root (parent `None`, level 0), every other node
/// has a parent that exists in the output, and each `level` equals the node's
/// distance from the root. Output order is the root followed by the remaining
/// paragraphs in input order. An empty input yields an empty output.
pub fn normalize(paragraphs: &[Paragraph]) -> Vec<Paragraph> {
    if paragraphs.is_empty() {
        return Vec::new();
    }

    let nodes = dedupe(paragraphs);
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, p)| (p.id.as_str(), idx))
        .collect();

    let candidates: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, p)| p.parent().is_none())
        .map(|(idx, _)| idx)
        .collect();

    // The first parentless paragraph wins; later ones hang off it.
    let (root, root_idx) = match candidates.as_slice() {
        [first, rest @ ..] => {
            if !rest.is_empty() {
                debug!(candidates = candidates.len(), root = %nodes[*first].id, "several root candidates");
            }
            let mut root = nodes[*first].clone();
            root.parent_id = None;
            (root, Some(*first))
        }
        [] => {
            debug!("no root candidate, synthesizing document root");
            (synthetic_root(&index), None)
        }
    };

    // Resolved parent per input node; the root candidate itself has none.
    let mut parents: Vec<Option<String>> = nodes
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            if Some(idx) == root_idx {
                return None;
            }
            let parent = match p.parent() {
                Some(parent) if parent != p.id && index.contains_key(parent) => parent,
                _ => root.id.as_str(),
            };
            Some(parent.to_string())
        })
        .collect();

    let mut children: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, parent) in parents.iter().enumerate() {
        if let Some(parent) = parent {
            children.entry(parent.clone()).or_default().push(idx);
        }
    }

    let mut levels: Vec<Option<usize>> = vec![None; nodes.len()];
    if let Some(idx) = root_idx {
        levels[idx] = Some(0);
    }
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(root.id.clone());
    assign_levels(&root.id, 0, &nodes, &children, &mut visited, &mut levels);

    // Whatever the traversal missed sits on a cycle or hangs off one; each
    // such node becomes a direct child of the root.
    for idx in 0..nodes.len() {
        if levels[idx].is_some() {
            continue;
        }
        warn!(paragraph_id = %nodes[idx].id, "unreachable paragraph reattached to root");
        parents[idx] = Some(root.id.clone());
        levels[idx] = Some(1);
    }

    let mut normalized = Vec::with_capacity(nodes.len() + usize::from(root_idx.is_none()));
    let mut root = root;
    root.level = 0;
    normalized.push(root);
    for (idx, node) in nodes.into_iter().enumerate() {
        if Some(idx) == root_idx {
            continue;
        }
        let mut node = node;
        node.parent_id = parents[idx].take();
        node.level = levels[idx].unwrap_or(1);
        normalized.push(node);
    }
    normalized
}

/// Drops repeated ids, keeping the first occurrence.
fn dedupe(paragraphs: &[Paragraph]) -> Vec<Paragraph> {
    let mut seen = HashSet::new();
    paragraphs
        .iter()
        .filter(|p| {
            let fresh = seen.insert(p.id.as_str());
            if !fresh {
                warn!(paragraph_id = %p.id, "duplicate paragraph id dropped");
            }
            fresh
        })
        .cloned()
        .collect()
}

fn synthetic_root(index: &HashMap<&str, usize>) -> Paragraph {
    let mut id = SYNTHETIC_ROOT_ID.to_string();
    let mut suffix = 1;
    while index.contains_key(id.as_str()) {
        id = format!("{SYNTHETIC_ROOT_ID}-{suffix}");
        suffix += 1;
    }
    Paragraph::new(id, None, "DOCUMENT").with_role(SYNTHETIC_ROOT_ROLE)
}

fn assign_levels(
    start: &str,
    start_level: usize,
    nodes: &[Paragraph],
    children: &HashMap<String, Vec<usize>>,
    visited: &mut HashSet<String>,
    levels: &mut [Option<usize>],
) {
    let mut stack: Vec<(&str, usize)> = vec![(start, start_level)];
    while let Some((id, level)) = stack.pop() {
        let Some(kids) = children.get(id) else {
            continue;
        };
        for &child in kids.iter().rev() {
            let child_id = nodes[child].id.as_str();
            if !visited.insert(child_id.to_string()) {
                continue;
            }
            levels[child] = Some(level + 1);
            stack.push((child_id, level + 1));
        }
    }
}

/// The single paragraph without a parent, if the list has exactly one.
pub fn root_of(paragraphs: &[Paragraph]) -> Option<&Paragraph> {
    let mut roots = paragraphs.iter().filter(|p| p.parent().is_none());
    match (roots.next(), roots.next()) {
        (Some(root), None) => Some(root),
        _ => None,
    }
}

/// Number of parent hops from `id` to a root, or `None` when the chain is
/// broken or loops.
pub fn depth_of(paragraphs: &[Paragraph], id: &str) -> Option<usize> {
    let by_id: HashMap<&str, &Paragraph> = paragraphs.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut current = *by_id.get(id)?;
    let mut hops = 0;
    while let Some(parent) = current.parent() {
        if hops >= paragraphs.len() {
            return None;
        }
        current = *by_id.get(parent)?;
        hops += 1;
    }
    Some(hops)
}

/// True when the list has one root, unique ids, and every level matches depth.
pub fn is_well_formed(paragraphs: &[Paragraph]) -> bool {
    let mut ids = HashSet::new();
    if !paragraphs.iter().all(|p| ids.insert(p.id.as_str())) {
        return false;
    }
    root_of(paragraphs).is_some()
        && paragraphs
            .iter()
            .all(|p| depth_of(paragraphs, &p.id) == Some(p.level))
}

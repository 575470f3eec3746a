use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::geometry::BoundingBox;

/// Free-form structured metadata attached to a paragraph.
pub type Enrichment = BTreeMap<String, serde_json::Value>;

/// A node in the document tree.
///
/// `level` is derived from tree depth and is recomputed by
/// [`crate::tree::normalize`] after every structural change; values read from
/// input are never trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub id: String,
    #[serde(default, alias = "parent_id")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub level: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
    #[serde(default, alias = "bounding_box")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default, alias = "page_number")]
    pub page_number: Option<u32>,
    #[serde(default, alias = "is_merged", skip_serializing_if = "is_false")]
    pub is_merged: bool,
    #[serde(default, alias = "source_ids", skip_serializing_if = "Vec::is_empty")]
    pub source_ids: Vec<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Paragraph {
    pub fn new(id: impl Into<String>, parent_id: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            content: content.into(),
            role: None,
            level: 0,
            enrichment: None,
            bounding_box: None,
            page_number: None,
            is_merged: false,
            source_ids: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_region(mut self, bounding_box: BoundingBox, page_number: u32) -> Self {
        self.bounding_box = Some(bounding_box);
        self.page_number = Some(page_number);
        self
    }

    /// Parent reference with empty strings treated as absent.
    pub fn parent(&self) -> Option<&str> {
        self.parent_id.as_deref().filter(|id| !id.is_empty())
    }

    /// A paragraph that can be reversed by unmerge.
    pub fn is_unmergeable(&self) -> bool {
        self.is_merged && !self.source_ids.is_empty()
    }
}

/// Size of one rendered page, in the unit the OCR provider reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDimension {
    #[serde(alias = "page_number")]
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

pub(crate) fn default_unit() -> String {
    "inch".to_string()
}

/// One text block as returned by layout extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrBlock {
    pub text: String,
    #[serde(alias = "bounding_box")]
    pub bounding_box: BoundingBox,
    #[serde(alias = "page_number")]
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutExtraction {
    pub blocks: Vec<OcrBlock>,
    #[serde(default, alias = "page_dimensions")]
    pub page_dimensions: Vec<PageDimension>,
}

/// Content and metadata produced for a merge by an external assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub content: String,
    #[serde(default)]
    pub enrichment: Enrichment,
}

impl MergeResult {
    /// Role proposed by the assistant, carried in `enrichment.role`.
    pub fn role(&self) -> Option<&str> {
        self.enrichment.get("role").and_then(|value| value.as_str())
    }
}

/// Per-paragraph enrichment returned by the enrichment collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentUpdate {
    pub id: String,
    pub enrichment: Enrichment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_snake_case_backend_payload() {
        let raw = r#"{
            "id": "p1",
            "parent_id": "root",
            "content": "Hello",
            "role": "paragraph",
            "level": 7,
            "bounding_box": {"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0},
            "page_number": 2
        }"#;
        let paragraph: Paragraph = serde_json::from_str(raw).unwrap();
        assert_eq!(paragraph.parent(), Some("root"));
        assert_eq!(paragraph.page_number, Some(2));
        assert_eq!(paragraph.bounding_box, Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0)));
        assert!(!paragraph.is_merged);
    }

    #[test]
    fn omits_merge_fields_for_original_paragraphs() {
        let json = serde_json::to_string(&Paragraph::new("p1", None, "x")).unwrap();
        assert!(!json.contains("isMerged"));
        assert!(!json.contains("sourceIds"));
        assert!(json.contains("\"parentId\":null"));
    }

    #[test]
    fn empty_parent_is_treated_as_absent() {
        let paragraph = Paragraph::new("p1", Some(""), "x");
        assert_eq!(paragraph.parent(), None);
    }

    #[test]
    fn merge_result_role_comes_from_enrichment() {
        let mut enrichment = Enrichment::new();
        enrichment.insert("role".into(), serde_json::json!("sectionHeading"));
        let result = MergeResult {
            content: "x".into(),
            enrichment,
        };
        assert_eq!(result.role(), Some("sectionHeading"));
    }
}

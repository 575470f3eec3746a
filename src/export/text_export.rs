use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::Paragraph;
use crate::export::Exporter;
use crate::state::DocumentState;

/// Writes the tree as an indented outline to `outline.txt`, plus the plain
/// text of each page to `page_NNN.txt`.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn format_paragraph(paragraph: &Paragraph) -> String {
        let indent = "  ".repeat(paragraph.level);
        let role = paragraph
            .role
            .as_deref()
            .map(|role| format!("[{role}] "))
            .unwrap_or_default();
        let mut line = format!("{indent}{role}{}", paragraph.content.trim());
        if paragraph.is_unmergeable() {
            line.push_str(&format!("  (merged from {})", paragraph.source_ids.join(", ")));
        }
        line
    }

    pub fn outline(paragraphs: &[Paragraph]) -> String {
        let mut outline = String::new();
        for paragraph in paragraphs {
            outline.push_str(&Self::format_paragraph(paragraph));
            outline.push('\n');
        }
        outline
    }
}

impl Exporter for TextExporter {
    fn export(&self, state: &DocumentState) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        fs::write(self.out_dir.join("outline.txt"), Self::outline(&state.paragraphs))?;

        let mut pages: BTreeMap<u32, String> = BTreeMap::new();
        for paragraph in &state.paragraphs {
            let Some(page) = paragraph.page_number else {
                continue;
            };
            let text = pages.entry(page).or_default();
            text.push_str(paragraph.content.trim());
            text.push_str("\n\n");
        }
        for (page, text) in pages {
            fs::write(self.out_dir.join(format!("page_{page:03}.txt")), text)?;
        }
        Ok(())
    }
}

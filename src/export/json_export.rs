use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::export::Exporter;
use crate::persist::PersistedDocument;
use crate::state::DocumentState;

/// Writes the persisted form of the document to `document.json`.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, state: &DocumentState) -> Result<()> {
        let document = PersistedDocument::from_state(state).context("no document loaded to export")?;
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join("document.json");
        let data = serde_json::to_string_pretty(&document)?;
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

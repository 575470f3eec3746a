pub mod json_export;
pub mod text_export;

use std::path::Path;

use anyhow::Result;

use crate::state::DocumentState;

pub use json_export::JsonExporter;
pub use text_export::TextExporter;

pub trait Exporter {
    fn export(&self, state: &DocumentState) -> Result<()>;
}

/// Writes every export format into `output`.
pub fn export_document(state: &DocumentState, output: &Path) -> Result<()> {
    JsonExporter::new(output.to_path_buf()).export(state)?;
    TextExporter::new(output.to_path_buf()).export(state)?;
    Ok(())
}

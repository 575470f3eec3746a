use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{validate_id, PersistError, PersistedDocument, SnapshotStore};

/// One pretty-printed JSON file per document under a directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, document_id: &str) -> Result<PathBuf, PersistError> {
        validate_id(document_id)?;
        Ok(self.dir.join(format!("{document_id}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, document: &PersistedDocument) -> Result<(), PersistError> {
        let path = self.path_for(&document.document_id)?;
        fs::create_dir_all(&self.dir).await.map_err(io_error(&self.dir))?;

        let json = serde_json::to_string_pretty(document)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).await.map_err(io_error(&staging))?;
        fs::rename(&staging, &path).await.map_err(io_error(&path))?;

        info!(doc_id = %document.document_id, path = %path.display(), "snapshot saved");
        Ok(())
    }

    async fn load(&self, document_id: &str) -> Result<PersistedDocument, PersistError> {
        let path = self.path_for(document_id)?;
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(PersistError::NotFound(document_id.to_string()));
            }
            Err(err) => return Err(io_error(&path)(err)),
        };
        let document: PersistedDocument = serde_json::from_str(&raw)?;
        debug!(doc_id = %document_id, paragraphs = document.paragraphs.len(), "snapshot loaded");
        Ok(document)
    }

    async fn list(&self) -> Result<Vec<String>, PersistError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&self.dir)(err)),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&self.dir))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Paragraph;
    use pretty_assertions::assert_eq;

    fn document(id: &str) -> PersistedDocument {
        PersistedDocument {
            document_id: id.to_string(),
            filename: format!("{id}.pdf"),
            paragraphs: vec![Paragraph::new("r", None, "Resume")],
            page_dimensions: Vec::new(),
            history: Vec::new(),
            initial_paragraphs: None,
            suggestions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn saves_and_lists_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshots"));
        store.save(&document("b")).await.unwrap();
        store.save(&document("a")).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.load("a").await.unwrap(), document("a"));
        let raw = std::fs::read_to_string(dir.path().join("snapshots/a.json")).unwrap();
        assert!(raw.contains("\"documentId\": \"a\""));
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, PersistError::NotFound(id) if id == "nope"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_reports_json_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let store = FileSnapshotStore::new(dir.path());
        assert!(matches!(store.load("bad").await, Err(PersistError::Json(_))));
    }
}

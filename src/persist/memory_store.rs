use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{validate_id, PersistError, PersistedDocument, SnapshotStore};

/// Keeps serialized snapshots in memory. Documents are stored as JSON text
/// so a load exercises the same decoding as the file store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    blobs: Mutex<BTreeMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, document: &PersistedDocument) -> Result<(), PersistError> {
        validate_id(&document.document_id)?;
        let json = serde_json::to_string(document)?;
        self.blobs.lock().await.insert(document.document_id.clone(), json);
        Ok(())
    }

    async fn load(&self, document_id: &str) -> Result<PersistedDocument, PersistError> {
        let blobs = self.blobs.lock().await;
        let json = blobs
            .get(document_id)
            .ok_or_else(|| PersistError::NotFound(document_id.to_string()))?;
        Ok(serde_json::from_str(json)?)
    }

    async fn list(&self) -> Result<Vec<String>, PersistError> {
        Ok(self.blobs.lock().await.keys().cloned().collect())
    }
}

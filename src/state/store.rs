use tracing::{debug, warn};

use crate::edit::{EditError, IdSource, RandomIds};

use super::{reduce, Action, DocumentState};

/// Owns the current snapshot and applies actions to it one at a time.
pub struct DocumentStore {
    state: DocumentState,
    ids: Box<dyn IdSource>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("revision", &self.state.revision)
            .field("paragraphs", &self.state.paragraphs.len())
            .finish()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::with_ids(RandomIds)
    }

    pub fn with_ids(ids: impl IdSource + 'static) -> Self {
        Self {
            state: DocumentState::default(),
            ids: Box::new(ids),
        }
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    /// Applies `action` and returns the new snapshot.
    ///
    /// A rejected action leaves the paragraphs untouched; its message is
    /// surfaced through the snapshot's `error` field and returned.
    pub fn dispatch(&mut self, action: Action) -> Result<&DocumentState, EditError> {
        let kind = action.kind();
        match reduce(&self.state, action, self.ids.as_mut()) {
            Ok(next) => {
                if next.revision != self.state.revision {
                    debug!(action = kind, revision = next.revision, "state advanced");
                }
                self.state = next;
                Ok(&self.state)
            }
            Err(err) => {
                warn!(action = kind, error = %err, "action rejected");
                let mut next = self.state.clone();
                next.error = Some(err.to_string());
                next.loading = false;
                next.loading_message.clear();
                next.revision += 1;
                self.state = next;
                Err(err)
            }
        }
    }
}

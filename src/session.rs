//! Asynchronous orchestration around [`DocumentStore`].
//!
//! Every external call is bracketed by state transitions: a loading action
//! before the call, then exactly one success or failure action after it. The
//! store itself stays synchronous.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::agents::MergeAssistant;
use crate::config::PollConfig;
use crate::core::model::{MergeResult, Paragraph};
use crate::edit::EditError;
use crate::persist::{PersistedDocument, SnapshotStore};
use crate::pipeline::{poll_job, process_document, CancelSignal, Collaborators, PollError, StatusSource};
use crate::state::{Action, DocumentInfo, DocumentState, DocumentStore, MergeMode};

pub const DEFAULT_PROMPT: &str = "Default Prompt";
const GENERATING_SUGGESTION: &str = "Generating AI suggestion...";
const LOADING_DOCUMENT: &str = "Loading document...";

/// An assisted merge request detached from the store, so the caller can run
/// it while other actions are dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRequest {
    pub ticket: u64,
    pub paragraphs: Vec<Paragraph>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeReply {
    pub ticket: u64,
    pub outcome: Result<MergeResult, String>,
}

impl MergeRequest {
    pub async fn run(self, assistant: &dyn MergeAssistant) -> MergeReply {
        let outcome = assistant
            .merge_paragraphs(&self.paragraphs, self.instructions.as_deref())
            .await
            .map_err(|err| err.to_string());
        MergeReply {
            ticket: self.ticket,
            outcome,
        }
    }
}

pub struct Workbench {
    store: DocumentStore,
    snapshots: Arc<dyn SnapshotStore>,
}

impl Workbench {
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self::with_store(DocumentStore::new(), snapshots)
    }

    pub fn with_store(store: DocumentStore, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { store, snapshots }
    }

    pub fn state(&self) -> &DocumentState {
        self.store.state()
    }

    pub fn dispatch(&mut self, action: Action) -> Result<&DocumentState, EditError> {
        self.store.dispatch(action)
    }

    /// Loads a saved document. The stored tree is normalized on the way in.
    pub async fn open(&mut self, document_id: &str) -> Result<&DocumentState> {
        self.store.dispatch(Action::SetLoading(LOADING_DOCUMENT.to_string()))?;
        match self.snapshots.load(document_id).await {
            Ok(persisted) => {
                info!(doc_id = %document_id, paragraphs = persisted.paragraphs.len(), "document opened");
                self.store.dispatch(persisted.into_action())?;
                Ok(self.store.state())
            }
            Err(err) => {
                self.store.dispatch(Action::Fail(err.to_string()))?;
                Err(err.into())
            }
        }
    }

    pub async fn save(&mut self) -> Result<()> {
        let Some(document) = PersistedDocument::from_state(self.store.state()) else {
            warn!("save requested but no document is loaded");
            self.store.dispatch(Action::Fail("No document loaded to save.".to_string()))?;
            return Err(anyhow!("no document loaded to save"));
        };
        self.store.dispatch(Action::SaveStarted)?;
        match self.snapshots.save(&document).await {
            Ok(()) => {
                self.store.dispatch(Action::SaveSucceeded)?;
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::SaveFailed(err.to_string()))?;
                Err(err.into())
            }
        }
    }

    /// Runs the local processing chain over `file` and loads the result.
    pub async fn process(
        &mut self,
        document: DocumentInfo,
        file: &Path,
        collaborators: &Collaborators<'_>,
    ) -> Result<&DocumentState> {
        self.store.dispatch(Action::StartProcessing(document.clone()))?;
        let store = &mut self.store;
        let processed = process_document(file, collaborators, |stage| {
            let _ = store.dispatch(Action::SetLoading(stage.message().to_string()));
        })
        .await;
        match processed {
            Ok(processed) => {
                self.store.dispatch(processed.into_action(document))?;
                Ok(self.store.state())
            }
            Err(err) => {
                self.store.dispatch(Action::Fail(format!("{err:#}")))?;
                Err(err)
            }
        }
    }

    /// Waits for a server-side job and loads the document it produced.
    pub async fn wait_for_job(
        &mut self,
        source: &dyn StatusSource,
        document: DocumentInfo,
        config: &PollConfig,
        cancel: CancelSignal,
    ) -> Result<&DocumentState, PollError> {
        let _ = self.store.dispatch(Action::StartProcessing(document.clone()));
        let store = &mut self.store;
        let polled = poll_job(source, &document.id, config, cancel, |status| {
            let action = if status.is_terminal() {
                Action::ClearLoading
            } else {
                Action::SetLoading(status.message().to_string())
            };
            let _ = store.dispatch(action);
        })
        .await;
        match polled {
            Ok(mut persisted) => {
                if persisted.document_id.is_empty() {
                    persisted.document_id = document.id;
                }
                if persisted.filename.is_empty() {
                    persisted.filename = document.filename;
                }
                let _ = self.store.dispatch(persisted.into_action());
                Ok(self.store.state())
            }
            Err(err) => {
                let _ = self.store.dispatch(Action::Fail(err.to_string()));
                Err(err)
            }
        }
    }

    /// Opens a merge review over the current selection.
    ///
    /// Returns the request to send to the assistant, or `None` when a custom
    /// merge still waits for the user's instructions.
    pub fn begin_ai_merge(
        &mut self,
        mode: MergeMode,
        instructions: Option<String>,
    ) -> Result<Option<MergeRequest>, EditError> {
        let waiting_for_instructions = mode == MergeMode::AiCustom && instructions.is_none();
        let state = self.store.dispatch(Action::OpenMergeReview { mode, instructions })?;
        let Some(review) = state.review.as_ref() else {
            return Ok(None);
        };
        let request = MergeRequest {
            ticket: review.ticket,
            paragraphs: review.candidates.clone(),
            instructions: review.instructions.clone(),
        };
        if waiting_for_instructions {
            return Ok(None);
        }
        self.store.dispatch(Action::SetLoading(GENERATING_SUGGESTION.to_string()))?;
        Ok(Some(request))
    }

    /// Delivers an assistant reply. Replies for a review that has since been
    /// closed or replaced are dropped.
    pub fn finish_ai_merge(&mut self, reply: MergeReply) -> Result<&DocumentState, EditError> {
        let action = match reply.outcome {
            Ok(result) => Action::MergeSuggestionReady {
                ticket: reply.ticket,
                result,
            },
            Err(message) => Action::MergeSuggestionFailed {
                ticket: reply.ticket,
                message: format!("AI merge failed: {message}"),
            },
        };
        self.store.dispatch(action)
    }

    pub async fn request_ai_merge(
        &mut self,
        assistant: &dyn MergeAssistant,
        mode: MergeMode,
        instructions: Option<String>,
    ) -> Result<&DocumentState, EditError> {
        match self.begin_ai_merge(mode, instructions)? {
            Some(request) => {
                let reply = request.run(assistant).await;
                self.finish_ai_merge(reply)
            }
            None => Ok(self.store.state()),
        }
    }

    /// Commits the reviewed suggestion. `content` replaces the suggested text
    /// when the user edited it.
    pub fn confirm_ai_merge(&mut self, content: Option<String>) -> Result<&DocumentState, EditError> {
        let review = self.store.state().review.as_ref().ok_or(EditError::NoPendingReview)?;
        let mut result = review.suggestion.clone().ok_or(EditError::NoPendingReview)?;
        let custom_instructions = review.instructions.clone();
        if let Some(content) = content {
            result.content = content;
        }
        self.store.dispatch(Action::ConfirmMerge {
            result,
            prompt: DEFAULT_PROMPT.to_string(),
            custom_instructions,
        })
    }
}

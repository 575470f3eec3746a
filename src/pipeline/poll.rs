use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::agents::AgentError;
use crate::config::PollConfig;
use crate::persist::PersistedDocument;

/// Lifecycle of a server-side processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    OcrInProgress,
    OcrCompleted,
    CorrectionInProgress,
    CorrectionCompleted,
    FlatteningInProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Progress text shown while the job runs.
    pub fn message(self) -> &'static str {
        match self {
            JobStatus::OcrInProgress => "Performing OCR on document...",
            JobStatus::OcrCompleted | JobStatus::CorrectionInProgress => "Correcting document hierarchy...",
            JobStatus::CorrectionCompleted | JobStatus::FlatteningInProgress => "Preparing data for display...",
            JobStatus::Completed => "Processing complete!",
            JobStatus::Failed => "Processing failed.",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: JobStatus,
    #[serde(default, alias = "final_data")]
    pub final_data: Option<PersistedDocument>,
    #[serde(default, alias = "error_message")]
    pub error_message: Option<String>,
}

impl StatusReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            final_data: None,
            error_message: None,
        }
    }
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn job_status(&self, document_id: &str) -> Result<StatusReport, AgentError>;
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Processing timed out. Please try uploading again.")]
    Timeout { attempts: u32 },

    #[error("{0}")]
    JobFailed(String),

    #[error("status polling was cancelled")]
    Cancelled,

    #[error("processing completed without returning a document")]
    MissingResult,

    #[error("failed to get document status: {0}")]
    Agent(#[from] AgentError),
}

const UNKNOWN_FAILURE: &str = "An unknown error occurred during processing.";

/// Fires the paired [`CancelSignal`].
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        // No receivers left means nobody is polling.
        let _ = self.0.send(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the handle fires. Pending forever if the handle was
    /// dropped without firing.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

/// Polls `source` until the job for `document_id` finishes.
///
/// The first request goes out immediately; later ones wait `config.interval`.
/// After `config.max_attempts` unfinished answers the job is abandoned with
/// [`PollError::Timeout`]. A failed status request ends polling at once.
pub async fn poll_job(
    source: &dyn StatusSource,
    document_id: &str,
    config: &PollConfig,
    mut cancel: CancelSignal,
    mut progress: impl FnMut(JobStatus) + Send,
) -> Result<PersistedDocument, PollError> {
    info!(doc_id = %document_id, max_attempts = config.max_attempts, "polling job status");
    for attempt in 1..=config.max_attempts {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }
        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            report = source.job_status(document_id) => report?,
        };
        debug!(doc_id = %document_id, attempt, status = ?report.status, "status received");
        progress(report.status);

        match report.status {
            JobStatus::Completed => {
                info!(doc_id = %document_id, attempt, "job completed");
                return report.final_data.ok_or(PollError::MissingResult);
            }
            JobStatus::Failed => {
                let message = report.error_message.unwrap_or_else(|| UNKNOWN_FAILURE.to_string());
                warn!(doc_id = %document_id, error = %message, "job failed");
                return Err(PollError::JobFailed(message));
            }
            _ => {}
        }

        if attempt < config.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(config.interval) => {}
            }
        }
    }
    warn!(doc_id = %document_id, attempts = config.max_attempts, "polling timed out");
    Err(PollError::Timeout {
        attempts: config.max_attempts,
    })
}

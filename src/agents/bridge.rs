use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::core::model::{EnrichmentUpdate, LayoutExtraction, MergeResult, OcrBlock, Paragraph};
use crate::pipeline::poll::{StatusReport, StatusSource};

use super::{
    AgentError, CoherenceRefiner, Enricher, HierarchyStructurer, LayoutExtractor, MergeAssistant, MergeSuggester,
};

/// Runs an external program once per collaborator call.
///
/// The operation name is passed as the last argument and the request as JSON
/// on stdin; the program answers with JSON on stdout and signals failure with
/// a non-zero exit code and a message on stderr.
#[derive(Debug, Clone)]
pub struct CommandBridge {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandBridge {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// `None` when the config names no program.
    pub fn from_config(config: &BridgeConfig) -> Option<Self> {
        let program = config.program.as_ref()?;
        Some(Self::new(program).with_args(config.args.iter().map(OsString::from)))
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp, AgentError>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request).map_err(|source| AgentError::Malformed {
            operation: operation.to_string(),
            source,
        })?;
        debug!(operation, bytes = payload.len(), program = %self.program.display(), "calling collaborator");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(operation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AgentError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // Feed stdin while draining stdout/stderr so neither side blocks on a
        // full pipe.
        let stdin = child.stdin.take();
        let (fed, output) = tokio::join!(feed(stdin, &payload), child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(operation, status = %output.status, "collaborator failed");
            return Err(AgentError::Failed {
                operation: operation.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        fed?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(AgentError::EmptyResponse(operation.to_string()));
        }
        serde_json::from_str(&stdout).map_err(|source| AgentError::Malformed {
            operation: operation.to_string(),
            source,
        })
    }
}

/// Writes the request and closes stdin. A program that exits without reading
/// its input is judged by its exit status, not by the broken pipe.
async fn feed(stdin: Option<ChildStdin>, payload: &[u8]) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    let written = match stdin.write_all(payload).await {
        Ok(()) => stdin.shutdown().await,
        Err(err) => Err(err),
    };
    match written {
        Err(err) if err.kind() == ErrorKind::BrokenPipe => {
            debug!("collaborator closed stdin early");
            Ok(())
        }
        other => other,
    }
}

#[async_trait]
impl LayoutExtractor for CommandBridge {
    async fn extract_layout(&self, file: &Path) -> Result<LayoutExtraction, AgentError> {
        self.call("extract-layout", &json!({ "file": file.to_string_lossy() })).await
    }
}

#[async_trait]
impl HierarchyStructurer for CommandBridge {
    async fn structure_hierarchy(&self, blocks: &[OcrBlock]) -> Result<Vec<Paragraph>, AgentError> {
        self.call("structure-hierarchy", &json!({ "blocks": blocks })).await
    }
}

#[async_trait]
impl CoherenceRefiner for CommandBridge {
    async fn refine_coherence(&self, paragraphs: &[Paragraph]) -> Result<Vec<Paragraph>, AgentError> {
        self.call("refine-coherence", &json!({ "paragraphs": paragraphs })).await
    }
}

#[async_trait]
impl Enricher for CommandBridge {
    async fn enrich(&self, paragraphs: &[Paragraph]) -> Result<Vec<EnrichmentUpdate>, AgentError> {
        self.call("enrich", &json!({ "paragraphs": paragraphs })).await
    }
}

#[async_trait]
impl MergeSuggester for CommandBridge {
    async fn suggest_merges(&self, paragraphs: &[Paragraph]) -> Result<Vec<Vec<String>>, AgentError> {
        self.call("suggest-merges", &json!({ "paragraphs": paragraphs })).await
    }
}

#[async_trait]
impl MergeAssistant for CommandBridge {
    async fn merge_paragraphs(
        &self,
        paragraphs: &[Paragraph],
        instructions: Option<&str>,
    ) -> Result<MergeResult, AgentError> {
        let request = json!({ "paragraphs": paragraphs, "instructions": instructions });
        self.call("merge-paragraphs", &request).await
    }
}

#[async_trait]
impl StatusSource for CommandBridge {
    async fn job_status(&self, document_id: &str) -> Result<StatusReport, AgentError> {
        self.call("job-status", &json!({ "documentId": document_id })).await
    }
}

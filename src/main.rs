use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use docstruct_workbench::agents::{CommandBridge, FlatStructurer, HierarchyStructurer, MergeSuggester};
use docstruct_workbench::config::{BridgeConfig, PollConfig, WorkbenchConfig, DEFAULT_SNAPSHOT_DIR};
use docstruct_workbench::core::model::Paragraph;
use docstruct_workbench::export::{export_document, text_export::TextExporter};
use docstruct_workbench::persist::{FileSnapshotStore, PersistedDocument, SnapshotStore};
use docstruct_workbench::pipeline::{cancel_pair, Collaborators};
use docstruct_workbench::state::{Action, DocumentInfo, MergeMode};
use docstruct_workbench::tree::normalize;
use docstruct_workbench::Workbench;

#[derive(Parser, Debug)]
#[command(name = "docstruct-workbench")]
#[command(version, about = "Review and correct the paragraph hierarchy of processed documents", long_about = None)]
struct Cli {
    /// Directory holding saved document snapshots
    #[arg(long, global = true, env = "DOCSTRUCT_SNAPSHOT_DIR", default_value = DEFAULT_SNAPSHOT_DIR)]
    snapshot_dir: PathBuf,

    /// Collaborator program answering extraction, structuring and merge calls
    #[arg(long, global = true, env = "DOCSTRUCT_AGENT")]
    agent: Option<PathBuf>,

    /// Extra argument passed to the collaborator program (repeatable)
    #[arg(long = "agent-arg", global = true, allow_hyphen_values = true)]
    agent_args: Vec<String>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a paragraph list as a normalized tree (JSON)
    Normalize {
        /// JSON file with a paragraph array or a saved document
        input: PathBuf,
    },

    /// Save a paragraph list or document JSON as a snapshot
    Import {
        input: PathBuf,

        /// Document id (default: the id in the file, or the file stem)
        #[arg(long)]
        id: Option<String>,
    },

    /// Print the outline and merge suggestions of a document
    Show { id: String },

    /// Recompute merge suggestions
    Suggest {
        id: String,

        /// Ask the collaborator instead of the local heuristic
        #[arg(long)]
        remote: bool,
    },

    /// Merge paragraphs by joining their text
    Merge {
        id: String,
        #[arg(required = true, num_args = 2..)]
        paragraphs: Vec<String>,
    },

    /// Restore the paragraphs a merged paragraph was built from
    Unmerge { id: String, paragraph: String },

    /// Replace the text of one paragraph
    Edit {
        id: String,
        paragraph: String,
        content: String,
    },

    /// Merge paragraphs with text written by the collaborator
    AiMerge {
        id: String,
        #[arg(required = true, num_args = 2..)]
        paragraphs: Vec<String>,

        /// Instructions for the merge
        #[arg(long)]
        instructions: Option<String>,

        /// Commit this text instead of the suggested one
        #[arg(long)]
        content: Option<String>,
    },

    /// Extract, structure and save a document from a file
    Process {
        file: PathBuf,

        #[arg(long)]
        id: Option<String>,

        #[arg(long, value_enum, default_value_t = Structuring::Agent)]
        structuring: Structuring,

        /// Run the coherence and enrichment passes
        #[arg(long)]
        refine: bool,
    },

    /// Wait for a server-side processing job and save its result
    Wait {
        id: String,

        #[arg(long, default_value = "")]
        filename: String,

        /// Seconds between status requests
        #[arg(long, default_value_t = 3)]
        interval: u64,

        #[arg(long, default_value_t = 100)]
        max_attempts: u32,
    },

    /// Write document.json, outline.txt and per-page text
    Export {
        id: String,

        /// Output directory (default: ./<id>_export)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Structuring {
    Agent,
    Flat,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportInput {
    Document(PersistedDocument),
    Paragraphs(Vec<Paragraph>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = WorkbenchConfig::new(cli.snapshot_dir.clone()).with_bridge(BridgeConfig {
        program: cli.agent.clone(),
        args: cli.agent_args.clone(),
    });

    match cli.command {
        Commands::Normalize { input } => normalize_file(input),
        Commands::Import { input, id } => import(&config, input, id).await,
        Commands::Show { id } => show(&config, &id).await,
        Commands::Suggest { id, remote } => suggest(&config, &id, remote).await,
        Commands::Merge { id, paragraphs } => {
            let mut bench = open(&config, &id).await?;
            let before = bench.state().revision;
            bench.dispatch(Action::ConcatMerge(paragraphs))?;
            if bench.state().revision == before {
                bail!("at least two of the given paragraphs must exist to merge");
            }
            commit(&mut bench).await
        }
        Commands::Unmerge { id, paragraph } => {
            let mut bench = open(&config, &id).await?;
            bench.dispatch(Action::Unmerge(paragraph))?;
            commit(&mut bench).await
        }
        Commands::Edit { id, paragraph, content } => {
            let mut bench = open(&config, &id).await?;
            bench.dispatch(Action::EditContent {
                id: paragraph,
                content,
            })?;
            commit(&mut bench).await
        }
        Commands::AiMerge {
            id,
            paragraphs,
            instructions,
            content,
        } => ai_merge(&config, &id, paragraphs, instructions, content).await,
        Commands::Process {
            file,
            id,
            structuring,
            refine,
        } => process(&config, file, id, structuring, refine).await,
        Commands::Wait {
            id,
            filename,
            interval,
            max_attempts,
        } => {
            let poll = PollConfig::default()
                .with_interval(Duration::from_secs(interval))
                .with_max_attempts(max_attempts);
            wait(&config.with_poll(poll), &id, filename).await
        }
        Commands::Export { id, output } => {
            let bench = open(&config, &id).await?;
            let output_dir = output.unwrap_or_else(|| PathBuf::from(format!("{id}_export")));
            export_document(bench.state(), &output_dir)
                .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;
            println!("[✓] Exported {id} to {}", output_dir.display());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn store(config: &WorkbenchConfig) -> Arc<dyn SnapshotStore> {
    Arc::new(FileSnapshotStore::new(config.snapshot_dir.clone()))
}

fn bridge(config: &WorkbenchConfig) -> Result<CommandBridge> {
    CommandBridge::from_config(&config.bridge)
        .context("no collaborator configured; pass --agent or set DOCSTRUCT_AGENT")
}

async fn open(config: &WorkbenchConfig, id: &str) -> Result<Workbench> {
    let mut bench = Workbench::new(store(config));
    bench
        .open(id)
        .await
        .with_context(|| format!("Failed to open document: {id}"))?;
    Ok(bench)
}

async fn commit(bench: &mut Workbench) -> Result<()> {
    bench.save().await?;
    print!("{}", TextExporter::outline(&bench.state().paragraphs));
    Ok(())
}

fn read_input(input: &Path) -> Result<ImportInput> {
    if !input.is_file() {
        bail!("Input file does not exist: {}", input.display());
    }
    let raw = std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is neither a paragraph list nor a document", input.display()))
}

fn normalize_file(input: PathBuf) -> Result<()> {
    let paragraphs = match read_input(&input)? {
        ImportInput::Document(document) => document.paragraphs,
        ImportInput::Paragraphs(paragraphs) => paragraphs,
    };
    println!("{}", serde_json::to_string_pretty(&normalize(&paragraphs))?);
    Ok(())
}

async fn import(config: &WorkbenchConfig, input: PathBuf, id: Option<String>) -> Result<()> {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let mut document = match read_input(&input)? {
        ImportInput::Document(document) => document,
        ImportInput::Paragraphs(paragraphs) => PersistedDocument {
            document_id: stem.clone(),
            filename: input.display().to_string(),
            paragraphs,
            page_dimensions: Vec::new(),
            history: Vec::new(),
            initial_paragraphs: None,
            suggestions: Vec::new(),
        },
    };
    if let Some(id) = id {
        document.document_id = id;
    }
    if document.document_id.is_empty() {
        document.document_id = stem;
    }

    let mut bench = Workbench::new(store(config));
    let mut state = bench.dispatch(document.into_action())?;
    if state.suggestions.is_empty() {
        let groups = docstruct_workbench::suggest::suggest_merges(&state.paragraphs);
        state = bench.dispatch(Action::SetSuggestions(groups))?;
    }
    println!(
        "[+] Imported {} paragraph(s), {} suggestion(s)",
        state.paragraphs.len(),
        state.suggestions.len()
    );
    bench.save().await?;
    println!("[✓] Saved as {}", bench.state().document_id().unwrap_or_default());
    Ok(())
}

async fn show(config: &WorkbenchConfig, id: &str) -> Result<()> {
    let bench = open(config, id).await?;
    let state = bench.state();
    if let Some(document) = &state.document {
        println!("{} ({})", document.id, document.filename);
    }
    println!(
        "{} paragraph(s), {} page(s), {} history entr(ies)\n",
        state.paragraphs.len(),
        state.page_dimensions.len(),
        state.history.len()
    );
    print!("{}", TextExporter::outline(&state.paragraphs));
    if !state.suggestions.is_empty() {
        println!("\nSuggested merges:");
        for (index, group) in state.suggestions.groups().iter().enumerate() {
            let slot = group
                .first()
                .and_then(|id| state.suggestions.color_slot(id))
                .unwrap_or_default();
            println!("  {} [color {slot}]: {}", docstruct_workbench::suggest::group_label(index), group.join(", "));
        }
    }
    Ok(())
}

async fn suggest(config: &WorkbenchConfig, id: &str, remote: bool) -> Result<()> {
    let mut bench = open(config, id).await?;
    let groups = if remote {
        bridge(config)?
            .suggest_merges(&bench.state().paragraphs)
            .await
            .context("merge suggestion failed")?
    } else {
        docstruct_workbench::suggest::suggest_merges(&bench.state().paragraphs)
    };
    let state = bench.dispatch(Action::SetSuggestions(groups))?;
    println!("[+] {} suggestion(s)", state.suggestions.len());
    bench.save().await
}

async fn ai_merge(
    config: &WorkbenchConfig,
    id: &str,
    paragraphs: Vec<String>,
    instructions: Option<String>,
    content: Option<String>,
) -> Result<()> {
    let assistant = bridge(config)?;
    let mut bench = open(config, id).await?;
    bench.dispatch(Action::Select(paragraphs.into_iter().collect()))?;
    let mode = if instructions.is_some() {
        MergeMode::AiCustom
    } else {
        MergeMode::AiDefault
    };
    let state = bench.request_ai_merge(&assistant, mode, instructions).await?;
    if let Some(error) = &state.error {
        bail!("{error}");
    }
    if let Some(suggestion) = state.review.as_ref().and_then(|review| review.suggestion.as_ref()) {
        println!("[*] Suggested: {}", suggestion.content);
    }
    bench.confirm_ai_merge(content)?;
    commit(&mut bench).await
}

async fn process(
    config: &WorkbenchConfig,
    file: PathBuf,
    id: Option<String>,
    structuring: Structuring,
    refine: bool,
) -> Result<()> {
    if !file.is_file() {
        bail!("Input file does not exist: {}", file.display());
    }
    let agent = bridge(config)?;
    let structurer: &dyn HierarchyStructurer = match structuring {
        Structuring::Agent => &agent,
        Structuring::Flat => &FlatStructurer,
    };
    let mut collaborators = Collaborators::new(&agent, structurer);
    if refine {
        collaborators = collaborators.with_refiner(&agent).with_enricher(&agent);
    }

    let id = id.unwrap_or_else(|| {
        file.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    });
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    println!("[*] Processing: {}", file.display());
    let mut bench = Workbench::new(store(config));
    bench
        .process(DocumentInfo::new(id, filename), &file, &collaborators)
        .await
        .with_context(|| format!("Failed to process: {}", file.display()))?;
    commit(&mut bench).await
}

async fn wait(config: &WorkbenchConfig, id: &str, filename: String) -> Result<()> {
    let agent = bridge(config)?;
    let mut bench = Workbench::new(store(config));
    let (cancel, signal) = cancel_pair();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = bench
        .wait_for_job(&agent, DocumentInfo::new(id, filename), &config.poll, signal)
        .await
        .map(|_| ());
    ctrl_c.abort();
    result.with_context(|| format!("Processing of {id} did not complete"))?;
    commit(&mut bench).await
}

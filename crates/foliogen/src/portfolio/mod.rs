use crate::prelude::*;
use std::path::Path;

use foliogen_core::portfolio::{FileSet, Mode};

pub mod prompt;
pub mod refine;
pub mod stream;
pub mod validate;

// Re-export public data functions
pub use refine::refine_data;
pub use stream::stream_refine_data;

#[derive(Debug, clap::Parser)]
#[command(name = "portfolio")]
#[command(about = "Portfolio generation and validation operations")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Build or refine a portfolio project with the model
    #[clap(name = "refine")]
    Refine(refine::RefineOptions),

    /// Streaming refinement emitting JSON progress events
    #[clap(name = "stream")]
    Stream(stream::StreamOptions),

    /// Check a project directory against the structural invariants
    #[clap(name = "validate")]
    Validate(validate::ValidateOptions),

    /// Print the composed system prompt for a mode
    #[clap(name = "prompt")]
    Prompt(prompt::PromptOptions),
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Refine(options) => refine::run(options, global).await,
        Commands::Stream(options) => stream::run(options, global).await,
        Commands::Validate(options) => validate::run(options, global).await,
        Commands::Prompt(options) => prompt::run(options, global).await,
    }
}

/// Load a project directory into a [`FileSet`], honoring ignore files.
///
/// Non-UTF-8 files are skipped; a missing directory is an empty snapshot
/// (a fresh build, not an error).
pub fn load_project_files(dir: &Path) -> Result<FileSet> {
    let mut files = FileSet::new();

    if !dir.exists() {
        return Ok(files);
    }

    for entry in ignore::WalkBuilder::new(dir).build() {
        let entry = entry.map_err(|e| eyre!("Failed to walk '{}': {}", dir.display(), e))?;

        if !entry.file_type().map_or(false, |t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let rel = path.strip_prefix(dir).unwrap_or(path);
        let key = rel.to_string_lossy().replace('\\', "/");

        match std::fs::read_to_string(path) {
            Ok(content) => {
                files.insert(key, content);
            }
            Err(_) => log::debug!("skipping non-text file {key}"),
        }
    }

    Ok(files)
}

/// Persist a merged snapshot to disk. This is the caller-side persistence
/// boundary: the orchestrator itself never touches storage.
pub fn write_project_files(dir: &Path, files: &FileSet) -> Result<()> {
    for (rel, content) in files {
        let path = dir.join(rel);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| eyre!("Failed to create '{}': {}", parent.display(), e))?;
        }

        std::fs::write(&path, content)
            .map_err(|e| eyre!("Failed to write '{}': {}", path.display(), e))?;
    }

    Ok(())
}

/// Read the optional resume/context JSON for a request.
pub fn load_context(path: Option<&Path>) -> Result<serde_json::Value> {
    match path {
        None => Ok(serde_json::json!({})),
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| eyre!("Failed to read context file '{}': {}", p.display(), e))?;
            serde_json::from_str(&text)
                .map_err(|e| eyre!("Context file '{}' is not valid JSON: {}", p.display(), e))
        }
    }
}

/// Read the `files` object out of an extracted model response.
///
/// Advice modes never carry files; a present-but-malformed `files` value is
/// an unexpected payload and reported as such rather than silently dropped.
pub(crate) fn response_files(extracted: &serde_json::Value, mode: Mode) -> Result<FileSet, String> {
    if !mode.produces_files() {
        return Ok(FileSet::new());
    }

    match extracted.get("files") {
        None => Ok(FileSet::new()),
        Some(serde_json::Value::Object(map)) => {
            let mut files = FileSet::new();
            for (path, content) in map {
                match content.as_str() {
                    Some(text) => {
                        files.insert(path.clone(), text.to_string());
                    }
                    None => return Err(format!("file '{path}' content is not a string")),
                }
            }
            Ok(files)
        }
        Some(_) => Err("'files' is not an object".to_string()),
    }
}

pub(crate) fn response_text(extracted: &serde_json::Value, key: &str) -> String {
    extracted
        .get(key)
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string()
}

/// The user-facing summary lives under a mode-specific key for advice modes.
pub(crate) fn response_summary(extracted: &serde_json::Value, mode: Mode) -> String {
    let summary = response_text(extracted, "summary");
    if summary.is_empty() && mode == Mode::Design {
        return response_text(extracted, "response");
    }
    summary
}

use std::sync::Arc;
use std::time::Instant;

use crate::model::ModelClient;
use crate::prelude::{eprintln, println, *};
use foliogen_core::portfolio::{
    compute_edits, extract_json, merge_files, source_files, system_prompt, ErrorCode, FileSet,
    GenerationRequest, GenerationResult, Mode, StreamEvent, ToolEvent, ToolStatus,
};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct StreamOptions {
    /// The refinement instruction
    pub instruction: String,

    /// Project directory holding the current files
    #[arg(long, default_value = ".")]
    pub project: std::path::PathBuf,

    /// JSON file with resume/context data
    #[arg(long)]
    pub resume: Option<std::path::PathBuf>,
}

pub async fn run(options: StreamOptions, global: crate::Global) -> Result<()> {
    let current_files = super::load_project_files(&options.project)?;
    let context = super::load_context(options.resume.as_deref())?;

    if global.verbose {
        eprintln!(
            "Loaded {} files from {}",
            current_files.len(),
            options.project.display()
        );
    }

    let request = GenerationRequest {
        mode: Mode::Code,
        instruction: options.instruction,
        current_files,
        context,
    };

    let client = Arc::new(crate::model::GroqClient::from_env());
    let events = stream_refine_data(client, request);

    while let Ok(event) = events.recv().await {
        println!("{}", serde_json::to_string(&event)?);
    }

    Ok(())
}

/// Single-pass streaming variant of the generation pipeline.
///
/// Emits ordered progress events and exactly one terminal `result` event.
/// There is no validation and no retry here: this path trades the structural
/// guarantees of [`super::refine_data`] for latency, and is meant for
/// interactive consumers that want incremental feedback. Internal errors
/// become the terminal result event rather than an error on the channel, so
/// the stream is always consumable to completion.
pub fn stream_refine_data(
    client: Arc<dyn ModelClient>,
    request: GenerationRequest,
) -> async_channel::Receiver<StreamEvent> {
    let (tx, rx) = async_channel::unbounded();

    tokio::spawn(async move {
        run_stream(client, request, tx).await;
    });

    rx
}

async fn run_stream(
    client: Arc<dyn ModelClient>,
    request: GenerationRequest,
    tx: async_channel::Sender<StreamEvent>,
) {
    let started = Instant::now();

    // A send only fails when the receiver is gone, and then there is nobody
    // left to report to, so send results are discarded throughout.
    let _ = tx
        .send(StreamEvent::Tool(ToolEvent {
            name: "analyze_request".to_string(),
            status: ToolStatus::Running,
            message: Some("Analyzing files...".to_string()),
            output_summary: None,
        }))
        .await;

    let files = source_files(&request.current_files);

    let _ = tx
        .send(StreamEvent::Tool(ToolEvent {
            name: "analyze_request".to_string(),
            status: ToolStatus::Success,
            message: None,
            output_summary: Some(format!("Found {} files", files.len())),
        }))
        .await;

    // The streaming path always speaks the code-editing prompt.
    let system = system_prompt(Mode::Code);
    let names: Vec<&str> = files.keys().map(String::as_str).collect();
    let names_json = serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string());
    let user = format!("Request: {}\nFiles: {names_json}", request.instruction);

    let _ = tx
        .send(StreamEvent::Tool(ToolEvent {
            name: "generate_code".to_string(),
            status: ToolStatus::Running,
            message: None,
            output_summary: None,
        }))
        .await;

    let raw = match client.complete(&system, &user, true).await {
        Ok(raw) => raw,
        Err(err) => {
            let _ = tx
                .send(failure_event(
                    &request.current_files,
                    ErrorCode::ModelUnavailable,
                    format!("Model call failed: {err}"),
                    started,
                ))
                .await;
            return;
        }
    };

    let _ = tx
        .send(StreamEvent::Tool(ToolEvent {
            name: "generate_code".to_string(),
            status: ToolStatus::Success,
            message: None,
            output_summary: None,
        }))
        .await;

    let extracted = match extract_json(&raw) {
        Ok(value) => value,
        Err(err) => {
            let _ = tx
                .send(failure_event(
                    &request.current_files,
                    ErrorCode::ExtractionFailed,
                    format!("No parseable response: {err}"),
                    started,
                ))
                .await;
            return;
        }
    };

    let refined = match super::response_files(&extracted, Mode::Code) {
        Ok(files) => files,
        Err(reason) => {
            let _ = tx
                .send(failure_event(
                    &request.current_files,
                    ErrorCode::InternalError,
                    format!("Malformed model payload: {reason}"),
                    started,
                ))
                .await;
            return;
        }
    };

    let thought = super::response_text(&extracted, "thought");
    let summary = super::response_summary(&extracted, Mode::Code);
    let edits = compute_edits(&request.current_files, &refined);
    let merged = merge_files(&request.current_files, &refined);

    let _ = tx
        .send(StreamEvent::Result(Box::new(GenerationResult {
            success: true,
            files: merged,
            refined_files: refined,
            thought,
            summary,
            duration_secs: started.elapsed().as_secs_f64(),
            edits,
            attempts: Vec::new(),
            error: None,
        })))
        .await;
}

fn failure_event(
    current_files: &FileSet,
    error: ErrorCode,
    thought: String,
    started: Instant,
) -> StreamEvent {
    StreamEvent::Result(Box::new(GenerationResult::failure(
        current_files.clone(),
        error,
        thought,
        String::new(),
        started.elapsed().as_secs_f64(),
        Vec::new(),
    )))
}

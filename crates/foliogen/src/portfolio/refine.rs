use std::time::Instant;

use crate::model::ModelClient;
use crate::prelude::{println, *};
use colored::Colorize;
use foliogen_core::portfolio::{
    classify, compute_edits, extract_json, merge_files, system_prompt, user_message, ErrorCode,
    GenerationAttempt, GenerationRequest, GenerationResult, Mode, validate,
};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct RefineOptions {
    /// The build or refinement instruction
    pub instruction: String,

    /// Project directory holding the current files
    #[arg(long, default_value = ".")]
    pub project: std::path::PathBuf,

    /// JSON file with resume/context data
    #[arg(long)]
    pub resume: Option<std::path::PathBuf>,

    /// Generation mode: code, design, advanced-code, strategy, approaches
    #[arg(short, long, env = "FOLIOGEN_MODE", default_value = "code")]
    pub mode: String,

    /// Disable the automatic validation retry
    #[arg(long)]
    pub no_retry: bool,

    /// Directory to write the merged project into on success
    #[arg(long)]
    pub out: Option<std::path::PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: RefineOptions, global: crate::Global) -> Result<()> {
    let current_files = super::load_project_files(&options.project)?;
    let context = super::load_context(options.resume.as_deref())?;
    let mode = Mode::from_label(&options.mode);

    if global.verbose {
        println!("Mode: {}", mode.label());
        println!(
            "Loaded {} files from {}",
            current_files.len(),
            options.project.display()
        );
    }

    let request = GenerationRequest {
        mode,
        instruction: options.instruction,
        current_files,
        context,
    };

    let client = crate::model::GroqClient::from_env();
    let result = refine_data(&client, &request, !options.no_retry).await;

    if result.success {
        if let Some(out) = options.out.as_deref() {
            super::write_project_files(out, &result.files)?;
            if global.verbose {
                println!("Wrote {} files to {}", result.files.len(), out.display());
            }
        }
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_result_text(&result));
    }

    if result.success {
        Ok(())
    } else {
        let code = result
            .error
            .map(|code| code.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Err(eyre!("generation failed: {code}"))
    }
}

/// Run the generation state machine and return a structured result.
///
/// Every outcome is a well-formed [`GenerationResult`]; this function never
/// panics and never raises across the boundary. On failure `files` is the
/// request's `current_files` unchanged, so a failed attempt can never corrupt
/// the caller's snapshot.
///
/// Initial builds (empty or incomplete snapshots) are validated against the
/// merged file set and retried once with the violation list fed back to the
/// model. Refinements skip validation entirely: an incrementally edited
/// project has no fixed schema to check against.
pub async fn refine_data(
    client: &dyn ModelClient,
    request: &GenerationRequest,
    auto_retry: bool,
) -> GenerationResult {
    let started = Instant::now();

    // Classification drives the prompt overlay and the validation policy.
    // Recomputed from the snapshot every call: the caller may be resuming a
    // previously failed build.
    let classification = classify(&request.current_files);
    log::info!(
        "generation type: {}",
        if classification.initial_build {
            "initial build"
        } else {
            "refinement"
        }
    );
    if !classification.missing_core.is_empty() {
        log::info!(
            "missing core files: {}",
            classification.missing_core.join(", ")
        );
    }

    let system = system_prompt(request.mode);
    let max_attempts: u32 = if auto_retry { 2 } else { 1 };
    let mut attempts: Vec<GenerationAttempt> = Vec::new();

    for attempt_no in 1..=max_attempts {
        // Rebuilt from the attempt list each round; the previous round's
        // validation problems become feedback in the next message.
        let user = user_message(request, &classification, &attempts);

        log::info!("model call attempt {attempt_no}/{max_attempts}");
        let call_started = Instant::now();

        let raw = match client.complete(&system, &user, true).await {
            Ok(raw) => raw,
            Err(err) => {
                // A down or misconfigured client is never retried.
                log::error!("model call failed: {err}");
                return GenerationResult::failure(
                    request.current_files.clone(),
                    ErrorCode::ModelUnavailable,
                    format!("Model call failed: {err}"),
                    String::new(),
                    started.elapsed().as_secs_f64(),
                    attempts,
                );
            }
        };
        let duration_secs = call_started.elapsed().as_secs_f64();

        let extracted = match extract_json(&raw) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("extraction failed on attempt {attempt_no}: {err}");
                attempts.push(GenerationAttempt {
                    attempt: attempt_no,
                    duration_secs,
                    raw_response: raw,
                    extracted: None,
                    validation: None,
                });

                if attempt_no == max_attempts {
                    return GenerationResult::failure(
                        request.current_files.clone(),
                        ErrorCode::ExtractionFailed,
                        format!("No parseable response after {max_attempts} attempt(s): {err}"),
                        String::new(),
                        started.elapsed().as_secs_f64(),
                        attempts,
                    );
                }
                continue;
            }
        };

        let refined = match super::response_files(&extracted, request.mode) {
            Ok(files) => files,
            Err(reason) => {
                log::error!("malformed model payload: {reason}");
                return GenerationResult::failure(
                    request.current_files.clone(),
                    ErrorCode::InternalError,
                    format!("Malformed model payload: {reason}"),
                    String::new(),
                    started.elapsed().as_secs_f64(),
                    attempts,
                );
            }
        };

        let thought = super::response_text(&extracted, "thought");
        let summary = super::response_summary(&extracted, request.mode);

        // Validation always runs against the merged set: a resumed build may
        // legitimately lean on files already present.
        let validation = if classification.initial_build {
            Some(validate(&merge_files(&request.current_files, &refined)))
        } else {
            None
        };
        let passed = validation.as_ref().map_or(true, |report| report.passed);

        attempts.push(GenerationAttempt {
            attempt: attempt_no,
            duration_secs,
            raw_response: raw,
            extracted: Some(extracted),
            validation: validation.clone(),
        });

        if passed {
            let edits = compute_edits(&request.current_files, &refined);
            let files = merge_files(&request.current_files, &refined);
            log::info!(
                "generated {} files ({} total) in {:.1}s",
                refined.len(),
                files.len(),
                started.elapsed().as_secs_f64()
            );

            return GenerationResult {
                success: true,
                files,
                refined_files: refined,
                thought,
                summary,
                duration_secs: started.elapsed().as_secs_f64(),
                edits,
                attempts,
                error: None,
            };
        }

        let problems = validation
            .map(|report| report.problems)
            .unwrap_or_default();
        log::warn!("validation failed (attempt {attempt_no}):");
        for problem in &problems {
            log::warn!("  - {problem}");
        }

        if attempt_no == max_attempts {
            let mut result = GenerationResult::failure(
                request.current_files.clone(),
                ErrorCode::ValidationFailed,
                format!("Validation failed: {}", problems.join("; ")),
                "Portfolio generation failed validation checks".to_string(),
                started.elapsed().as_secs_f64(),
                attempts,
            );
            // The rejected files are still reported for display; the merged
            // snapshot stays untouched.
            result.refined_files = refined;
            return result;
        }
    }

    // The loop always returns from its last iteration.
    GenerationResult::failure(
        request.current_files.clone(),
        ErrorCode::InternalError,
        "Attempt loop exited without producing a result".to_string(),
        String::new(),
        started.elapsed().as_secs_f64(),
        attempts,
    )
}

fn format_result_text(result: &GenerationResult) -> String {
    let mut out = String::new();

    if result.success {
        out.push_str(&format!("\n{}\n", "Generation succeeded".green().bold()));
    } else {
        out.push_str(&format!("\n{}\n", "Generation failed".red().bold()));
        if let Some(code) = result.error {
            out.push_str(&format!("{}: {}\n", "Error".red(), code));
        }
    }

    if !result.summary.is_empty() {
        out.push_str(&format!("{}: {}\n", "Summary".green(), result.summary));
    }
    if !result.thought.is_empty() {
        out.push_str(&format!(
            "{}: {}\n",
            "Thought".green(),
            result.thought.bright_black()
        ));
    }
    out.push_str(&format!(
        "{}: {} in {:.1}s\n",
        "Attempts".green(),
        result.attempts.len(),
        result.duration_secs
    ));

    if !result.edits.is_empty() {
        let mut table = crate::prelude::new_table();
        table.add_row(prettytable::row!["File", "Added", "Removed", "Total"]);
        for edit in &result.edits {
            table.add_row(prettytable::row![
                edit.file,
                format!("+{}", edit.lines_added),
                format!("-{}", edit.lines_removed),
                edit.total_lines
            ]);
        }
        out.push_str(&format!("\n{table}"));
    }

    out.push_str(&format!(
        "\n{} files in project ({} refined this round)\n",
        result.files.len(),
        result.refined_files.len()
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelError;
    use crate::portfolio::testing::ScriptedClient;
    use foliogen_core::portfolio::{FileSet, REQUIRED_FILES};

    fn request(mode: Mode, current_files: FileSet) -> GenerationRequest {
        GenerationRequest {
            mode,
            instruction: "Create a modern portfolio with a dark theme".to_string(),
            current_files,
            context: serde_json::json!({"name": "Test User", "title": "Software Engineer"}),
        }
    }

    fn complete_project() -> FileSet {
        let mut files = FileSet::new();
        for path in REQUIRED_FILES {
            files.insert(path.to_string(), "{}".to_string());
        }
        files
    }

    /// A model reply that satisfies every structural invariant.
    fn valid_response() -> String {
        serde_json::json!({
            "thought": "compose sections from components",
            "summary": "Created a complete portfolio",
            "files": {
                "package.json": "{}",
                "tsconfig.json": "{}",
                "tailwind.config.ts": "export default {}",
                "app/layout.tsx": "export default function Layout() {}",
                "app/page.tsx": "import Hero from '@/components/Hero'\nexport default function Home() { return <Hero /> }",
                "components/Hero.tsx": "export default function Hero() { return <div>Hero</div> }"
            }
        })
        .to_string()
    }

    /// Parseable, but structurally incomplete: most required files missing.
    fn invalid_response() -> String {
        serde_json::json!({
            "thought": "partial",
            "summary": "only the page",
            "files": {
                "app/page.tsx": "export default function Home() {}"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_initial_build_succeeds_on_first_attempt() {
        let client = ScriptedClient::new(vec![Ok(valid_response())]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, true).await;

        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(client.call_count(), 1);
        assert_eq!(result.attempts.len(), 1);
        for path in REQUIRED_FILES {
            assert!(result.files.contains_key(path), "missing {path}");
        }
        assert!(result.attempts[0].validation.as_ref().unwrap().passed);
        assert_eq!(result.summary, "Created a complete portfolio");
    }

    #[tokio::test]
    async fn test_retry_bound_exactly_two_calls() {
        let client =
            ScriptedClient::new(vec![Ok(invalid_response()), Ok(invalid_response())]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, true).await;

        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorCode::ValidationFailed));
        assert_eq!(client.call_count(), 2);
        assert_eq!(result.attempts.len(), 2);
        assert!(result.thought.contains("Missing required file: package.json"));
    }

    #[tokio::test]
    async fn test_no_retry_means_single_call() {
        let client = ScriptedClient::new(vec![Ok(invalid_response())]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, false).await;

        assert!(!result.success);
        assert_eq!(client.call_count(), 1);
        assert_eq!(result.error, Some(ErrorCode::ValidationFailed));
    }

    #[tokio::test]
    async fn test_second_attempt_sees_validation_feedback() {
        let client = ScriptedClient::new(vec![Ok(invalid_response()), Ok(valid_response())]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, true).await;

        assert!(result.success);
        assert_eq!(result.attempts.len(), 2);

        let prompts = client.prompts.lock().unwrap();
        assert!(!prompts[0].1.contains("VALIDATION FAILED"));
        assert!(prompts[1].1.contains("VALIDATION FAILED ON PREVIOUS ATTEMPT"));
        assert!(prompts[1].1.contains("Missing required file: package.json"));
        // The feedback block appears once, not accumulated.
        assert_eq!(prompts[1].1.matches("VALIDATION FAILED").count(), 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_retries_then_fails() {
        let client = ScriptedClient::new(vec![
            Ok("this is not json at all".to_string()),
            Ok("still not json".to_string()),
        ]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, true).await;

        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorCode::ExtractionFailed));
        assert_eq!(client.call_count(), 2);
        assert_eq!(result.attempts.len(), 2);
        assert!(result.attempts[0].extracted.is_none());
    }

    #[tokio::test]
    async fn test_extraction_failure_then_recovery() {
        let client =
            ScriptedClient::new(vec![Ok("garbage".to_string()), Ok(valid_response())]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, true).await;

        assert!(result.success);
        assert_eq!(result.attempts.len(), 2);
        assert!(result.attempts[0].extracted.is_none());
        assert!(result.attempts[1].extracted.is_some());
    }

    #[tokio::test]
    async fn test_refinement_skips_validation() {
        // Known asymmetry, preserved deliberately: a refinement that drops or
        // omits a required file is never caught, because only initial builds
        // are validated.
        let client = ScriptedClient::new(vec![Ok(invalid_response())]);
        let req = request(Mode::Code, complete_project());

        let result = refine_data(&client, &req, true).await;

        assert!(result.success);
        assert_eq!(client.call_count(), 1);
        assert!(result.attempts[0].validation.is_none());
        assert_eq!(
            result.refined_files.len(),
            1,
            "refinement output merges without structural checks"
        );
    }

    #[tokio::test]
    async fn test_model_error_is_terminal_and_not_retried() {
        let client = ScriptedClient::new(vec![Err(ModelError::Request(
            "connection timed out".to_string(),
        ))]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, true).await;

        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorCode::ModelUnavailable));
        assert_eq!(client.call_count(), 1);
        assert!(result.thought.contains("connection timed out"));
    }

    #[tokio::test]
    async fn test_missing_key_maps_to_model_unavailable() {
        let client = ScriptedClient::new(vec![Err(ModelError::NotConfigured(
            "GROQ_API_KEY not set".to_string(),
        ))]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, true).await;

        assert_eq!(result.error, Some(ErrorCode::ModelUnavailable));
        assert!(result.thought.contains("GROQ_API_KEY"));
    }

    #[tokio::test]
    async fn test_failure_never_corrupts_current_files() {
        let current = complete_project();
        let client = ScriptedClient::new(vec![Err(ModelError::Request("down".to_string()))]);
        let req = request(Mode::Code, current.clone());

        let result = refine_data(&client, &req, true).await;

        assert!(!result.success);
        assert_eq!(result.files, current);
        assert!(result.refined_files.is_empty());
        assert!(result.edits.is_empty());
    }

    #[tokio::test]
    async fn test_refinement_merge_is_right_biased() {
        let mut current = complete_project();
        current.insert("components/Hero.tsx".to_string(), "old hero".to_string());

        let response = serde_json::json!({
            "thought": "t",
            "summary": "s",
            "files": {"components/Hero.tsx": "new hero"}
        })
        .to_string();
        let client = ScriptedClient::new(vec![Ok(response)]);
        let req = request(Mode::Code, current);

        let result = refine_data(&client, &req, true).await;

        assert!(result.success);
        assert_eq!(result.files["components/Hero.tsx"], "new hero");
        assert_eq!(result.edits.len(), 1);
        assert_eq!(result.edits[0].file, "components/Hero.tsx");
    }

    #[tokio::test]
    async fn test_design_mode_returns_advice_without_files() {
        let response = serde_json::json!({
            "response": "Increase the hero contrast",
            "design_tips": ["Use a 7:1 contrast ratio"]
        })
        .to_string();
        let client = ScriptedClient::new(vec![Ok(response)]);
        let req = request(Mode::Design, complete_project());

        let result = refine_data(&client, &req, true).await;

        assert!(result.success);
        assert!(result.refined_files.is_empty());
        assert_eq!(result.summary, "Increase the hero contrast");
        assert_eq!(result.files, complete_project());
    }

    #[tokio::test]
    async fn test_malformed_files_payload_is_internal_error() {
        let response = serde_json::json!({
            "thought": "t",
            "summary": "s",
            "files": "app/page.tsx"
        })
        .to_string();
        let client = ScriptedClient::new(vec![Ok(response)]);
        let req = request(Mode::Code, FileSet::new());

        let result = refine_data(&client, &req, true).await;

        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorCode::InternalError));
        assert!(result.files.is_empty());
    }

    #[tokio::test]
    async fn test_resumed_build_validates_against_merged_set() {
        // A build resumed with some required files already on disk only needs
        // the model to fill in the gaps.
        let mut current = FileSet::new();
        current.insert("package.json".to_string(), "{}".to_string());
        current.insert("tsconfig.json".to_string(), "{}".to_string());

        let response = serde_json::json!({
            "thought": "finish the build",
            "summary": "added the missing files",
            "files": {
                "tailwind.config.ts": "export default {}",
                "app/layout.tsx": "export default function Layout() {}",
                "app/page.tsx": "export default function Home() {}"
            }
        })
        .to_string();
        let client = ScriptedClient::new(vec![Ok(response)]);
        let req = request(Mode::Code, current);

        let result = refine_data(&client, &req, true).await;

        assert!(result.success, "merged set satisfies the invariants");
        assert_eq!(result.files.len(), 5);
        assert!(result.attempts[0].validation.as_ref().unwrap().passed);
    }
}

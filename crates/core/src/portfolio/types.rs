use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Complete path -> content snapshot of a generated project.
///
/// Paths are relative, forward-slash separated, and case-sensitive. A value
/// is always the entire file content, never a patch.
pub type FileSet = BTreeMap<String, String>;

/// Generation mode selecting the prompt overlay and expected response schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Code,
    Design,
    AdvancedCode,
    Strategy,
    Approaches,
}

impl Mode {
    /// Map a caller-supplied label to a mode.
    ///
    /// Unknown labels fall back to [`Mode::Code`] so that a bad mode string
    /// can never fail a generation request.
    pub fn from_label(label: &str) -> Self {
        match label {
            "design" => Mode::Design,
            "advanced-code" => Mode::AdvancedCode,
            "strategy" => Mode::Strategy,
            "approaches" => Mode::Approaches,
            _ => Mode::Code,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Code => "code",
            Mode::Design => "design",
            Mode::AdvancedCode => "advanced-code",
            Mode::Strategy => "strategy",
            Mode::Approaches => "approaches",
        }
    }

    /// Whether responses in this mode carry a `files` object.
    ///
    /// Advice modes (design, strategy, approaches) answer with mode-specific
    /// keys instead of project files.
    pub fn produces_files(&self) -> bool {
        matches!(self, Mode::Code | Mode::AdvancedCode)
    }
}

/// One refinement request against a project snapshot. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub mode: Mode,
    /// The user's instruction, verbatim.
    pub instruction: String,
    /// The caller's current project files. Empty for a fresh build.
    pub current_files: FileSet,
    /// Opaque structured context (e.g. resume facts) forwarded to the model.
    pub context: serde_json::Value,
}

/// Outcome of checking a file set against the structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    /// Human-readable violations, one per problem. Empty iff `passed`.
    pub problems: Vec<String>,
}

impl ValidationReport {
    pub fn from_problems(problems: Vec<String>) -> Self {
        ValidationReport {
            passed: problems.is_empty(),
            problems,
        }
    }
}

/// Record of a single model round trip inside one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationAttempt {
    /// 1-indexed attempt number.
    pub attempt: u32,
    pub duration_secs: f64,
    pub raw_response: String,
    /// The extracted JSON object, when extraction succeeded.
    pub extracted: Option<serde_json::Value>,
    /// Validation outcome. Absent for refinements and failed extractions.
    pub validation: Option<ValidationReport>,
}

/// Per-file line-count delta. A reporting aid, not a real diff: the merged
/// file set is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRecord {
    pub file: String,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub total_lines: usize,
    pub old_content: String,
    pub new_content: String,
}

/// Failure taxonomy for a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Model client misconfigured or unreachable. Never retried.
    ModelUnavailable,
    /// No parseable JSON object after exhausting the attempt budget.
    ExtractionFailed,
    /// Structurally inconsistent output after exhausting the attempt budget.
    ValidationFailed,
    /// Unexpected pipeline failure; the original message is preserved.
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorCode::ModelUnavailable => "model_unavailable",
            ErrorCode::ExtractionFailed => "extraction_failed",
            ErrorCode::ValidationFailed => "validation_failed",
            ErrorCode::InternalError => "internal_error",
        };
        f.write_str(label)
    }
}

/// Complete outcome of one generation call.
///
/// Every code path produces a well-formed result; on failure `files` is the
/// caller's snapshot unchanged and `error` names the cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    /// Merged project snapshot (current files with this round's output on top).
    pub files: FileSet,
    /// Only the files produced this round.
    pub refined_files: FileSet,
    pub thought: String,
    pub summary: String,
    pub duration_secs: f64,
    pub edits: Vec<EditRecord>,
    pub attempts: Vec<GenerationAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl GenerationResult {
    /// A failure result that leaves the caller's files untouched.
    pub fn failure(
        current_files: FileSet,
        error: ErrorCode,
        thought: String,
        summary: String,
        duration_secs: f64,
        attempts: Vec<GenerationAttempt>,
    ) -> Self {
        GenerationResult {
            success: false,
            files: current_files,
            refined_files: FileSet::new(),
            thought,
            summary,
            duration_secs,
            edits: Vec::new(),
            attempts,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Running,
    Success,
}

/// Progress marker emitted by the streaming path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEvent {
    pub name: String,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_summary: Option<String>,
}

/// Ordered event stream: zero or more `tool` events, then exactly one
/// terminal `result` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamEvent {
    Tool(ToolEvent),
    Result(Box<GenerationResult>),
}

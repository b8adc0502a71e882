//! Pure building blocks for the portfolio generation pipeline.
//!
//! The imperative shell drives a language model through these functions:
//! [`prompt`] composes the system and user messages, [`extract`] recovers a
//! JSON object from the model's raw reply, [`validate`] checks the resulting
//! file set against the project's structural invariants, and [`files`]
//! computes edit summaries and merges the new files into the caller's
//! snapshot. Everything here is synchronous and deterministic.

pub mod extract;
pub mod files;
pub mod prompt;
pub mod types;
pub mod validate;

pub use extract::{extract_json, ExtractError};
pub use files::{compute_edits, merge_files, source_files};
pub use prompt::{system_prompt, user_message};
pub use types::{
    EditRecord, ErrorCode, FileSet, GenerationAttempt, GenerationRequest, GenerationResult, Mode,
    StreamEvent, ToolEvent, ToolStatus, ValidationReport,
};
pub use validate::{classify, validate, Classification, MAX_FILES, REQUIRED_FILES};

use regex::Regex;

use super::types::{FileSet, ValidationReport};

/// Hard ceiling on the number of files in a generated project.
pub const MAX_FILES: usize = 60;

/// Files every portfolio project must contain.
pub const REQUIRED_FILES: [&str; 5] = [
    "package.json",
    "app/layout.tsx",
    "app/page.tsx",
    "tsconfig.json",
    "tailwind.config.ts",
];

/// The entry file whose component imports must resolve to created files.
pub const ENTRY_FILE: &str = "app/page.tsx";

/// How a generation request relates to the caller's current files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// True when the project must be built from scratch: no files at all, or
    /// a previous build that never completed the required set.
    pub initial_build: bool,
    /// Required files absent from the current snapshot.
    pub missing_core: Vec<String>,
}

/// Classify a request as initial build or refinement.
///
/// Recomputed from the snapshot on every call: a caller may resume a
/// previously failed build, so this is never cached or caller-supplied.
pub fn classify(current_files: &FileSet) -> Classification {
    let missing_core: Vec<String> = REQUIRED_FILES
        .iter()
        .filter(|path| !current_files.contains_key(**path))
        .map(|path| (*path).to_string())
        .collect();

    Classification {
        initial_build: current_files.is_empty() || !missing_core.is_empty(),
        missing_core,
    }
}

/// Check a complete file set against the structural invariants.
///
/// All rules are evaluated, with no short-circuiting, so a single pass
/// reports every violation: required files present, file count within [`MAX_FILES`],
/// and every component imported by the entry file backed by a created file.
///
/// The import check is deliberately shallow pattern matching: it detects the
/// single supported syntax `from '@/components/<Name>'` and nothing else.
/// Parser-level validation of the generated code is out of scope.
pub fn validate(files: &FileSet) -> ValidationReport {
    let mut problems = Vec::new();

    for required in REQUIRED_FILES {
        if !files.contains_key(required) {
            problems.push(format!("Missing required file: {required}"));
        }
    }

    if files.len() > MAX_FILES {
        problems.push(format!(
            "Too many files generated ({} > {MAX_FILES})",
            files.len()
        ));
    }

    if let Some(entry) = files.get(ENTRY_FILE) {
        let import = Regex::new(r#"from\s+['"]@/components/([\w/]+)['"]"#).unwrap();
        for caps in import.captures_iter(entry) {
            let name = &caps[1];
            let component_file = format!("components/{name}.tsx");
            if !files.contains_key(&component_file) {
                problems.push(format!(
                    "Component '{name}' imported in {ENTRY_FILE} but {component_file} not created"
                ));
            }
        }
    }

    ValidationReport::from_problems(problems)
}

use super::types::{EditRecord, FileSet};

/// Extensions that count as project source and are worth showing the model.
const SOURCE_EXTENSIONS: [&str; 5] = [".tsx", ".ts", ".css", ".json", ".js"];

/// Filter a snapshot down to source files.
///
/// Lockfiles and non-source assets only waste prompt budget, so they are
/// dropped before the file listing reaches the model.
pub fn source_files(files: &FileSet) -> FileSet {
    files
        .iter()
        .filter(|(path, _)| {
            SOURCE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
                && !path.starts_with("package-lock")
        })
        .map(|(path, content)| (path.clone(), content.clone()))
        .collect()
}

/// Right-biased union of two snapshots: entries from `refined` win on path
/// collision. Produces a new map; neither input is mutated.
pub fn merge_files(current: &FileSet, refined: &FileSet) -> FileSet {
    let mut merged = current.clone();
    for (path, content) in refined {
        merged.insert(path.clone(), content.clone());
    }
    merged
}

/// Coarse per-file line-count deltas for every path produced this round.
///
/// A path absent from `current` (or previously empty) counts as zero lines.
/// This is bookkeeping for display, not a diff algorithm.
pub fn compute_edits(current: &FileSet, refined: &FileSet) -> Vec<EditRecord> {
    refined
        .iter()
        .map(|(path, new_content)| {
            let old_content = current.get(path).cloned().unwrap_or_default();
            let old_lines = if old_content.is_empty() {
                0
            } else {
                old_content.split('\n').count()
            };
            let new_lines = new_content.split('\n').count();

            EditRecord {
                file: path.clone(),
                lines_added: new_lines.saturating_sub(old_lines),
                lines_removed: old_lines.saturating_sub(new_lines),
                total_lines: new_lines,
                old_content,
                new_content: new_content.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_set(entries: &[(&str, &str)]) -> FileSet {
        entries
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect()
    }

    #[test]
    fn test_source_files_keeps_source_extensions() {
        let files = file_set(&[
            ("app/page.tsx", "page"),
            ("lib/utils.ts", "utils"),
            ("styles/globals.css", "css"),
            ("package.json", "{}"),
            ("next.config.js", "config"),
            ("public/photo.png", "binary"),
            ("README.md", "docs"),
        ]);

        let filtered = source_files(&files);
        assert_eq!(filtered.len(), 5);
        assert!(!filtered.contains_key("public/photo.png"));
        assert!(!filtered.contains_key("README.md"));
    }

    #[test]
    fn test_source_files_drops_lockfile() {
        let files = file_set(&[("package.json", "{}"), ("package-lock.json", "{}")]);
        let filtered = source_files(&files);
        assert!(filtered.contains_key("package.json"));
        assert!(!filtered.contains_key("package-lock.json"));
    }

    #[test]
    fn test_merge_empty_refined_is_identity() {
        let current = file_set(&[("a.ts", "one"), ("b.ts", "two")]);
        let merged = merge_files(&current, &FileSet::new());
        assert_eq!(merged, current);
    }

    #[test]
    fn test_merge_is_right_biased() {
        let current = file_set(&[("a.ts", "old"), ("b.ts", "keep")]);
        let refined = file_set(&[("a.ts", "new"), ("c.ts", "added")]);

        let merged = merge_files(&current, &refined);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["a.ts"], "new");
        assert_eq!(merged["b.ts"], "keep");
        assert_eq!(merged["c.ts"], "added");
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let current = file_set(&[("a.ts", "old")]);
        let refined = file_set(&[("a.ts", "new")]);

        let _ = merge_files(&current, &refined);
        assert_eq!(current["a.ts"], "old");
        assert_eq!(refined["a.ts"], "new");
    }

    #[test]
    fn test_compute_edits_new_file() {
        let refined = file_set(&[("components/Hero.tsx", "a\nb\nc")]);
        let edits = compute_edits(&FileSet::new(), &refined);

        assert_eq!(edits.len(), 1);
        let edit = &edits[0];
        assert_eq!(edit.file, "components/Hero.tsx");
        assert_eq!(edit.lines_added, 3);
        assert_eq!(edit.lines_removed, 0);
        assert_eq!(edit.total_lines, 3);
        assert_eq!(edit.old_content, "");
    }

    #[test]
    fn test_compute_edits_grown_file() {
        let current = file_set(&[("a.ts", "one\ntwo")]);
        let refined = file_set(&[("a.ts", "one\ntwo\nthree\nfour")]);

        let edits = compute_edits(&current, &refined);
        assert_eq!(edits[0].lines_added, 2);
        assert_eq!(edits[0].lines_removed, 0);
        assert_eq!(edits[0].total_lines, 4);
    }

    #[test]
    fn test_compute_edits_shrunk_file() {
        let current = file_set(&[("a.ts", "one\ntwo\nthree")]);
        let refined = file_set(&[("a.ts", "one")]);

        let edits = compute_edits(&current, &refined);
        assert_eq!(edits[0].lines_added, 0);
        assert_eq!(edits[0].lines_removed, 2);
        assert_eq!(edits[0].total_lines, 1);
    }

    #[test]
    fn test_compute_edits_untouched_files_not_reported() {
        let current = file_set(&[("a.ts", "one"), ("b.ts", "two")]);
        let refined = file_set(&[("a.ts", "changed")]);

        let edits = compute_edits(&current, &refined);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].file, "a.ts");
    }

    #[test]
    fn test_compute_edits_empty_refined() {
        let current = file_set(&[("a.ts", "one")]);
        assert!(compute_edits(&current, &FileSet::new()).is_empty());
    }
}

//! Publishing order of Markdown topics.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use glob::MatchOptions;

use crate::error::ProjectError;
use crate::layout::ProjectLayout;
use crate::toc::TocInstance;

/// Produces the ordered list of Markdown files to publish.
pub trait OrderingResolver: Send + Sync {
    /// Absolute paths of Markdown files under `markdown_dir`, in publishing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the project under `root` cannot be read.
    fn resolve(&self, root: &Path, markdown_dir: &Path) -> Result<Vec<PathBuf>, ProjectError>;
}

/// Orders topics by the project's table of contents, then remaining files by path.
///
/// A root without a project file is a plain Markdown directory: all files
/// are ordered by path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectOrdering;

impl OrderingResolver for ProjectOrdering {
    fn resolve(&self, root: &Path, markdown_dir: &Path) -> Result<Vec<PathBuf>, ProjectError> {
        match ProjectLayout::detect(root) {
            Ok(layout) => order_topics(layout.primary_instance(), markdown_dir),
            Err(ProjectError::NoProject(_)) => {
                tracing::debug!(root = %root.display(), "No project file, ordering by path");
                order_topics(None, markdown_dir)
            }
            Err(e) => Err(e),
        }
    }
}

/// Order the Markdown files under `markdown_dir`.
///
/// Topics from `instance` come first (start page, then depth-first). A topic
/// is looked up relative to `markdown_dir`, then by file name anywhere below
/// it; topics without a file are skipped. Every other `*.md` file follows,
/// sorted by path. Hidden files and directories are ignored.
///
/// # Errors
///
/// Returns an error if `markdown_dir` cannot be made absolute or listed.
pub fn order_topics(
    instance: Option<&TocInstance>,
    markdown_dir: &Path,
) -> Result<Vec<PathBuf>, ProjectError> {
    let markdown_dir = std::path::absolute(markdown_dir).map_err(|e| ProjectError::io(markdown_dir, e))?;
    let files = list_markdown(&markdown_dir)?;

    let mut by_name: HashMap<&OsStr, &PathBuf> = HashMap::new();
    for file in &files {
        if let Some(name) = file.file_name() {
            by_name.entry(name).or_insert(file);
        }
    }

    let mut ordered = Vec::with_capacity(files.len());
    let mut seen = HashSet::new();

    for topic in instance.map(TocInstance::topics).unwrap_or_default() {
        let direct = markdown_dir.join(topic);
        let path = if direct.is_file() {
            direct
        } else if let Some(found) = Path::new(topic).file_name().and_then(|n| by_name.get(n)) {
            (*found).clone()
        } else {
            tracing::warn!(topic, dir = %markdown_dir.display(), "Topic listed in table of contents not found");
            continue;
        };
        if seen.insert(path.clone()) {
            ordered.push(path);
        }
    }

    for file in &files {
        if !seen.contains(file) {
            ordered.push(file.clone());
        }
    }

    Ok(ordered)
}

/// All visible `*.md` files below `dir`, sorted.
fn list_markdown(dir: &Path) -> Result<Vec<PathBuf>, ProjectError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = format!("{}/**/*.md", glob::Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::default()
    };
    let entries = glob::glob_with(&pattern, options)
        .map_err(|e| ProjectError::Invalid(format!("invalid markdown pattern {pattern}: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable path"),
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::TocElement;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# x\n").unwrap();
    }

    fn relative(paths: &[PathBuf], base: &Path) -> Vec<String> {
        let base = std::path::absolute(base).unwrap();
        paths
            .iter()
            .map(|p| p.strip_prefix(&base).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_order_toc_then_orphans() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        for f in ["intro.md", "b.md", "a.md", "nested/deep.md", "z-orphan.md", "orphans/c.md", ".hidden/x.md"] {
            touch(dir, f);
        }
        fs::write(dir.join("notes.txt"), "").unwrap();

        let instance = TocInstance {
            start_page: Some("intro.md".to_owned()),
            elements: vec![
                TocElement::new("intro.md", vec![]),
                TocElement::new("b.md", vec![TocElement::new("deep.md", vec![])]),
                TocElement::new("missing.md", vec![]),
                TocElement::new("a.md", vec![]),
            ],
        };

        let ordered = order_topics(Some(&instance), dir).unwrap();
        assert_eq!(
            relative(&ordered, dir),
            ["intro.md", "b.md", "nested/deep.md", "a.md", "orphans/c.md", "z-orphan.md"]
        );
        assert!(ordered.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_order_without_toc_is_alphabetical() {
        let tmp = TempDir::new().unwrap();
        for f in ["b.md", "a.md", "sub/c.md"] {
            touch(tmp.path(), f);
        }
        let ordered = order_topics(None, tmp.path()).unwrap();
        assert_eq!(relative(&ordered, tmp.path()), ["a.md", "b.md", "sub/c.md"]);
    }

    #[test]
    fn test_order_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        for f in ["x.md", "y.md", "d/z.md"] {
            touch(tmp.path(), f);
        }
        let instance = TocInstance {
            start_page: Some("y.md".to_owned()),
            elements: vec![],
        };
        assert_eq!(
            order_topics(Some(&instance), tmp.path()).unwrap(),
            order_topics(Some(&instance), tmp.path()).unwrap()
        );
    }

    #[test]
    fn test_missing_markdown_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(order_topics(None, &tmp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_project_ordering_resolver() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("authord.config.json"),
            r#"{"instances": [{"start-page": "start.md", "toc-elements": [{"topic": "second.md"}]}]}"#,
        )
        .unwrap();
        let topics = tmp.path().join("topics");
        for f in ["a.md", "second.md", "start.md"] {
            touch(&topics, f);
        }

        let ordered = ProjectOrdering.resolve(tmp.path(), &topics).unwrap();
        assert_eq!(relative(&ordered, &topics), ["start.md", "second.md", "a.md"]);
    }

    #[test]
    fn test_project_ordering_without_project_file() {
        let tmp = TempDir::new().unwrap();
        for f in ["b.md", "a.md"] {
            touch(tmp.path(), f);
        }
        let ordered = ProjectOrdering.resolve(tmp.path(), tmp.path()).unwrap();
        assert_eq!(relative(&ordered, tmp.path()), ["a.md", "b.md"]);
    }
}

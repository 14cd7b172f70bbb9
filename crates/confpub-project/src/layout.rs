//! Project detection.

use std::path::{Path, PathBuf};

use crate::authord::AuthordConfig;
use crate::error::ProjectError;
use crate::toc::TocInstance;
use crate::writerside;

const WRITERSIDE_CONFIG: &str = "writerside.cfg";
const WRITERSIDE_SUBDIR: &str = "Writerside";
const AUTHORD_CONFIG: &str = "authord.config.json";
const DEFAULT_TOPICS_DIR: &str = "topics";
const DEFAULT_IMAGES_DIR: &str = "images";

/// Kind of documentation project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Writerside,
    Authord,
}

/// A detected project: where its files live and how its topics are ordered.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub kind: ProjectKind,
    /// The project configuration file.
    pub config_path: PathBuf,
    /// Directory holding the Markdown topics.
    pub markdown_dir: PathBuf,
    /// Directory holding images.
    pub image_dir: PathBuf,
    /// Documentation instances in declaration order.
    pub instances: Vec<TocInstance>,
}

impl ProjectLayout {
    /// Detect the project under `root`.
    ///
    /// Looks for `writerside.cfg` in `root` and `root/Writerside`, then
    /// `authord.config.json` in `root`.
    ///
    /// # Errors
    ///
    /// Returns `ProjectError::NoProject` if neither file exists, or an
    /// error if a project file cannot be read or parsed.
    pub fn detect(root: &Path) -> Result<Self, ProjectError> {
        for dir in [root.to_path_buf(), root.join(WRITERSIDE_SUBDIR)] {
            let config_path = dir.join(WRITERSIDE_CONFIG);
            if config_path.is_file() {
                return Self::load_writerside(&dir, config_path);
            }
        }

        let config_path = root.join(AUTHORD_CONFIG);
        if config_path.is_file() {
            return Self::load_authord(root, config_path);
        }

        Err(ProjectError::NoProject(root.to_path_buf()))
    }

    /// The instance whose table of contents drives publishing order.
    #[must_use]
    pub fn primary_instance(&self) -> Option<&TocInstance> {
        self.instances.first()
    }

    fn load_writerside(dir: &Path, config_path: PathBuf) -> Result<Self, ProjectError> {
        let content = read(&config_path)?;
        let config = writerside::parse_config(&content, &config_path)?;

        let mut instances = Vec::with_capacity(config.instances.len());
        for src in &config.instances {
            let tree_path = dir.join(src);
            let tree = read(&tree_path)?;
            instances.push(writerside::parse_tree(&tree, &tree_path)?);
        }
        tracing::debug!(config = %config_path.display(), instances = instances.len(), "Detected Writerside project");

        Ok(Self {
            kind: ProjectKind::Writerside,
            markdown_dir: dir.join(config.topics_dir.as_deref().unwrap_or(DEFAULT_TOPICS_DIR)),
            image_dir: dir.join(config.images_dir.as_deref().unwrap_or(DEFAULT_IMAGES_DIR)),
            config_path,
            instances,
        })
    }

    fn load_authord(dir: &Path, config_path: PathBuf) -> Result<Self, ProjectError> {
        let content = read(&config_path)?;
        let config = AuthordConfig::parse(&content, &config_path)?;
        let markdown_dir = dir.join(config.topics.dir.as_deref().unwrap_or(DEFAULT_TOPICS_DIR));
        let image_dir = dir.join(config.images.dir.as_deref().unwrap_or(DEFAULT_IMAGES_DIR));
        let instances = config.into_instances();
        tracing::debug!(config = %config_path.display(), instances = instances.len(), "Detected Authord project");

        Ok(Self {
            kind: ProjectKind::Authord,
            config_path,
            markdown_dir,
            image_dir,
            instances,
        })
    }
}

fn read(path: &Path) -> Result<String, ProjectError> {
    std::fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detect_writerside_in_subdir() {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().join("Writerside");
        fs::create_dir(&ws).unwrap();
        fs::write(
            ws.join("writerside.cfg"),
            r#"<ihp><topics dir="topics"/><images dir="img"/><instance src="hi.tree"/></ihp>"#,
        )
        .unwrap();
        fs::write(
            ws.join("hi.tree"),
            r#"<instance-profile id="hi" start-page="a.md"><toc-element topic="a.md"/></instance-profile>"#,
        )
        .unwrap();

        let layout = ProjectLayout::detect(tmp.path()).unwrap();
        assert_eq!(layout.kind, ProjectKind::Writerside);
        assert_eq!(layout.markdown_dir, ws.join("topics"));
        assert_eq!(layout.image_dir, ws.join("img"));
        assert_eq!(layout.primary_instance().unwrap().topics(), ["a.md"]);
    }

    #[test]
    fn test_detect_authord_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("authord.config.json"), "{}").unwrap();

        let layout = ProjectLayout::detect(tmp.path()).unwrap();
        assert_eq!(layout.kind, ProjectKind::Authord);
        assert_eq!(layout.markdown_dir, tmp.path().join("topics"));
        assert_eq!(layout.image_dir, tmp.path().join("images"));
        assert!(layout.primary_instance().is_none());
    }

    #[test]
    fn test_detect_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            ProjectLayout::detect(tmp.path()),
            Err(ProjectError::NoProject(_))
        ));
    }

    #[test]
    fn test_missing_tree_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("writerside.cfg"),
            r#"<ihp><instance src="missing.tree"/></ihp>"#,
        )
        .unwrap();
        assert!(matches!(
            ProjectLayout::detect(tmp.path()),
            Err(ProjectError::Io { .. })
        ));
    }
}

//! Error types for project detection and ordering.

use std::path::PathBuf;

/// Error while reading a documentation project.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// No `writerside.cfg` or `authord.config.json` under the root.
    #[error("no Writerside or Authord project found in {}", .0.display())]
    NoProject(PathBuf),

    /// File system error.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed Writerside XML.
    #[error("invalid XML in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    /// Malformed Authord JSON.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Structurally valid file with unusable content.
    #[error("{0}")]
    Invalid(String),
}

impl ProjectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

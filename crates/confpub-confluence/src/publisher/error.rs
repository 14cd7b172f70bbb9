//! Error types for publish operations.

use std::path::PathBuf;

use confpub_project::ProjectError;
use confpub_storage::ConvertError;

use crate::error::ConfluenceError;

/// Error during a publish run.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Missing or inconsistent options.
    #[error("{0}")]
    Config(String),

    /// The project has no Markdown files to publish.
    #[error("no Markdown files found in {}", .0.display())]
    NoMarkdown(PathBuf),

    /// The target page does not exist.
    #[error("Confluence page {0} not found")]
    PageNotFound(String),

    /// A Markdown file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Project ordering failed.
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Markdown conversion failed.
    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),

    /// A Confluence API call failed.
    #[error("{operation} failed for {target}: {source}")]
    Remote {
        operation: &'static str,
        target: String,
        #[source]
        source: ConfluenceError,
    },
}

impl PublishError {
    /// Wrap a Confluence error with the failed operation and its target.
    pub(crate) fn remote(operation: &'static str, target: &str) -> impl FnOnce(ConfluenceError) -> Self {
        let target = target.to_owned();
        move |source| Self::Remote {
            operation,
            target,
            source,
        }
    }
}

//! Diagram renderer capability.
//!
//! A renderer turns diagram source into PNG bytes. Implementations are passed
//! around as `Arc<dyn DiagramRenderer>` so callers can substitute their own
//! (tests use a counting mock).

mod kroki;
mod mermaid_cli;

pub use kroki::KrokiRenderer;
pub use mermaid_cli::MermaidCliRenderer;

use crate::language::DiagramLanguage;

/// Renders diagram source to PNG bytes.
pub trait DiagramRenderer: Send + Sync {
    /// Whether this renderer can handle the given language.
    fn supports(&self, language: DiagramLanguage) -> bool;

    /// Render `source` to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the backend fails, times out, or
    /// produces something that is not a PNG.
    fn render(&self, language: DiagramLanguage, source: &str) -> Result<Vec<u8>, RenderError>;
}

/// Diagram rendering error.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// HTTP transport or status failure.
    #[error("HTTP error: {0}")]
    Http(String),
    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// External renderer process exited unsuccessfully.
    #[error("renderer exited with {status}: {stderr}")]
    Process {
        /// Exit status description.
        status: String,
        /// Captured standard error output.
        stderr: String,
    },
    /// Rendering exceeded the configured timeout.
    #[error("rendering timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// Output did not start with the PNG signature.
    #[error("invalid PNG data")]
    InvalidPng,
    /// Renderer does not handle this language.
    #[error("unsupported diagram language: {0}")]
    Unsupported(DiagramLanguage),
}

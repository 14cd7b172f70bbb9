//! Error types for the Confluence REST client.

/// Error from a Confluence REST call.
#[derive(Debug, thiserror::Error)]
pub enum ConfluenceError {
    /// Request never got a response (connection, TLS, timeout).
    #[error("request failed: {0}")]
    HttpRequest(#[from] ureq::Error),

    /// Server answered with a 4xx or 5xx status.
    #[error("server returned {status}: {body}")]
    HttpResponse { status: u16, body: String },

    /// Local file could not be read for upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request or response body was not the expected JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfluenceError {
    /// HTTP status of an error response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

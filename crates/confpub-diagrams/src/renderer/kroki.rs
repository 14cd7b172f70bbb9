//! Kroki HTTP renderer.

use std::time::Duration;

use ureq::Agent;

use super::{DiagramRenderer, RenderError};
use crate::consts::DEFAULT_TIMEOUT;
use crate::language::DiagramLanguage;
use crate::png::is_png;

/// Renders diagrams to PNG by POSTing them to a Kroki server.
#[derive(Debug)]
pub struct KrokiRenderer {
    server_url: String,
    agent: Agent,
}

impl KrokiRenderer {
    /// Create a renderer for `server_url` with the default timeout.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_timeout(server_url, DEFAULT_TIMEOUT)
    }

    /// Create a renderer whose requests are bounded by `timeout`.
    #[must_use]
    pub fn with_timeout(server_url: impl Into<String>, timeout: Duration) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_owned();
        Self {
            server_url,
            agent: create_agent(timeout),
        }
    }

    /// Request URL for a diagram language.
    fn url(&self, language: DiagramLanguage) -> String {
        format!("{}/{}/png", self.server_url, language.kroki_endpoint())
    }
}

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

impl DiagramRenderer for KrokiRenderer {
    fn supports(&self, _language: DiagramLanguage) -> bool {
        true
    }

    fn render(&self, language: DiagramLanguage, source: &str) -> Result<Vec<u8>, RenderError> {
        let url = self.url(language);
        tracing::debug!(%url, "Rendering diagram via Kroki");

        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "text/plain")
            .send(source.as_bytes())
            .map_err(|e| RenderError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(RenderError::Http(format!("HTTP {status}: {error_body}")));
        }

        let data = body
            .read_to_vec()
            .map_err(|e| RenderError::Http(e.to_string()))?;
        if !is_png(&data) {
            return Err(RenderError::InvalidPng);
        }
        Ok(data)
    }
}

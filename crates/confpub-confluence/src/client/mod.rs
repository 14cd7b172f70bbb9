//! Confluence REST API client.
//!
//! Sync HTTP client for the Confluence REST API (v1), authenticating with
//! an API token: Basic auth for Confluence Cloud (username + token) or a
//! Bearer personal access token for Server/Data Center.

mod attachments;
mod pages;
mod properties;

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ureq::Agent;
use ureq::http::Response;

use crate::error::ConfluenceError;
use crate::repository::{AttachmentRepository, PageInfo, PageRepository, PropertyStore};
use crate::types::Attachment;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Content property holding the export hash.
pub const EXPORT_HASH_PROPERTY: &str = "confpub-export-hash";

/// Confluence REST API client.
pub struct ConfluenceClient {
    agent: Agent,
    base_url: String,
    authorization: String,
}

impl ConfluenceClient {
    /// Create a client.
    ///
    /// With a `username` the token is sent as HTTP Basic credentials,
    /// otherwise as a Bearer token.
    #[must_use]
    pub fn new(base_url: &str, username: Option<&str>, api_token: &str) -> Self {
        Self::with_timeout(base_url, username, api_token, Duration::from_secs(DEFAULT_TIMEOUT))
    }

    /// Create a client with a custom request timeout.
    #[must_use]
    pub fn with_timeout(
        base_url: &str,
        username: Option<&str>,
        api_token: &str,
        timeout: Duration,
    ) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            authorization: authorization_header(username, api_token),
        }
    }

    /// Web URL of a page.
    #[must_use]
    pub fn page_url(&self, page_id: &str) -> String {
        format!("{}/pages/viewpage.action?pageId={page_id}", self.base_url)
    }

    /// Get the API base URL.
    fn api_url(&self) -> String {
        format!("{}/rest/api", self.base_url)
    }
}

fn authorization_header(username: Option<&str>, api_token: &str) -> String {
    match username.filter(|u| !u.is_empty()) {
        Some(user) => format!("Basic {}", STANDARD.encode(format!("{user}:{api_token}"))),
        None => format!("Bearer {api_token}"),
    }
}

/// Turn an error status into `ConfluenceError::HttpResponse`.
fn check_status(response: Response<ureq::Body>) -> Result<ureq::Body, ConfluenceError> {
    let status = response.status().as_u16();
    let mut body_reader = response.into_body();

    if status >= 400 {
        let error_body = body_reader
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(ConfluenceError::HttpResponse {
            status,
            body: error_body,
        });
    }
    Ok(body_reader)
}

impl PageRepository for ConfluenceClient {
    fn get(&self, page_id: &str) -> Result<Option<PageInfo>, ConfluenceError> {
        Ok(self.get_page(page_id, &["version"])?.map(PageInfo::from))
    }

    fn put_storage_body(
        &self,
        page_id: &str,
        xhtml: &str,
        title: &str,
        version: u32,
    ) -> Result<PageInfo, ConfluenceError> {
        self.update_page(page_id, title, xhtml, version).map(PageInfo::from)
    }
}

impl AttachmentRepository for ConfluenceClient {
    fn list(&self, page_id: &str) -> Result<BTreeSet<String>, ConfluenceError> {
        Ok(self
            .get_attachments(page_id)?
            .into_iter()
            .map(|a| a.title)
            .collect())
    }

    fn ensure(&self, page_id: &str, file: &Path) -> Result<Attachment, ConfluenceError> {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = std::fs::read(file)?;
        self.upload_attachment(page_id, &filename, &data, attachments::content_type_for(&filename))
    }
}

impl PropertyStore for ConfluenceClient {
    fn get_export_hash(&self, page_id: &str) -> Result<Option<String>, ConfluenceError> {
        Ok(self
            .get_property(page_id, EXPORT_HASH_PROPERTY)?
            .and_then(|p| p.value.as_str().map(str::to_owned)))
    }

    fn set_export_hash(&self, page_id: &str, hash: &str) -> Result<(), ConfluenceError> {
        self.set_property(page_id, EXPORT_HASH_PROPERTY, serde_json::Value::from(hash))
    }
}

//! Page operations for Confluence API.

use serde_json::json;
use tracing::info;

use super::{ConfluenceClient, check_status};
use crate::error::ConfluenceError;
use crate::types::Page;

impl ConfluenceClient {
    /// Get page by ID with optional field expansion, `None` on 404.
    pub(crate) fn get_page(&self, page_id: &str, expand: &[&str]) -> Result<Option<Page>, ConfluenceError> {
        let mut url = format!("{}/content/{}", self.api_url(), page_id);

        if !expand.is_empty() {
            url.push_str("?expand=");
            url.push_str(&expand.join(","));
        }

        info!("Getting page {}", page_id);

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .call()?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        Ok(Some(check_status(response)?.read_json()?))
    }

    /// Write a new page version with a storage-format body.
    pub(crate) fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        version: u32,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content/{}", self.api_url(), page_id);

        let payload = json!({
            "id": page_id,
            "type": "page",
            "title": title,
            "body": {
                "storage": {
                    "value": body,
                    "representation": "storage"
                }
            },
            "version": {"number": version}
        });

        info!("Updating page {} to version {}", page_id, version);

        let payload_bytes = serde_json::to_vec(&payload)?;

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.authorization)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        let page: Page = check_status(response)?.read_json()?;
        info!("Updated page {} to version {}", page_id, page.version.number);
        Ok(page)
    }
}

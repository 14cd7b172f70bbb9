//! Content property operations for Confluence API.

use serde_json::json;
use tracing::debug;

use super::{ConfluenceClient, check_status};
use crate::error::ConfluenceError;
use crate::types::ContentProperty;

impl ConfluenceClient {
    /// Get a content property, `None` when the page has no such key.
    pub(crate) fn get_property(
        &self,
        page_id: &str,
        key: &str,
    ) -> Result<Option<ContentProperty>, ConfluenceError> {
        let url = format!("{}/content/{}/property/{}", self.api_url(), page_id, key);

        debug!(page_id, key, "Getting content property");

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

    /// Create or update a content property.
    pub(crate) fn set_property(
        &self,
        page_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), ConfluenceError> {
        let existing = self.get_property(page_id, key)?;

        let request = match &existing {
            Some(property) => {
                let url = format!("{}/content/{}/property/{}", self.api_url(), page_id, key);
                let payload = json!({
                    "key": key,
                    "value": value,
                    "version": {"number": property.version.number + 1}
                });
                (self.agent.put(&url), serde_json::to_vec(&payload)?)
            }
            None => {
                let url = format!("{}/content/{}/property", self.api_url(), page_id);
                let payload = json!({"key": key, "value": value});
                (self.agent.post(&url), serde_json::to_vec(&payload)?)
            }
        };

        debug!(page_id, key, update = existing.is_some(), "Writing content property");

        let (builder, payload_bytes) = request;
        let response = builder
            .header("Authorization", &self.authorization)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        check_status(response)?;
        Ok(())
    }
}

//! Confluence content property types.

use serde::Deserialize;

use super::Version;

/// A content property attached to a page.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentProperty {
    pub key: String,
    pub value: serde_json::Value,
    pub version: Version,
}

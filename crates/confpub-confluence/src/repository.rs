//! Remote capabilities the publisher depends on.
//!
//! [`ConfluenceClient`](crate::ConfluenceClient) implements all three traits
//! against the REST API; tests substitute an in-memory implementation.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::ConfluenceError;
use crate::types::{Attachment, Page};

/// Page metadata needed to write a new version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub id: String,
    pub title: String,
    /// Current version number.
    pub version: u32,
}

impl From<Page> for PageInfo {
    fn from(page: Page) -> Self {
        Self {
            id: page.id,
            title: page.title,
            version: page.version.number,
        }
    }
}

/// Read and write page bodies.
pub trait PageRepository: Send + Sync {
    /// Fetch a page, `None` if it does not exist.
    fn get(&self, page_id: &str) -> Result<Option<PageInfo>, ConfluenceError>;

    /// Replace the page body with storage XHTML as `version`.
    fn put_storage_body(
        &self,
        page_id: &str,
        xhtml: &str,
        title: &str,
        version: u32,
    ) -> Result<PageInfo, ConfluenceError>;
}

/// List and upload page attachments.
pub trait AttachmentRepository: Send + Sync {
    /// Filenames of all attachments on the page.
    fn list(&self, page_id: &str) -> Result<BTreeSet<String>, ConfluenceError>;

    /// Create or update the attachment named after `file`'s basename.
    fn ensure(&self, page_id: &str, file: &Path) -> Result<Attachment, ConfluenceError>;
}

/// Export hash stored alongside the page.
pub trait PropertyStore: Send + Sync {
    /// The stored hash, `None` if never set.
    fn get_export_hash(&self, page_id: &str) -> Result<Option<String>, ConfluenceError>;

    /// Store `hash` for the page.
    fn set_export_hash(&self, page_id: &str, hash: &str) -> Result<(), ConfluenceError>;
}

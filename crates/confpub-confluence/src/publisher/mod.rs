//! Idempotent publishing of a documentation project to one Confluence page.
//!
//! A run moves through these stages:
//!
//! 1. Resolve the ordered Markdown files
//! 2. Convert their concatenation to storage XHTML
//! 3. Hash the XHTML
//! 4. Compare with the hash stored on the page
//! 5. Equal hashes upload only attachments missing on the page (or nothing);
//!    otherwise the body is written as a new version and attachments synced
//! 6. Store the new hash, last, so a failed run is retried in full
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use confpub_confluence::{ConfluenceClient, PublishOptions, Publisher};
//! use confpub_project::ProjectOrdering;
//! use confpub_storage::StorageConverter;
//!
//! let client = ConfluenceClient::new("https://example.atlassian.net/wiki", Some("me@example.com"), "token");
//! let converter = StorageConverter::new("docs/images");
//! let publisher = Publisher::new(&client, &ProjectOrdering, &converter);
//!
//! let report = publisher.publish(&PublishOptions {
//!     source_root: "docs".into(),
//!     markdown_dir: "docs/topics".into(),
//!     image_dir: "docs/images".into(),
//!     page_id: "123456".to_owned(),
//!     title: None,
//!     force_attachments: false,
//!     dry_run: false,
//! })?;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

mod error;
mod executor;
#[cfg(test)]
mod mock;
mod result;

use std::path::PathBuf;

pub use error::PublishError;
pub use executor::{Publisher, concatenate};
pub use result::{PublishOutcome, PublishReport};

/// Options for one publish run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Project root (where the Writerside/Authord configuration lives).
    pub source_root: PathBuf,
    /// Directory holding the Markdown topics.
    pub markdown_dir: PathBuf,
    /// Directory holding images and rendered diagrams.
    pub image_dir: PathBuf,
    /// Target page.
    pub page_id: String,
    /// Title to set instead of the page's current one.
    pub title: Option<String>,
    /// Upload every referenced attachment on update, not just missing ones.
    pub force_attachments: bool,
    /// Report what would happen without writing anything.
    pub dry_run: bool,
}

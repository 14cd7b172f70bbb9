//! Confluence attachment types.

use serde::Deserialize;

use super::Links;

/// Confluence attachment.
///
/// Only includes fields that are actually used.
/// Serde ignores unknown fields from the API response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    /// Attachment ID.
    pub id: String,
    /// Attachment title/filename.
    pub title: String,
}

/// One page of the attachments listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsResponse {
    /// Attachments on this page of results.
    pub results: Vec<Attachment>,
    /// Pagination links; `next` is absent on the last page.
    #[serde(rename = "_links", default)]
    pub links: Links,
}

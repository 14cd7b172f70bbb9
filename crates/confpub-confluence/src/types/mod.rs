//! Confluence REST API types.

mod attachment;
mod page;
mod property;

pub use attachment::{Attachment, AttachmentsResponse};
pub use page::{Body, Links, Page, Storage, Version};
pub use property::ContentProperty;

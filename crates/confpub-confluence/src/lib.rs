//! Confluence integration for confpub.
//!
//! - [`ConfluenceClient`]: REST API client implementing the repository traits
//! - [`PageRepository`], [`AttachmentRepository`], [`PropertyStore`]: the
//!   remote capabilities a publish run needs
//! - [`Publisher`]: hash-based idempotent publishing of a whole project to
//!   one page

mod client;
mod error;
mod publisher;
mod repository;
pub mod types;

pub use client::{ConfluenceClient, EXPORT_HASH_PROPERTY};
pub use error::ConfluenceError;
pub use publisher::{
    PublishError, PublishOptions, PublishOutcome, PublishReport, Publisher, concatenate,
};
pub use repository::{AttachmentRepository, PageInfo, PageRepository, PropertyStore};

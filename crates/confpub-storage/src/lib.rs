//! Markdown to Confluence storage XHTML conversion.
//!
//! The pipeline runs in stages:
//! - [`markdown`]: parse into an [`MdNode`] tree and replace diagrams and
//!   images with `@@ATTACH` stubs ([`AttachmentStub`])
//! - pulldown-cmark renders the rewritten tree to HTML, which
//!   [`HtmlParser`] reads back into an [`HtmlNode`] tree
//! - [`transform`]: rewrite each node into storage format
//! - [`document`]: resolve stubs into `<ac:image>`, add the TOC macro and
//!   wrap everything in the namespaced root `<div>`
//!
//! # Example
//!
//! ```
//! use confpub_storage::StorageConverter;
//!
//! let result = StorageConverter::new("docs/images")
//!     .convert("![Logo](logo.png){width=120}\n\n~~old~~")
//!     .unwrap();
//! assert!(result.xhtml.contains(r#"<ri:attachment ri:filename="logo.png"/>"#));
//! ```

mod converter;
pub mod document;
mod error;
mod export;
pub mod html;
pub mod markdown;
mod stub;
pub mod transform;

pub use converter::{ConvertResult, StorageConverter};
pub use document::{TocOptions, TocPlacement};
pub use error::ConvertError;
pub use export::{export_hash, referenced_attachments};
pub use html::{HtmlNode, HtmlParser};
pub use markdown::{MdNode, Preprocessor};
pub use stub::{AttachmentStub, STUB_PATTERN};
pub use transform::{ImageSource, TransformContext};

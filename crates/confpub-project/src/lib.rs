//! Documentation project support for confpub.
//!
//! Detects Writerside (`writerside.cfg` + `*.tree`) and Authord
//! (`authord.config.json`) projects and resolves the order in which their
//! Markdown topics are concatenated for publishing.

mod authord;
mod error;
mod layout;
mod ordering;
mod toc;
mod writerside;

pub use error::ProjectError;
pub use layout::{ProjectKind, ProjectLayout};
pub use ordering::{OrderingResolver, ProjectOrdering, order_topics};
pub use toc::{TocElement, TocInstance};

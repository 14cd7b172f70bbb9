//! Diagram rendering for confpub.
//!
//! This crate turns diagram code blocks into PNG files that can be attached
//! to a Confluence page:
//! - [`DiagramRenderer`] is the rendering capability, implemented by
//!   [`KrokiRenderer`] (HTTP) and [`MermaidCliRenderer`] (local `mmdc`)
//! - [`ImageCache`] stores rendered PNGs under content hashes and
//!   materializes them into the project's image directory
//! - [`DiagramLanguage`] recognizes diagram fences (`mermaid`, `plantuml`, ...)
//!
//! # Example
//!
//! ```ignore
//! use confpub_diagrams::{DiagramLanguage, ImageCache, KrokiRenderer};
//!
//! let renderer = KrokiRenderer::new("https://kroki.io");
//! let cache = ImageCache::new(".confpub/diagrams", "docs/images");
//! if let Some(png) = cache.ensure_rendered(DiagramLanguage::Mermaid, "graph TD; A-->B", &renderer) {
//!     let filename = cache.materialize(&png)?;
//! }
//! ```

mod cache;
mod consts;
mod language;
mod png;
mod renderer;

pub use cache::{DiagramKey, ImageCache};
pub use language::DiagramLanguage;
pub use png::{PNG_MAGIC, is_png, is_png_file};
pub use renderer::{DiagramRenderer, KrokiRenderer, MermaidCliRenderer, RenderError};

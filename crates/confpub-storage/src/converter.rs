//! Markdown to Confluence storage XHTML pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use confpub_diagrams::{DiagramRenderer, ImageCache};
use pulldown_cmark::html;

use crate::document::{self, TocOptions};
use crate::error::ConvertError;
use crate::html::{HtmlParser, serialize};
use crate::markdown::{self, Preprocessor};
use crate::transform::{TransformContext, transform_children};

/// Result of converting Markdown to storage format.
#[derive(Clone, Debug)]
pub struct ConvertResult {
    /// Storage XHTML wrapped in the namespaced root `<div>`.
    pub xhtml: String,
    /// Non-fatal problems, such as diagrams that failed to render.
    pub warnings: Vec<String>,
}

/// Markdown to storage XHTML converter.
///
/// Without a diagram renderer, diagram code blocks stay code blocks.
pub struct StorageConverter {
    image_dir: PathBuf,
    diagrams: Option<(Arc<dyn DiagramRenderer>, ImageCache)>,
    toc: TocOptions,
}

impl StorageConverter {
    /// Create a converter resolving local images against `image_dir`.
    #[must_use]
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            diagrams: None,
            toc: TocOptions::default(),
        }
    }

    /// Render diagrams with `renderer`, caching PNGs in `cache_dir`.
    #[must_use]
    pub fn with_diagrams(mut self, renderer: Arc<dyn DiagramRenderer>, cache_dir: impl Into<PathBuf>) -> Self {
        let cache = ImageCache::new(cache_dir, self.image_dir.clone());
        self.diagrams = Some((renderer, cache));
        self
    }

    /// Set table of contents options.
    #[must_use]
    pub fn with_toc(mut self, toc: TocOptions) -> Self {
        self.toc = toc;
        self
    }

    /// Directory local images are read from and diagrams are written to.
    #[must_use]
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Convert Markdown to storage XHTML.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError` if the intermediate HTML cannot be parsed.
    pub fn convert(&self, markdown_text: &str) -> Result<ConvertResult, ConvertError> {
        let mut nodes = markdown::parse(markdown_text);

        let preprocessor = match &self.diagrams {
            Some((renderer, cache)) => Preprocessor::new().with_diagrams(renderer.as_ref(), cache),
            None => Preprocessor::new(),
        };
        let warnings = preprocessor.process(&mut nodes);
        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        let mut rendered = String::with_capacity(markdown_text.len() * 3 / 2);
        html::push_html(&mut rendered, markdown::flatten(nodes).into_iter());

        let mut tree = HtmlParser::new().parse(&rendered)?;
        let ctx = TransformContext::new(&self.image_dir);
        transform_children(&mut tree, &ctx);
        let root = document::finish(tree, &ctx, &self.toc);

        Ok(ConvertResult {
            xhtml: serialize(&[root.into()]),
            warnings,
        })
    }
}

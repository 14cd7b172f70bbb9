//! Content-addressed cache of rendered diagram PNGs.
//!
//! Rendered diagrams live in a cache directory named by the hash of their
//! source, and are materialized into the project's image directory on demand
//! so the publish step can upload them like any other image.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::consts::CACHE_HASH_LEN;
use crate::language::DiagramLanguage;
use crate::png::is_png_file;
use crate::renderer::DiagramRenderer;

/// Diagram parameters for cache key computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagramKey<'a> {
    /// Diagram kind (e.g., "mermaid", "plantuml").
    pub kind: &'a str,
    /// Diagram source code. Surrounding whitespace does not affect the hash.
    pub source: &'a str,
}

impl<'a> DiagramKey<'a> {
    /// Create a key for a diagram language and its source.
    #[must_use]
    pub fn new(language: DiagramLanguage, source: &'a str) -> Self {
        Self {
            kind: language.kroki_endpoint(),
            source,
        }
    }

    /// Compute a content hash for this diagram key.
    ///
    /// # Hash Format
    ///
    /// First 16 hex characters of SHA-256 of `"{kind}::{trimmed source}"`.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_bytes());
        hasher.update(b"::");
        hasher.update(self.source.trim().as_bytes());
        let mut hash = hex::encode(hasher.finalize());
        hash.truncate(CACHE_HASH_LEN);
        hash
    }

    /// Cache filename for this key.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}.png", self.compute_hash())
    }
}

/// Content-addressed image cache scoped to a single publish run.
#[derive(Debug)]
pub struct ImageCache {
    cache_dir: PathBuf,
    image_dir: PathBuf,
    materialized: Mutex<HashSet<String>>,
}

impl ImageCache {
    /// Create a cache rendering into `cache_dir` and materializing into `image_dir`.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            image_dir: image_dir.into(),
            materialized: Mutex::new(HashSet::new()),
        }
    }

    /// Directory holding cached PNGs.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory diagrams are materialized into.
    #[must_use]
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Cache path for a diagram. Does not render.
    #[must_use]
    pub fn resolve(&self, key: DiagramKey<'_>) -> PathBuf {
        self.cache_dir.join(key.filename())
    }

    /// Return the cached PNG for `key`, rendering it first when absent or corrupt.
    ///
    /// Returns `None` when rendering fails; the failure is logged and nothing
    /// is left behind in the cache.
    pub fn ensure_rendered(
        &self,
        language: DiagramLanguage,
        source: &str,
        renderer: &dyn DiagramRenderer,
    ) -> Option<PathBuf> {
        let key = DiagramKey::new(language, source);
        let path = self.resolve(key);

        if path.exists() {
            if is_png_file(&path) {
                tracing::debug!(path = %path.display(), "Diagram cache hit");
                return Some(path);
            }
            tracing::warn!(path = %path.display(), "Corrupt cached diagram, re-rendering");
            let _ = std::fs::remove_file(&path);
        }

        let data = match renderer.render(language, source.trim()) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(kind = key.kind, error = %e, "Diagram rendering failed");
                return None;
            }
        };

        if let Err(e) = self.store(&path, &data) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write diagram cache");
            let _ = std::fs::remove_file(&path);
            return None;
        }
        if !is_png_file(&path) {
            tracing::warn!(path = %path.display(), "Rendered diagram is not a valid PNG");
            let _ = std::fs::remove_file(&path);
            return None;
        }

        tracing::debug!(path = %path.display(), "Rendered diagram");
        Some(path)
    }

    /// Write via a temporary file and rename so readers never see a partial PNG.
    fn store(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        if let Err(e) = std::fs::write(&tmp, data).and_then(|()| std::fs::rename(&tmp, path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }

    /// Place a cached PNG into the image directory, returning its bare filename.
    ///
    /// Hard-links when possible and copies otherwise. Each filename is
    /// materialized at most once per cache instance; a stale destination file
    /// is replaced.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the image directory cannot be created or the
    /// file cannot be linked or copied.
    pub fn materialize(&self, cached: &Path) -> io::Result<String> {
        let filename = cached
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid cache path"))?
            .to_owned();

        let mut done = self
            .materialized
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if done.contains(&filename) {
            return Ok(filename);
        }

        std::fs::create_dir_all(&self.image_dir)?;
        let dest = self.image_dir.join(&filename);
        if dest.exists() {
            std::fs::remove_file(&dest)?;
        }
        if std::fs::hard_link(cached, &dest).is_err() {
            std::fs::copy(cached, &dest)?;
        }

        done.insert(filename.clone());
        Ok(filename)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::png::tests::fake_png;
    use crate::renderer::RenderError;
    use tempfile::TempDir;

    /// Renderer that counts calls and returns a fixed payload.
    struct CountingRenderer {
        calls: AtomicUsize,
        output: Option<Vec<u8>>,
    }

    impl CountingRenderer {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                output: Some(fake_png(10, 10)),
            }
        }

        fn returning(output: Vec<u8>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                output: Some(output),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                output: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DiagramRenderer for CountingRenderer {
        fn supports(&self, _language: DiagramLanguage) -> bool {
            true
        }

        fn render(&self, _language: DiagramLanguage, _source: &str) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output.clone().ok_or(RenderError::InvalidPng)
        }
    }

    fn setup() -> (TempDir, ImageCache) {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path().join("cache"), tmp.path().join("images"));
        (tmp, cache)
    }

    #[test]
    fn test_diagram_key_hash() {
        let key1 = DiagramKey::new(DiagramLanguage::Mermaid, "graph TD; A-->B");
        let key2 = DiagramKey::new(DiagramLanguage::Mermaid, "\n  graph TD; A-->B\n\n");
        let key3 = DiagramKey::new(DiagramLanguage::Mermaid, "graph TD; C-->D");
        let key4 = DiagramKey::new(DiagramLanguage::GraphViz, "graph TD; A-->B");

        assert_eq!(key1.compute_hash(), key2.compute_hash());
        assert_ne!(key1.compute_hash(), key3.compute_hash());
        assert_ne!(key1.compute_hash(), key4.compute_hash());
        assert_eq!(key1.compute_hash().len(), 16);
        assert!(key1.compute_hash().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_diagram_key_hash_matches_digest() {
        let key = DiagramKey {
            kind: "mermaid",
            source: "a",
        };
        let expected = hex::encode(Sha256::digest(b"mermaid::a"));
        assert_eq!(key.compute_hash(), expected[..16]);
        assert_eq!(key.filename(), format!("{}.png", &expected[..16]));
    }

    #[test]
    fn test_resolve_does_not_render() {
        let (_tmp, cache) = setup();
        let key = DiagramKey::new(DiagramLanguage::Mermaid, "graph TD; A-->B");
        let path = cache.resolve(key);
        assert_eq!(path, cache.cache_dir().join(key.filename()));
        assert!(!path.exists());
    }

    #[test]
    fn test_second_call_hits_cache() {
        let (_tmp, cache) = setup();
        let renderer = CountingRenderer::ok();

        let first = cache
            .ensure_rendered(DiagramLanguage::Mermaid, "graph TD; A-->B", &renderer)
            .unwrap();
        let second = cache
            .ensure_rendered(DiagramLanguage::Mermaid, "graph TD; A-->B", &renderer)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(renderer.calls(), 1);
    }

    #[test]
    fn test_corrupt_cache_entry_is_regenerated() {
        let (_tmp, cache) = setup();
        let renderer = CountingRenderer::ok();
        let source = "graph TD; A-->B";
        let path = cache.resolve(DiagramKey::new(DiagramLanguage::Mermaid, source));
        std::fs::create_dir_all(cache.cache_dir()).unwrap();
        std::fs::write(&path, b"garbage").unwrap();

        let result = cache
            .ensure_rendered(DiagramLanguage::Mermaid, source, &renderer)
            .unwrap();

        assert_eq!(result, path);
        assert_eq!(renderer.calls(), 1);
        assert!(is_png_file(&path));
    }

    #[test]
    fn test_render_failure_leaves_no_file() {
        let (_tmp, cache) = setup();
        let renderer = CountingRenderer::failing();
        let source = "graph TD; A-->";

        assert!(
            cache
                .ensure_rendered(DiagramLanguage::Mermaid, source, &renderer)
                .is_none()
        );
        let path = cache.resolve(DiagramKey::new(DiagramLanguage::Mermaid, source));
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_render_output_is_discarded() {
        let (_tmp, cache) = setup();
        let renderer = CountingRenderer::returning(b"<svg/>".to_vec());
        let source = "graph TD; A-->B";

        assert!(
            cache
                .ensure_rendered(DiagramLanguage::Mermaid, source, &renderer)
                .is_none()
        );
        assert!(
            !cache
                .resolve(DiagramKey::new(DiagramLanguage::Mermaid, source))
                .exists()
        );
    }

    #[test]
    fn test_materialize_once_and_replaces_stale() {
        let (_tmp, cache) = setup();
        let renderer = CountingRenderer::ok();
        let cached = cache
            .ensure_rendered(DiagramLanguage::Mermaid, "graph TD; A-->B", &renderer)
            .unwrap();

        std::fs::create_dir_all(cache.image_dir()).unwrap();
        let filename = cached.file_name().unwrap().to_str().unwrap().to_owned();
        std::fs::write(cache.image_dir().join(&filename), b"stale").unwrap();

        let name = cache.materialize(&cached).unwrap();
        assert_eq!(name, filename);
        assert!(is_png_file(&cache.image_dir().join(&name)));

        // Second call is a no-op even if the destination changed meanwhile.
        std::fs::write(cache.image_dir().join(&name), b"changed").unwrap();
        assert_eq!(cache.materialize(&cached).unwrap(), name);
        assert_eq!(
            std::fs::read(cache.image_dir().join(&name)).unwrap(),
            b"changed"
        );
    }
}

//! PNG signature checks.

use std::path::Path;

/// The 8-byte PNG file signature.
pub const PNG_MAGIC: [u8; 8] = *b"\x89PNG\r\n\x1a\n";

/// Check whether a byte buffer starts with the PNG signature.
#[must_use]
pub fn is_png(data: &[u8]) -> bool {
    data.len() >= PNG_MAGIC.len() && data[..PNG_MAGIC.len()] == PNG_MAGIC
}

/// Check whether a file on disk starts with the PNG signature.
///
/// Missing or unreadable files are reported as invalid.
#[must_use]
pub fn is_png_file(path: &Path) -> bool {
    use std::io::Read;

    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let mut header = [0u8; 8];
    file.read_exact(&mut header).is_ok() && header == PNG_MAGIC
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal PNG header with IHDR dimensions, enough for signature checks.
    pub(crate) fn fake_png(width: u32, height: u32) -> Vec<u8> {
        let mut data = PNG_MAGIC.to_vec();
        data.extend_from_slice(&[0, 0, 0, 13]);
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    #[test]
    fn test_is_png() {
        assert!(is_png(&fake_png(1, 1)));
        assert!(!is_png(b"\x89PNG"));
        assert!(!is_png(b"<svg></svg>"));
        assert!(!is_png(&[]));
    }

    #[test]
    fn test_is_png_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        std::fs::write(&good, fake_png(2, 2)).unwrap();
        std::fs::write(&bad, b"GIF89a").unwrap();

        assert!(is_png_file(&good));
        assert!(!is_png_file(&bad));
        assert!(!is_png_file(&dir.path().join("missing.png")));
    }
}

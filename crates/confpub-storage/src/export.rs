//! Content hashing and attachment references of finished storage XHTML.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

static ATTACHMENT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ri:filename="([^"]*)""#).expect("invalid attachment reference regex")
});

/// Lowercase hex SHA-256 of the XHTML bytes.
#[must_use]
pub fn export_hash(xhtml: &str) -> String {
    hex::encode(Sha256::digest(xhtml.as_bytes()))
}

/// Every attachment filename referenced by `ri:filename`, XML-unescaped.
#[must_use]
pub fn referenced_attachments(xhtml: &str) -> BTreeSet<String> {
    ATTACHMENT_REF
        .captures_iter(xhtml)
        .map(|caps| {
            let raw = &caps[1];
            quick_xml::escape::unescape(raw).map_or_else(|_| raw.to_owned(), |s| s.into_owned())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_hash() {
        assert_eq!(
            export_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(export_hash("<p>x</p>"), export_hash("<p>x</p>"));
        assert_ne!(export_hash("<p>x</p>"), export_hash("<p>y</p>"));
    }

    #[test]
    fn test_referenced_attachments() {
        let xhtml = r#"<ac:image><ri:attachment ri:filename="b.png"/></ac:image><ac:image><ri:attachment ri:filename="a&amp;b.png"/></ac:image><ac:image><ri:attachment ri:filename="b.png"/></ac:image><ri:url ri:value="https://x/y.png"/>"#;
        let names: Vec<_> = referenced_attachments(xhtml).into_iter().collect();
        assert_eq!(names, ["a&b.png", "b.png"]);
    }
}

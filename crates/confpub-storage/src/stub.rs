//! Attachment stub markers.
//!
//! The Markdown preprocessor replaces images and rendered diagrams with a
//! textual marker `@@ATTACH|file=<name>[|key=value[;key=value...]]@@`. The
//! marker survives the Markdown to HTML conversion as plain text and is
//! resolved into an `<ac:image>` element afterwards.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::markdown::normalize_dimension;

/// Stub marker pattern. Group 1 holds the pipe-delimited body.
pub static STUB_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@ATTACH\|(.*?)@@").expect("invalid stub regex"));

const PREFIX: &str = "@@ATTACH|";
const SUFFIX: &str = "@@";

/// A parsed attachment stub.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttachmentStub {
    /// Attachment filename (basename only).
    pub file: String,
    /// Display width in pixels.
    pub width: Option<u32>,
    /// Display height in pixels.
    pub height: Option<u32>,
    /// Any other parameters, in order.
    pub params: Vec<(String, String)>,
}

impl AttachmentStub {
    /// Create a stub for `file` without parameters.
    #[must_use]
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// Set display dimensions.
    #[must_use]
    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Parse a complete `@@ATTACH|...@@` marker.
    #[must_use]
    pub fn parse(marker: &str) -> Option<Self> {
        let body = marker.trim().strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
        Self::parse_body(body)
    }

    /// Parse the part between `@@ATTACH|` and the closing `@@`.
    ///
    /// Dimension values are normalized like element attributes; invalid
    /// ones are dropped.
    #[must_use]
    pub fn parse_body(body: &str) -> Option<Self> {
        let mut segments = body.split('|');
        let file = segments.next()?.trim().strip_prefix("file=")?.trim();
        if file.is_empty() {
            return None;
        }

        let mut stub = Self::new(file);
        for pair in segments.flat_map(|s| s.split(';')) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "width" => stub.width = normalize_dimension(value),
                "height" => stub.height = normalize_dimension(value),
                "" => {}
                _ => stub.params.push((key.to_owned(), value.to_owned())),
            }
        }
        Some(stub)
    }
}

impl fmt::Display for AttachmentStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}file={}", self.file)?;

        let mut params = Vec::new();
        if let Some(width) = self.width {
            params.push(format!("width={width}"));
        }
        if let Some(height) = self.height {
            params.push(format!("height={height}"));
        }
        params.extend(self.params.iter().map(|(k, v)| format!("{k}={v}")));

        if !params.is_empty() {
            write!(f, "|{}", params.join(";"))?;
        }
        f.write_str(SUFFIX)
    }
}

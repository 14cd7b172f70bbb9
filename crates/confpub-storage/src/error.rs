//! Error types for storage conversion.

/// Error while converting Markdown to storage XHTML.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// Rendered HTML could not be parsed.
    #[error("HTML parse error")]
    Parse(#[from] quick_xml::Error),

    /// Attribute syntax error in rendered HTML.
    #[error("HTML attribute error")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during HTML parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

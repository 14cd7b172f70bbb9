//! Small hand-written tokenizers for image hints.
//!
//! These scan only what the preprocessor needs (dimension hints and `<img>`
//! attributes) and tolerate malformed input instead of failing.

use std::ops::Range;

/// Dimensions parsed from one or more leading `{...}` groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BraceParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Byte length of the consumed prefix.
    pub consumed: usize,
}

/// An `<img>` tag found in an HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImgTag {
    pub src: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Byte range of the whole tag within the scanned fragment.
    pub span: Range<usize>,
}

/// Normalize a dimension value: trim, drop a trailing `px`, digits only.
#[must_use]
pub fn normalize_dimension(value: &str) -> Option<u32> {
    let value = value.trim();
    let value = value
        .strip_suffix("px")
        .or_else(|| value.strip_suffix("PX"))
        .unwrap_or(value)
        .trim_end();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Parse leading `{key=value ...}` attribute groups, e.g. `{ width=290 }{height="80px"}`.
///
/// Pairs may be separated by whitespace, `;` or `,` and values may be quoted.
/// Only `width` and `height` are kept. Returns `None` when the text does not
/// start with a complete group.
#[must_use]
pub fn parse_brace_params(text: &str) -> Option<BraceParams> {
    let mut params = BraceParams::default();
    let mut pos = 0;

    loop {
        let rest = &text[pos..];
        let skipped = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        let Some(group) = rest[skipped..].strip_prefix('{') else {
            break;
        };
        let Some(close) = group.find('}') else {
            break;
        };

        for (key, value) in key_values(&group[..close]) {
            match key.to_ascii_lowercase().as_str() {
                "width" => params.width = normalize_dimension(&value),
                "height" => params.height = normalize_dimension(&value),
                _ => {}
            }
        }
        pos += skipped + 1 + close + 1;
        params.consumed = pos;
    }

    (params.consumed > 0).then_some(params)
}

/// Split the inside of a brace group into key/value pairs.
fn key_values(body: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() || c == ';' || c == ',' {
            chars.next();
            continue;
        }
        let mut key_end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c == '=' || c.is_whitespace() || c == ';' || c == ',' {
                break;
            }
            key_end = i + c.len_utf8();
            chars.next();
        }
        let key = &body[start..key_end];
        if chars.peek().map(|&(_, c)| c) != Some('=') {
            continue;
        }
        chars.next();

        let mut value = String::new();
        match chars.peek().map(|&(_, c)| c) {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                for (_, c) in chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
            _ => {
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || c == ';' || c == ',' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        if !key.is_empty() {
            pairs.push((key.to_owned(), value));
        }
    }
    pairs
}

/// Find the first `<img ...>` tag in `html` and extract `src`, `width` and `height`.
///
/// Accepts double, single or missing quotes; an unterminated quoted value
/// ends at the closing `>`. Returns `None` when there is no complete tag.
#[must_use]
pub fn extract_img_attrs(html: &str) -> Option<ImgTag> {
    let lower = html.to_ascii_lowercase();
    let mut search = 0;
    let start = loop {
        let found = search + lower[search..].find("<img")?;
        let next = lower.as_bytes().get(found + 4).copied();
        if matches!(next, Some(b) if b.is_ascii_whitespace() || b == b'/' || b == b'>') {
            break found;
        }
        search = found + 4;
    };

    let bytes = html.as_bytes();
    let mut tag = ImgTag {
        src: None,
        width: None,
        height: None,
        span: start..start,
    };
    let mut i = start + 4;

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => {
                tag.span = start..i + 1;
                return Some(tag);
            }
            Some(_) => {}
        }

        let name_start = i;
        while i < bytes.len() && !matches!(bytes[i], b'=' | b'>' | b'/') && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let name = lower[name_start..i].to_owned();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = match bytes.get(i) {
            Some(&quote @ (b'"' | b'\'')) => {
                let value_start = i + 1;
                let close = html[value_start..].find(char::from(quote)).map(|p| value_start + p);
                let gt = html[value_start..].find('>').map(|p| value_start + p);
                match (close, gt) {
                    // Missing closing quote: the value runs to the end of the tag.
                    (Some(c), Some(g)) if g < c && !html[value_start..g].contains('=') => {
                        i = g;
                        &html[value_start..g]
                    }
                    (Some(c), _) => {
                        i = c + 1;
                        &html[value_start..c]
                    }
                    (None, Some(g)) => {
                        i = g;
                        &html[value_start..g]
                    }
                    (None, None) => return None,
                }
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && bytes[i] != b'>' && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let raw = &html[value_start..i];
                // `src=a.png/>`: the slash belongs to the tag.
                if bytes.get(i) == Some(&b'>') {
                    raw.strip_suffix('/').unwrap_or(raw)
                } else {
                    raw
                }
            }
        };

        match name.as_str() {
            "src" => tag.src = Some(value.trim().to_owned()),
            "width" => tag.width = normalize_dimension(value),
            "height" => tag.height = normalize_dimension(value),
            _ => {}
        }
    }
}

/// Whether a URL points outside the project (and is therefore not an attachment).
#[must_use]
pub fn is_external_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || lower.starts_with("data:")
}

/// Bare filename of an image reference: query and fragment stripped, basename taken.
#[must_use]
pub fn attachment_filename(src: &str) -> &str {
    let path = src.trim();
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

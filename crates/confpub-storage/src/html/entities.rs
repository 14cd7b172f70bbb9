//! Entity handling for HTML fed into the XML parser and for serialized output.
//!
//! HTML named entities are not defined in XML, so they are converted to their
//! Unicode characters before parsing. Bare ampersands (not part of an entity
//! or character reference) and `<` that cannot open markup are escaped so the
//! result is well-formed XML.

use std::sync::LazyLock;

use regex::Regex;

/// Named HTML entity reference.
static NAMED_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// Entity or character reference starting right after an `&`.
static REFERENCE_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9]*|#[0-9]+|#[xX][0-9a-fA-F]+);")
        .expect("invalid reference regex")
});

/// HTML entities outside the XML predefined set, sorted by name.
const HTML_ENTITIES: &[(&str, char)] = &[
    ("Dagger", '\u{2021}'),
    ("acute", '\u{00b4}'),
    ("bull", '\u{2022}'),
    ("cedil", '\u{00b8}'),
    ("cent", '\u{00a2}'),
    ("copy", '\u{00a9}'),
    ("dagger", '\u{2020}'),
    ("darr", '\u{2193}'),
    ("deg", '\u{00b0}'),
    ("divide", '\u{00f7}'),
    ("emsp", '\u{2003}'),
    ("ensp", '\u{2002}'),
    ("euro", '\u{20ac}'),
    ("frac12", '\u{00bd}'),
    ("frac14", '\u{00bc}'),
    ("frac34", '\u{00be}'),
    ("ge", '\u{2265}'),
    ("harr", '\u{2194}'),
    ("hellip", '\u{2026}'),
    ("iexcl", '\u{00a1}'),
    ("iquest", '\u{00bf}'),
    ("laquo", '\u{00ab}'),
    ("larr", '\u{2190}'),
    ("ldquo", '\u{201c}'),
    ("le", '\u{2264}'),
    ("lsquo", '\u{2018}'),
    ("mdash", '\u{2014}'),
    ("micro", '\u{00b5}'),
    ("middot", '\u{00b7}'),
    ("nbsp", '\u{00a0}'),
    ("ndash", '\u{2013}'),
    ("ne", '\u{2260}'),
    ("ordf", '\u{00aa}'),
    ("ordm", '\u{00ba}'),
    ("para", '\u{00b6}'),
    ("plusmn", '\u{00b1}'),
    ("pound", '\u{00a3}'),
    ("raquo", '\u{00bb}'),
    ("rarr", '\u{2192}'),
    ("rdquo", '\u{201d}'),
    ("reg", '\u{00ae}'),
    ("rsquo", '\u{2019}'),
    ("sect", '\u{00a7}'),
    ("shy", '\u{00ad}'),
    ("sup1", '\u{00b9}'),
    ("sup2", '\u{00b2}'),
    ("sup3", '\u{00b3}'),
    ("thinsp", '\u{2009}'),
    ("times", '\u{00d7}'),
    ("trade", '\u{2122}'),
    ("uarr", '\u{2191}'),
    ("yen", '\u{00a5}'),
];

fn lookup(name: &str) -> Option<char> {
    HTML_ENTITIES
        .binary_search_by(|(n, _)| (*n).cmp(name))
        .ok()
        .map(|i| HTML_ENTITIES[i].1)
}

/// Convert HTML named entities to Unicode characters.
///
/// XML predefined entities (`amp`, `lt`, `gt`, `quot`, `apos`) and unknown
/// names are left unchanged.
pub fn convert_html_entities(html: &str) -> String {
    NAMED_ENTITY
        .replace_all(html, |caps: &regex::Captures| {
            lookup(&caps[1]).map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}

/// Escape every `&` that does not start a named entity or numeric character reference.
pub fn escape_bare_ampersands(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        if REFERENCE_TAIL.is_match(tail) {
            out.push('&');
        } else {
            out.push_str("&amp;");
        }
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// Elements whose body is raw text in HTML.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Escape every `<` that does not open complete markup.
///
/// A `<` counts as markup when it starts a tag (`<name` or `</name`) closed
/// by a `>` outside quotes, or a comment, CDATA section, declaration or
/// processing instruction with its terminator present. Anything else,
/// including an unterminated `<!--`, becomes `&lt;`. The bodies of
/// `script` and `style` elements are kept as text.
pub fn escape_bare_angles(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let Some(len) = markup_len(tail) else {
            out.push_str("&lt;");
            rest = &tail[1..];
            continue;
        };
        let markup = &tail[..len];
        out.push_str(markup);
        rest = &tail[len..];

        if let Some(name) = raw_text_element(markup) {
            let close = format!("</{name}");
            let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
            out.push_str(&rest[..end].replace('<', "&lt;"));
            rest = &rest[end..];
        }
    }
    out.push_str(rest);
    out
}

/// Byte length of the markup starting at `tail[0] == '<'`, if it is complete.
fn markup_len(tail: &str) -> Option<usize> {
    let terminated = |open: &str, close: &str| {
        tail.strip_prefix(open)
            .map(|body| body.find(close).map(|i| open.len() + i + close.len()))
    };
    if let Some(len) = terminated("<!--", "-->") {
        return len;
    }
    if let Some(len) = terminated("<![CDATA[", "]]>") {
        return len;
    }
    if let Some(len) = terminated("<?", "?>") {
        return len;
    }
    if let Some(len) = terminated("<!", ">") {
        return len;
    }

    let name = tail[1..].strip_prefix('/').unwrap_or(&tail[1..]);
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut quote = None;
    for (i, c) in tail.char_indices().skip(1) {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Name of a `script` or `style` start tag that has a body.
fn raw_text_element(markup: &str) -> Option<&'static str> {
    if markup.ends_with("/>") {
        return None;
    }
    let name: String = markup
        .strip_prefix('<')?
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    RAW_TEXT_ELEMENTS.iter().copied().find(|el| *el == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(HTML_ENTITIES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_convert_named_entities() {
        assert_eq!(
            convert_html_entities("&copy; 2024&nbsp;&mdash; Docs"),
            "\u{00a9} 2024\u{00a0}\u{2014} Docs"
        );
    }

    #[test]
    fn test_preserve_xml_and_unknown_entities() {
        assert_eq!(convert_html_entities("&amp;&lt;&gt;"), "&amp;&lt;&gt;");
        assert_eq!(convert_html_entities("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_escape_bare_ampersands() {
        assert_eq!(escape_bare_ampersands("AT&T"), "AT&amp;T");
        assert_eq!(escape_bare_ampersands("a && b"), "a &amp;&amp; b");
        assert_eq!(escape_bare_ampersands("x & y;"), "x &amp; y;");
        assert_eq!(escape_bare_ampersands("trailing &"), "trailing &amp;");
    }

    #[test]
    fn test_escape_keeps_references() {
        let input = "&amp; &lt; &#160; &#x2014; &nbsp;";
        assert_eq!(escape_bare_ampersands(input), input);
        assert_eq!(escape_bare_ampersands("&#xZZ;"), "&amp;#xZZ;");
    }

    #[test]
    fn test_escape_bare_angles_keeps_markup() {
        let input = r#"<p class="a>b">x</p><!-- c --><br/><![CDATA[d]]><!DOCTYPE html>"#;
        assert_eq!(escape_bare_angles(input), input);
    }

    #[test]
    fn test_escape_bare_angles_in_text() {
        assert_eq!(
            escape_bare_angles("<div>\nif a < b then\n</div>"),
            "<div>\nif a &lt; b then\n</div>"
        );
        assert_eq!(escape_bare_angles("1 <2 and x<= y"), "1 &lt;2 and x&lt;= y");
        assert_eq!(escape_bare_angles("</ 3"), "&lt;/ 3");
    }

    #[test]
    fn test_escape_unterminated_markup() {
        assert_eq!(escape_bare_angles("<!-- draft"), "&lt;!-- draft");
        assert_eq!(escape_bare_angles("text <span title=\"x"), "text &lt;span title=\"x");
        assert_eq!(escape_bare_angles("<? pi"), "&lt;? pi");
    }

    #[test]
    fn test_script_and_style_bodies_are_text() {
        assert_eq!(
            escape_bare_angles("<script>if (a<b) {}</script><p>x</p>"),
            "<script>if (a&lt;b) {}</script><p>x</p>"
        );
        assert_eq!(
            escape_bare_angles("<STYLE>a<b{}</STYLE>"),
            "<STYLE>a&lt;b{}</STYLE>"
        );
        assert_eq!(escape_bare_angles("<script src=\"x.js\"/>a<b"), "<script src=\"x.js\"/>a&lt;b");
    }
}

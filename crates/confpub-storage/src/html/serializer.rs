//! Storage XHTML serializer.

use std::fmt::Write;

use super::entities::escape_bare_ampersands;
use super::node::{AttrValue, Element, HtmlNode};

/// Serialize nodes to an XHTML string.
///
/// Attributes are double-quoted; self-closing and childless elements are
/// written as `<tag/>`. The result never contains a bare `&`.
pub fn serialize(nodes: &[HtmlNode]) -> String {
    let mut out = String::with_capacity(4096);
    for node in nodes {
        serialize_node(node, &mut out);
    }
    escape_bare_ampersands(&out)
}

fn serialize_node(node: &HtmlNode, out: &mut String) {
    match node {
        HtmlNode::Text(text) => out.push_str(&escape_text(text)),
        HtmlNode::Element(el) => serialize_element(el, out),
    }
}

fn serialize_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);

    for (key, value) in &el.attrs {
        let value = match value {
            AttrValue::Str(s) => s.clone(),
            AttrValue::Tokens(tokens) if !tokens.is_empty() => tokens.join(" "),
            AttrValue::Bool(true) => key.clone(),
            AttrValue::Tokens(_) | AttrValue::Bool(false) | AttrValue::Null => continue,
        };
        write!(out, r#" {key}="{}""#, escape_attr(&value)).unwrap();
    }

    if el.self_closing || el.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &el.children {
        serialize_node(child, out);
    }
    write!(out, "</{}>", el.tag).unwrap();
}

/// Escape text for XML content.
fn escape_text(text: &str) -> String {
    escape_xml(text, false)
}

/// Escape text for XML attribute values.
fn escape_attr(text: &str) -> String {
    escape_xml(text, true)
}

fn escape_xml(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_nested() {
        let p = Element::new("p").with_children(vec![
            Element::new("strong")
                .with_children(vec![HtmlNode::text("Bold")])
                .into(),
            HtmlNode::text(" text"),
        ]);
        assert_eq!(serialize(&[p.into()]), "<p><strong>Bold</strong> text</p>");
    }

    #[test]
    fn test_serialize_self_closing() {
        let br = Element::new("br").self_closed();
        let attachment = Element::new("ri:attachment").with_attr("ri:filename", "a.png");
        assert_eq!(
            serialize(&[br.into(), attachment.into()]),
            r#"<br/><ri:attachment ri:filename="a.png"/>"#
        );
    }

    #[test]
    fn test_escape_special_chars() {
        let p = Element::new("p")
            .with_attr("title", r#"say "hi" & <go>"#)
            .with_children(vec![HtmlNode::text("a < b & c > d")]);
        assert_eq!(
            serialize(&[p.into()]),
            r#"<p title="say &quot;hi&quot; &amp; &lt;go&gt;">a &lt; b &amp; c &gt; d</p>"#
        );
    }

    #[test]
    fn test_attribute_values() {
        let el = Element::new("td")
            .with_attr("class", AttrValue::Tokens(vec!["a".to_owned(), "b".to_owned()]))
            .with_attr("hidden", AttrValue::Bool(true))
            .with_attr("gone", AttrValue::Null)
            .with_attr("off", AttrValue::Bool(false))
            .with_attr("empty-class", AttrValue::Tokens(Vec::new()))
            .with_children(vec![HtmlNode::text("x")]);
        assert_eq!(
            serialize(&[el.into()]),
            r#"<td class="a b" hidden="hidden">x</td>"#
        );
    }
}

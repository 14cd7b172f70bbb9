//! Lenient HTML parser built on quick-xml.
//!
//! The input is HTML as produced by pulldown-cmark, possibly with raw HTML
//! passed through from the Markdown source. It is not required to be
//! well-formed XML: void tags may be left open, attributes may be unquoted
//! or valueless, and end tags may be missing or stray.

#![allow(clippy::unused_self)] // Unit struct methods have &self for API consistency

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::entities::{convert_html_entities, escape_bare_ampersands, escape_bare_angles};
use super::node::{AttrValue, Element, HtmlNode, is_void};
use crate::error::ConvertError;

/// Bottom of the open-element stack; never part of the input.
const ROOT_TAG: &str = "#root";

/// Parse an HTML fragment into a list of [`HtmlNode`]s.
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML fragment.
    ///
    /// Named HTML entities are converted to Unicode, and bare ampersands and
    /// `<` that cannot open markup are escaped before parsing. Elements left
    /// open at the end of input are closed implicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup cannot be tokenized.
    pub fn parse(&self, html: &str) -> Result<Vec<HtmlNode>, ConvertError> {
        let html = escape_bare_angles(&escape_bare_ampersands(&convert_html_entities(html)));

        let mut reader = Reader::from_str(&html);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut stack = vec![Element::new(ROOT_TAG)];
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let el = self.decode_element(&reader, &e)?;
                    if is_void(&el.tag) {
                        push_child(&mut stack, el.into());
                    } else {
                        stack.push(el);
                    }
                }
                Event::Empty(e) => {
                    let el = self.decode_element(&reader, &e)?;
                    push_child(&mut stack, el.into());
                }
                Event::Text(e) => {
                    let text = reader.decoder().decode(&e)?;
                    append_text(&mut stack, &text);
                }
                Event::GeneralRef(e) => {
                    let entity = reader.decoder().decode(&e)?;
                    append_text(&mut stack, &decode_entity(&entity));
                }
                Event::CData(e) => {
                    append_text(&mut stack, &String::from_utf8_lossy(&e));
                }
                Event::End(e) => {
                    let tag = decode_name(&reader, e.name().as_ref());
                    // Close up to the nearest matching open element; stray ends are ignored.
                    if let Some(pos) = stack.iter().rposition(|el| el.tag == tag) {
                        close_to(&mut stack, pos.max(1));
                    }
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
            buf.clear();
        }

        close_to(&mut stack, 1);
        Ok(stack.pop().map(|root| root.children).unwrap_or_default())
    }

    fn decode_element(
        &self,
        reader: &Reader<&[u8]>,
        e: &BytesStart,
    ) -> Result<Element, ConvertError> {
        let mut el = Element::new(decode_name(reader, e.name().as_ref()));
        for attr in e.html_attributes().with_checks(false) {
            let attr = attr?;
            let key = decode_name(reader, attr.key.as_ref());
            if key.starts_with("xmlns") {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned(), Cow::into_owned);
            let value = if key == "class" {
                AttrValue::Tokens(value.split_whitespace().map(str::to_owned).collect())
            } else {
                AttrValue::Str(value)
            };
            el.attrs.push((key, value));
        }
        Ok(el)
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a tag or attribute name, lowercasing plain HTML names.
fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    let name = reader
        .decoder()
        .decode(name)
        .map_or_else(|_| String::from_utf8_lossy(name).into_owned(), Cow::into_owned);
    if name.contains(':') {
        name
    } else {
        name.to_ascii_lowercase()
    }
}

/// Pop open elements until `depth` elements remain, attaching each to its parent.
fn close_to(stack: &mut Vec<Element>, depth: usize) {
    while stack.len() > depth {
        if let Some(el) = stack.pop() {
            push_child(stack, el.into());
        }
    }
}

fn push_child(stack: &mut [Element], node: HtmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Append text to the current element, merging with a preceding text node.
fn append_text(stack: &mut [Element], text: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(HtmlNode::Text(last)) = parent.children.last_mut() {
        last.push_str(text);
    } else {
        parent.children.push(HtmlNode::text(text));
    }
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        // Unknown entity - preserve as text
        _ => format!("&{entity};"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Vec<HtmlNode> {
        HtmlParser::new().parse(html).unwrap()
    }

    fn element(node: &HtmlNode) -> &Element {
        node.as_element().expect("expected element")
    }

    #[test]
    fn test_parse_nested_elements() {
        let nodes = parse("<p><strong>Bold</strong> text</p>");
        assert_eq!(nodes.len(), 1);
        let p = element(&nodes[0]);
        assert_eq!(p.tag, "p");
        assert_eq!(p.children.len(), 2);
        assert!(p.children[0].is_element("strong"));
        assert_eq!(p.children[1], HtmlNode::text(" text"));
    }

    #[test]
    fn test_entities_decoded() {
        let nodes = parse("<p>a &lt; b &amp; c&nbsp;d &#169;</p>");
        assert_eq!(nodes[0].text_content(), "a < b & c\u{00a0}d \u{00a9}");
    }

    #[test]
    fn test_bare_ampersand_in_raw_html() {
        let nodes = parse("<div>AT&T</div>");
        assert_eq!(nodes[0].text_content(), "AT&T");
    }

    #[test]
    fn test_unclosed_void_elements() {
        let nodes = parse("<p>one<br>two<img src=\"a.png\">three</p>");
        let p = element(&nodes[0]);
        assert_eq!(p.children.len(), 5);
        assert!(p.children[1].is_element("br"));
        let img = element(&p.children[3]);
        assert_eq!(img.attr_str("src").as_deref(), Some("a.png"));
        assert!(img.children.is_empty());
        assert_eq!(p.children[4], HtmlNode::text("three"));
    }

    #[test]
    fn test_html_style_attributes() {
        let nodes = parse(r#"<input type=checkbox checked disabled="">"#);
        let input = element(&nodes[0]);
        assert_eq!(input.attr_str("type").as_deref(), Some("checkbox"));
        assert_eq!(input.attr_str("checked").as_deref(), Some(""));
        assert_eq!(input.attr_str("disabled").as_deref(), Some(""));
    }

    #[test]
    fn test_class_parsed_into_tokens() {
        let nodes = parse(r#"<ul class="contains-task-list  extra"></ul>"#);
        assert_eq!(
            element(&nodes[0]).attr("class"),
            Some(&AttrValue::Tokens(vec![
                "contains-task-list".to_owned(),
                "extra".to_owned()
            ]))
        );
    }

    #[test]
    fn test_missing_end_tags_closed_by_ancestor() {
        let nodes = parse("<div><p>unclosed</div><p>after</p>");
        assert_eq!(nodes.len(), 2);
        let div = element(&nodes[0]);
        assert!(div.children[0].is_element("p"));
        assert_eq!(nodes[1].text_content(), "after");
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let nodes = parse("<p>text</span></p>");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text_content(), "text");
    }

    #[test]
    fn test_namespaced_tags_kept() {
        let nodes = parse(r#"<ac:structured-macro ac:name="toc"></ac:structured-macro>"#);
        let el = element(&nodes[0]);
        assert_eq!(el.tag, "ac:structured-macro");
        assert_eq!(el.attr_str("ac:name").as_deref(), Some("toc"));
    }

    #[test]
    fn test_uppercase_tags_lowercased() {
        let nodes = parse("<P>Hi</P>");
        assert!(nodes[0].is_element("p"));
    }

    #[test]
    fn test_comments_dropped() {
        let nodes = parse("<!-- note --><p>x</p>");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_fragment_has_no_wrapper() {
        let nodes = parse("<p>x</p>");
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_element("p"));
        assert_eq!(parse("plain"), vec![HtmlNode::text("plain")]);
    }

    #[test]
    fn test_unclosed_comment_kept_as_text() {
        let nodes = parse("<p>x</p>\n<!-- draft");
        assert!(nodes[0].is_element("p"));
        assert_eq!(nodes.last().unwrap().text_content(), "\n<!-- draft");
    }

    #[test]
    fn test_bare_less_than_in_raw_html() {
        let nodes = parse("<div>\nif a < b then\n</div>");
        assert_eq!(nodes.len(), 1);
        let div = element(&nodes[0]);
        assert_eq!(div.children, vec![HtmlNode::text("\nif a < b then\n")]);
    }

    #[test]
    fn test_script_body_is_text() {
        let nodes = parse("<script>if (a<b && c) {}</script><p>after</p>");
        assert_eq!(nodes.len(), 2);
        let script = element(&nodes[0]);
        assert_eq!(script.children, vec![HtmlNode::text("if (a<b && c) {}")]);
        assert!(nodes[1].is_element("p"));
    }
}

//! Document-level pass: stub resolution, TOC macro and root wrapper.

use sha2::{Digest, Sha256};

use crate::html::{Element, HtmlNode};
use crate::stub::{AttachmentStub, STUB_PATTERN};
use crate::transform::{ImageSource, TransformContext};

const AC_NAMESPACE: &str = "http://atlassian.com/content";
const RI_NAMESPACE: &str = "http://atlassian.com/resource/identifier";

/// Where the TOC macro goes when the document has none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TocPlacement {
    /// First child of the root.
    #[default]
    Top,
    /// Right after the first `<h1>`, or at the top without one.
    AfterFirstH1,
}

/// Table of contents macro settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocOptions {
    pub enabled: bool,
    pub max_level: u8,
    pub placement: TocPlacement,
}

impl Default for TocOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_level: 3,
            placement: TocPlacement::Top,
        }
    }
}

impl TocOptions {
    /// No TOC macro.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Finish a transformed tree: resolve stubs, add the TOC and wrap in the root `<div>`.
#[must_use]
pub fn finish(mut nodes: Vec<HtmlNode>, ctx: &TransformContext, toc: &TocOptions) -> Element {
    resolve_stubs(&mut nodes, ctx);

    if toc.enabled && !contains_toc(&nodes) {
        let toc_macro = toc_macro(toc.max_level);
        match toc.placement {
            TocPlacement::Top => nodes.insert(0, toc_macro.into()),
            TocPlacement::AfterFirstH1 => {
                if let Err(toc_macro) = insert_after_first_h1(&mut nodes, toc_macro) {
                    nodes.insert(0, toc_macro.into());
                }
            }
        }
    }

    Element::new("div")
        .with_attr("xmlns:ac", AC_NAMESPACE)
        .with_attr("xmlns:ri", RI_NAMESPACE)
        .with_children(nodes)
}

/// Replace every stub marker in text nodes with an `<ac:image>`.
///
/// Code elements are left alone so literal markers in code samples survive.
fn resolve_stubs(nodes: &mut Vec<HtmlNode>, ctx: &TransformContext) {
    let old = std::mem::take(nodes);
    for node in old {
        match unwrap_stub_anchor(node) {
            HtmlNode::Text(text) => split_stubs(text, ctx, nodes),
            HtmlNode::Element(mut el) => {
                if el.tag != "code" && el.tag != "pre" {
                    resolve_stubs(&mut el.children, ctx);
                }
                nodes.push(HtmlNode::Element(el));
            }
        }
    }
}

/// `<a>` holding nothing but a stub marker is replaced by the trimmed marker.
fn unwrap_stub_anchor(node: HtmlNode) -> HtmlNode {
    match node {
        HtmlNode::Element(el)
            if el.tag == "a"
                && el.children.len() == 1
                && matches!(&el.children[0], HtmlNode::Text(t) if is_lone_stub(t)) =>
        {
            HtmlNode::text(el.children[0].text_content().trim())
        }
        node => node,
    }
}

fn is_lone_stub(text: &str) -> bool {
    let text = text.trim();
    STUB_PATTERN
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

fn split_stubs(text: String, ctx: &TransformContext, out: &mut Vec<HtmlNode>) {
    if !text.contains("@@ATTACH|") {
        out.push(HtmlNode::Text(text));
        return;
    }

    let mut last = 0;
    for caps in STUB_PATTERN.captures_iter(&text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let Some(stub) = AttachmentStub::parse_body(&caps[1]) else {
            tracing::warn!(marker = whole.as_str(), "Malformed attachment marker left as text");
            continue;
        };
        if whole.start() > last {
            out.push(HtmlNode::text(&text[last..whole.start()]));
        }
        out.push(
            ctx.image_element(ImageSource::Attachment(&stub.file), stub.width, stub.height)
                .into(),
        );
        last = whole.end();
    }
    if last < text.len() {
        out.push(HtmlNode::text(&text[last..]));
    }
}

fn contains_toc(nodes: &[HtmlNode]) -> bool {
    nodes.iter().any(|node| match node {
        HtmlNode::Element(el) => {
            (el.tag == "ac:structured-macro" && el.attr_str("ac:name").as_deref() == Some("toc"))
                || contains_toc(&el.children)
        }
        HtmlNode::Text(_) => false,
    })
}

/// Insert right after the first `<h1>` in document order, handing the macro back if there is none.
fn insert_after_first_h1(nodes: &mut Vec<HtmlNode>, mut toc_macro: Element) -> Result<(), Element> {
    for i in 0..nodes.len() {
        let HtmlNode::Element(el) = &mut nodes[i] else {
            continue;
        };
        if el.tag == "h1" {
            nodes.insert(i + 1, toc_macro.into());
            return Ok(());
        }
        match insert_after_first_h1(&mut el.children, toc_macro) {
            Ok(()) => return Ok(()),
            Err(back) => toc_macro = back,
        }
    }
    Err(toc_macro)
}

fn toc_macro(max_level: u8) -> Element {
    Element::new("ac:structured-macro")
        .with_attr("ac:name", "toc")
        .with_attr("ac:schema-version", "1")
        .with_attr("ac:macro-id", toc_macro_id(max_level))
        .with_children(vec![
            Element::new("ac:parameter")
                .with_attr("ac:name", "maxLevel")
                .with_children(vec![HtmlNode::text(max_level.to_string())])
                .into(),
        ])
}

/// Stable macro id so repeated runs produce identical output.
fn toc_macro_id(max_level: u8) -> String {
    let digest = Sha256::digest(format!("confpub-toc:{max_level}").as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

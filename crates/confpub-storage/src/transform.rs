//! Per-node HTML to storage XHTML rewrite.
//!
//! Each node goes through these steps in order:
//!
//! 1. checkbox `<input>` becomes the text `[x]` or `[ ]`
//! 2. task-list marker classes are stripped from `<ul>`/`<li>`
//! 3. `<img>` becomes `<ac:image>`
//! 4. children are transformed (once)
//! 5. `<a>` whose only child is an `<ac:image>` is replaced by that image
//! 6. `<del>` becomes a line-through `<span>`
//! 7. void elements lose their children and are marked self-closing
//! 8. attribute values are normalized for XML

use std::path::{Path, PathBuf};

use crate::html::{AttrValue, Element, HtmlNode, is_void};
use crate::markdown::{attachment_filename, is_external_url, normalize_dimension};

const TASK_LIST_CLASSES: &[&str] = &["contains-task-list", "task-list-item"];
const LINE_THROUGH: &str = "text-decoration:line-through;";

/// Settings shared by the transform and document passes.
#[derive(Debug, Clone)]
pub struct TransformContext {
    image_dir: PathBuf,
}

/// What an `<ac:image>` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'s> {
    /// A page attachment, by bare filename.
    Attachment(&'s str),
    /// An absolute URL.
    Url(&'s str),
}

impl TransformContext {
    /// Create a context reading original image sizes from `image_dir`.
    #[must_use]
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
        }
    }

    /// Directory holding local images.
    #[must_use]
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Build an `<ac:image>` element.
    ///
    /// Attachments also get `ac:original-width`/`ac:original-height` when the
    /// file exists in the image directory and its size can be read.
    #[must_use]
    pub fn image_element(
        &self,
        source: ImageSource<'_>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Element {
        let mut image = Element::new("ac:image");
        if let Some(width) = width {
            image = image.with_attr("ac:width", width.to_string());
        }
        if let Some(height) = height {
            image = image.with_attr("ac:height", height.to_string());
        }
        if width.is_some() || height.is_some() {
            image = image.with_attr("ac:thumbnail", "true");
        }

        let reference = match source {
            ImageSource::Attachment(filename) => {
                if let Some((w, h)) = self.original_dimensions(filename) {
                    image = image
                        .with_attr("ac:original-width", w.to_string())
                        .with_attr("ac:original-height", h.to_string());
                }
                Element::new("ri:attachment").with_attr("ri:filename", filename)
            }
            ImageSource::Url(url) => Element::new("ri:url").with_attr("ri:value", url),
        };

        image.with_children(vec![reference.self_closed().into()])
    }

    fn original_dimensions(&self, filename: &str) -> Option<(u32, u32)> {
        let path = self.image_dir.join(filename);
        match image::image_dimensions(&path) {
            Ok(size) => Some(size),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Original image size unavailable");
                None
            }
        }
    }
}

/// Transform a list of sibling nodes in place.
pub fn transform_children(children: &mut Vec<HtmlNode>, ctx: &TransformContext) {
    let nodes = std::mem::take(children);
    children.extend(nodes.into_iter().map(|node| transform_node(node, ctx)));
}

fn transform_node(node: HtmlNode, ctx: &TransformContext) -> HtmlNode {
    let HtmlNode::Element(mut el) = node else {
        return node;
    };

    // 1
    if el.tag == "input" && el.attr_str("type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) {
        let checked = el.attr("checked").is_some_and(AttrValue::is_truthy);
        return HtmlNode::text(if checked { "[x]" } else { "[ ]" });
    }

    // 2
    if el.tag == "ul" || el.tag == "li" {
        strip_task_list_classes(&mut el);
    }

    // 3
    if el.tag == "img"
        && let Some(image) = convert_img(&el, ctx)
    {
        el = image;
    }

    // 4
    transform_children(&mut el.children, ctx);

    // 5
    if el.tag == "a" && el.children.len() == 1 && el.children[0].is_element("ac:image") {
        return el.children.remove(0);
    }

    // 6
    if el.tag == "del" {
        el.tag = "span".to_owned();
        add_line_through(&mut el);
    }

    // 7
    if is_void(&el.tag) {
        el.children.clear();
        el.self_closing = true;
    }

    // 8
    normalize_attrs(&mut el);

    HtmlNode::Element(el)
}

fn strip_task_list_classes(el: &mut Element) {
    if let Some(AttrValue::Tokens(tokens)) = el.attrs.iter_mut().find(|(k, _)| k == "class").map(|(_, v)| v) {
        tokens.retain(|t| !TASK_LIST_CLASSES.contains(&t.as_str()));
    }
}

/// `<img>` to `<ac:image>`. Returns `None` for images without a usable `src`.
fn convert_img(img: &Element, ctx: &TransformContext) -> Option<Element> {
    let src = img.attr_str("src")?;
    let style = img.attr_str("style").unwrap_or_default();
    let dimension = |name: &str| {
        img.attr_str(name)
            .and_then(|v| normalize_dimension(&v))
            .or_else(|| style_dimension(&style, name))
    };
    let (width, height) = (dimension("width"), dimension("height"));

    if is_external_url(&src) {
        return Some(ctx.image_element(ImageSource::Url(src.trim()), width, height));
    }
    let filename = attachment_filename(&src);
    if filename.is_empty() {
        return None;
    }
    Some(ctx.image_element(ImageSource::Attachment(filename), width, height))
}

/// Read a pixel dimension from an inline style declaration list.
fn style_dimension(style: &str, property: &str) -> Option<u32> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            normalize_dimension(value)
        } else {
            None
        }
    })
}

fn add_line_through(el: &mut Element) {
    let style = el.attr_str("style").unwrap_or_default();
    let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.contains("text-decoration:line-through") {
        return;
    }
    let mut merged = style.trim().to_owned();
    if !merged.is_empty() && !merged.ends_with(';') {
        merged.push(';');
    }
    merged.push_str(LINE_THROUGH);
    el.set_attr("style", merged);
}

/// Make attribute values XML-safe; class token lists are left for the serializer.
fn normalize_attrs(el: &mut Element) {
    let attrs = std::mem::take(&mut el.attrs);
    for (name, value) in attrs {
        let value = match value {
            AttrValue::Tokens(tokens) if name == "class" => AttrValue::Tokens(tokens),
            AttrValue::Tokens(tokens) => AttrValue::Str(tokens.join(" ")),
            AttrValue::Bool(true) => AttrValue::Str(name.clone()),
            AttrValue::Str(s) if s.is_empty() => AttrValue::Str(name.clone()),
            AttrValue::Str(s) => AttrValue::Str(s),
            AttrValue::Bool(false) | AttrValue::Null => continue,
        };
        el.attrs.push((name, value));
    }
}

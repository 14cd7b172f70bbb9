//! HTML tree representation.

/// HTML void elements, serialized self-closed and never given children.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Whether `tag` is an HTML void element.
#[must_use]
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Node in a parsed HTML tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    /// Element with tag, attributes and children.
    Element(Element),
    /// Unescaped text content.
    Text(String),
}

impl HtmlNode {
    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Borrow the element if this node is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    /// Whether this node is an element with the given tag.
    #[must_use]
    pub fn is_element(&self, tag: &str) -> bool {
        self.as_element().is_some_and(|el| el.tag == tag)
    }

    /// Concatenated text of this node and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl From<Element> for HtmlNode {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

/// Attribute value.
///
/// Parsed HTML only yields strings and class token lists; booleans and nulls
/// come from nodes built in code and are normalized before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    Bool(bool),
    Tokens(Vec<String>),
    Null,
}

impl AttrValue {
    /// String form, joining token lists with spaces.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Tokens(tokens) => Some(tokens.join(" ")),
            Self::Bool(_) | Self::Null => None,
        }
    }

    /// Whether the attribute counts as set (present, not false or null).
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Bool(false) | Self::Null)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// HTML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name, possibly namespace-prefixed (`ac:image`).
    pub tag: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, AttrValue)>,
    /// Child nodes.
    pub children: Vec<HtmlNode>,
    /// Serialize as `<tag/>` regardless of children.
    pub self_closing: bool,
}

impl Element {
    /// Create an element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Append an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Set children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<HtmlNode>) -> Self {
        self.children = children;
        self
    }

    /// Mark as self-closing.
    #[must_use]
    pub fn self_closed(mut self) -> Self {
        self.self_closing = true;
        self
    }

    /// Look up an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Look up an attribute as a string (token lists are joined).
    #[must_use]
    pub fn attr_str(&self, name: &str) -> Option<String> {
        self.attr(name).and_then(AttrValue::to_text)
    }

    /// Set or replace an attribute, keeping its position when it exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_owned(), value)),
        }
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attr(&mut self, name: &str) -> Option<AttrValue> {
        let pos = self.attrs.iter().position(|(k, _)| k == name)?;
        Some(self.attrs.remove(pos).1)
    }
}

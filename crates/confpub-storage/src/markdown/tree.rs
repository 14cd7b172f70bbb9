//! Markdown tree built from pulldown-cmark events.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TextMergeStream};

/// Parser options: GFM tables, strikethrough, task lists and alerts.
#[must_use]
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
}

/// Node in a Markdown tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MdNode<'a> {
    /// A tag with nested content (paragraph, heading, code block, image, ...).
    Container {
        tag: Tag<'a>,
        children: Vec<MdNode<'a>>,
    },
    /// A leaf event (text, inline code, raw HTML, breaks, task markers, ...).
    Leaf(Event<'a>),
}

impl<'a> MdNode<'a> {
    /// Text leaf.
    #[must_use]
    pub fn text(text: impl Into<CowStr<'a>>) -> Self {
        Self::Leaf(Event::Text(text.into()))
    }

    /// Inline raw HTML leaf.
    #[must_use]
    pub fn inline_html(html: impl Into<CowStr<'a>>) -> Self {
        Self::Leaf(Event::InlineHtml(html.into()))
    }

    /// Children of a container; leaves have none.
    #[must_use]
    pub fn children(&self) -> &[MdNode<'a>] {
        match self {
            Self::Container { children, .. } => children,
            Self::Leaf(_) => &[],
        }
    }

    /// Mutable children of a container.
    pub fn children_mut(&mut self) -> Option<&mut Vec<MdNode<'a>>> {
        match self {
            Self::Container { children, .. } => Some(children),
            Self::Leaf(_) => None,
        }
    }

    /// Concatenated text and inline code of this node and its descendants.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Leaf(Event::Text(t) | Event::Code(t)) => out.push_str(t),
            Self::Leaf(_) => {}
            Self::Container { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Parse Markdown into a list of top-level nodes.
///
/// Adjacent text events are merged, and consecutive raw HTML lines of one
/// HTML block are joined into a single leaf.
#[must_use]
pub fn parse(markdown: &str) -> Vec<MdNode<'_>> {
    build(TextMergeStream::new(Parser::new_ext(markdown, parser_options())))
}

/// Build a tree from a balanced event stream.
pub fn build<'a>(events: impl IntoIterator<Item = Event<'a>>) -> Vec<MdNode<'a>> {
    let mut stack: Vec<(Option<Tag<'a>>, Vec<MdNode<'a>>)> = vec![(None, Vec::new())];

    for event in events {
        match event {
            Event::Start(tag) => stack.push((Some(tag), Vec::new())),
            Event::End(_) => {
                if stack.len() > 1
                    && let Some((Some(tag), children)) = stack.pop()
                {
                    push_node(&mut stack, MdNode::Container { tag, children });
                }
            }
            event => push_node(&mut stack, MdNode::Leaf(event)),
        }
    }

    // Unbalanced input: close whatever is still open.
    while stack.len() > 1 {
        if let Some((Some(tag), children)) = stack.pop() {
            push_node(&mut stack, MdNode::Container { tag, children });
        }
    }
    stack.pop().map(|(_, nodes)| nodes).unwrap_or_default()
}

fn push_node<'a>(stack: &mut [(Option<Tag<'a>>, Vec<MdNode<'a>>)], node: MdNode<'a>) {
    let Some((_, siblings)) = stack.last_mut() else {
        return;
    };
    if let MdNode::Leaf(Event::Html(next)) = &node
        && let Some(MdNode::Leaf(Event::Html(prev))) = siblings.last_mut()
    {
        *prev = CowStr::from(format!("{prev}{next}"));
        return;
    }
    siblings.push(node);
}

/// Flatten a tree back into a balanced event stream.
#[must_use]
pub fn flatten<'a>(nodes: Vec<MdNode<'a>>) -> Vec<Event<'a>> {
    let mut events = Vec::new();
    flatten_into(nodes, &mut events);
    events
}

fn flatten_into<'a>(nodes: Vec<MdNode<'a>>, events: &mut Vec<Event<'a>>) {
    for node in nodes {
        match node {
            MdNode::Leaf(event) => events.push(event),
            MdNode::Container { tag, children } => {
                let end = tag.to_end();
                events.push(Event::Start(tag));
                flatten_into(children, events);
                events.push(Event::End(end));
            }
        }
    }
}

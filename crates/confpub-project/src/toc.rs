//! Table of contents model shared by Writerside and Authord projects.

use serde::Deserialize;

/// One entry of a project's table of contents.
///
/// Grouping entries have no topic of their own, only children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TocElement {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, alias = "toc-elements")]
    pub children: Vec<TocElement>,
}

impl TocElement {
    /// Element for `topic` with the given children.
    #[must_use]
    pub fn new(topic: impl Into<String>, children: Vec<TocElement>) -> Self {
        Self {
            topic: Some(topic.into()),
            children,
        }
    }
}

/// One documentation instance (a Writerside `.tree` file or an Authord instance).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocInstance {
    /// Topic shown first.
    pub start_page: Option<String>,
    /// Top-level entries in order.
    pub elements: Vec<TocElement>,
}

impl TocInstance {
    /// Topics in reading order: start page first, then a depth-first walk.
    ///
    /// Each topic appears once.
    #[must_use]
    pub fn topics(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(start) = self.start_page.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            out.push(start);
        }
        collect_topics(&self.elements, &mut out);
        out
    }
}

fn collect_topics<'a>(elements: &'a [TocElement], out: &mut Vec<&'a str>) {
    for element in elements {
        if let Some(topic) = element.topic.as_deref().map(str::trim).filter(|s| !s.is_empty())
            && !out.contains(&topic)
        {
            out.push(topic);
        }
        collect_topics(&element.children, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics_depth_first_with_start_page() {
        let instance = TocInstance {
            start_page: Some("intro.md".to_owned()),
            elements: vec![
                TocElement::new("intro.md", vec![]),
                TocElement::new("a.md", vec![TocElement::new("a1.md", vec![])]),
                TocElement {
                    topic: None,
                    children: vec![TocElement::new("b.md", vec![])],
                },
            ],
        };
        assert_eq!(instance.topics(), ["intro.md", "a.md", "a1.md", "b.md"]);
    }

    #[test]
    fn test_topics_without_start_page() {
        let instance = TocInstance {
            start_page: Some("  ".to_owned()),
            elements: vec![TocElement::new("x.md", vec![TocElement::new("x.md", vec![])])],
        };
        assert_eq!(instance.topics(), ["x.md"]);
    }
}

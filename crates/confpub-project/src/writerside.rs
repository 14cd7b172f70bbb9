//! Writerside project files: `writerside.cfg` and `*.tree`.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::ProjectError;
use crate::toc::{TocElement, TocInstance};

/// Relevant parts of `writerside.cfg`.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct WritersideConfig {
    pub topics_dir: Option<String>,
    pub images_dir: Option<String>,
    /// `.tree` files, relative to the config directory.
    pub instances: Vec<String>,
}

/// Parse `writerside.cfg` content.
pub(crate) fn parse_config(xml: &str, path: &Path) -> Result<WritersideConfig, ProjectError> {
    read_config(xml).map_err(|source| ProjectError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a `.tree` instance profile.
pub(crate) fn parse_tree(xml: &str, path: &Path) -> Result<TocInstance, ProjectError> {
    read_tree(xml).map_err(|source| ProjectError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

fn read_config(xml: &str) -> quick_xml::Result<WritersideConfig> {
    let mut reader = Reader::from_str(xml);
    let mut config = WritersideConfig::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"topics" => config.topics_dir = attr(&e, "dir")?,
                b"images" => config.images_dir = attr(&e, "dir")?,
                b"instance" => {
                    if let Some(src) = attr(&e, "src")? {
                        config.instances.push(src);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(config)
}

fn read_tree(xml: &str) -> quick_xml::Result<TocInstance> {
    let mut reader = Reader::from_str(xml);
    let mut instance = TocInstance::default();
    let mut open: Vec<TocElement> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"instance-profile" => {
                instance.start_page = attr(&e, "start-page")?;
            }
            Event::Start(e) if e.name().as_ref() == b"toc-element" => {
                open.push(toc_element(&e)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"toc-element" => {
                let element = toc_element(&e)?;
                attach(&mut open, &mut instance.elements, element);
            }
            Event::End(e) if e.name().as_ref() == b"toc-element" => {
                if let Some(element) = open.pop() {
                    attach(&mut open, &mut instance.elements, element);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    while let Some(element) = open.pop() {
        attach(&mut open, &mut instance.elements, element);
    }
    Ok(instance)
}

fn toc_element(e: &BytesStart<'_>) -> quick_xml::Result<TocElement> {
    Ok(TocElement {
        topic: attr(e, "topic")?,
        children: Vec::new(),
    })
}

fn attach(open: &mut [TocElement], top: &mut Vec<TocElement>, element: TocElement) {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None => top.push(element),
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> quick_xml::Result<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_config() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ihp SYSTEM "https://resources.jetbrains.com/writerside/1.0/ihp.dtd">
<ihp version="2.0">
    <topics dir="topics" web-path="topics"/>
    <images dir="images" web-path="images"/>
    <instance src="hi.tree"/>
    <instance src="other.tree"></instance>
</ihp>"#;
        let config = parse_config(xml, Path::new("writerside.cfg")).unwrap();
        assert_eq!(
            config,
            WritersideConfig {
                topics_dir: Some("topics".to_owned()),
                images_dir: Some("images".to_owned()),
                instances: vec!["hi.tree".to_owned(), "other.tree".to_owned()],
            }
        );
    }

    #[test]
    fn test_parse_tree() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE instance-profile SYSTEM "https://resources.jetbrains.com/writerside/1.0/product-profile.dtd">
<instance-profile id="hi" name="Help Instance" start-page="starter.md">
    <toc-element topic="starter.md"/>
    <toc-element topic="guide.md">
        <toc-element topic="install.md"/>
        <toc-element toc-title="Group">
            <toc-element topic="deep.md"/>
        </toc-element>
    </toc-element>
    <toc-element topic="faq.md"/>
</instance-profile>"#;
        let instance = parse_tree(xml, Path::new("hi.tree")).unwrap();
        assert_eq!(instance.start_page.as_deref(), Some("starter.md"));
        assert_eq!(
            instance.elements,
            vec![
                TocElement::new("starter.md", vec![]),
                TocElement::new(
                    "guide.md",
                    vec![
                        TocElement::new("install.md", vec![]),
                        TocElement {
                            topic: None,
                            children: vec![TocElement::new("deep.md", vec![])],
                        },
                    ]
                ),
                TocElement::new("faq.md", vec![]),
            ]
        );
        assert_eq!(
            instance.topics(),
            ["starter.md", "guide.md", "install.md", "deep.md", "faq.md"]
        );
    }

    #[test]
    fn test_parse_tree_malformed() {
        let err = parse_tree(
            "<instance-profile><toc-element topic=\"a.md\"></wrong></instance-profile>",
            Path::new("x.tree"),
        );
        assert!(matches!(err, Err(ProjectError::Xml { .. })));
    }
}

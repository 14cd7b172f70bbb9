//! Markdown tree rewrite: diagrams and images become attachment stubs.
//!
//! The rewrite runs in three phases so that rendering can happen in parallel
//! without mutating the tree mid-walk:
//!
//! 1. A read-only pre-order walk records rewrite instructions, each keyed by
//!    the child-index path of its target node.
//! 2. Distinct diagrams are rendered concurrently through the image cache.
//! 3. Instructions are applied in reverse path order, so replacing or
//!    removing a node never shifts the index of a pending target.

use std::collections::HashMap;

use confpub_diagrams::{DiagramLanguage, DiagramRenderer, ImageCache};
use pulldown_cmark::{CodeBlockKind, Event, Tag};
use rayon::prelude::*;

use super::tokenize::{attachment_filename, extract_img_attrs, is_external_url, parse_brace_params};
use super::tree::MdNode;
use crate::stub::AttachmentStub;

/// Rewrites diagram code blocks, images and raw `<img>` tags into stubs.
#[derive(Default)]
pub struct Preprocessor<'c> {
    diagrams: Option<(&'c dyn DiagramRenderer, &'c ImageCache)>,
}

impl<'c> Preprocessor<'c> {
    /// Create a preprocessor that leaves diagram code blocks untouched.
    #[must_use]
    pub fn new() -> Self {
        Self { diagrams: None }
    }

    /// Render diagram code blocks with `renderer`, caching results in `cache`.
    #[must_use]
    pub fn with_diagrams(mut self, renderer: &'c dyn DiagramRenderer, cache: &'c ImageCache) -> Self {
        self.diagrams = Some((renderer, cache));
        self
    }

    /// Rewrite `nodes` in place, returning warnings for diagrams that failed to render.
    pub fn process(&self, nodes: &mut Vec<MdNode<'_>>) -> Vec<String> {
        let mut collector = Collector::new(self);
        collector.visit(nodes, &mut Vec::new());
        let Collector {
            mut instructions,
            jobs,
            ..
        } = collector;
        instructions.sort_by(|a, b| a.path.cmp(&b.path));

        let rendered = self.render_all(&jobs);
        let mut warnings = Vec::new();
        for (lang, source) in jobs.iter().zip(&rendered).filter(|(_, r)| r.is_none()).map(|(j, _)| j) {
            let first_line = source.lines().next().unwrap_or_default();
            warnings.push(format!(
                "{lang} diagram failed to render, code block kept: {first_line}"
            ));
        }

        for Instruction { path, rewrite } in instructions.into_iter().rev() {
            let replacement = match rewrite {
                Rewrite::Diagram(job) => match &rendered[job] {
                    Some(filename) => vec![MdNode::Container {
                        tag: Tag::Paragraph,
                        children: vec![MdNode::text(AttachmentStub::new(filename.clone()).to_string())],
                    }],
                    None => continue,
                },
                Rewrite::Replace(nodes) => nodes,
            };
            splice_at(nodes, &path, replacement);
        }

        warnings
    }

    fn diagram_language(&self, info: &str) -> Option<DiagramLanguage> {
        let (renderer, _) = self.diagrams?;
        DiagramLanguage::parse(info).filter(|lang| renderer.supports(*lang))
    }

    /// Render every distinct diagram, returning the materialized filename per job.
    fn render_all(&self, jobs: &[(DiagramLanguage, String)]) -> Vec<Option<String>> {
        let Some((renderer, cache)) = self.diagrams else {
            return vec![None; jobs.len()];
        };

        jobs.par_iter()
            .map(|(lang, source)| {
                let cached = cache.ensure_rendered(*lang, source, renderer)?;
                match cache.materialize(&cached) {
                    Ok(filename) => Some(filename),
                    Err(e) => {
                        tracing::warn!(path = %cached.display(), error = %e, "Failed to copy diagram into image directory");
                        None
                    }
                }
            })
            .collect()
    }
}

enum Rewrite<'a> {
    /// Replace a code block with the rendered diagram for job `n`, if it rendered.
    Diagram(usize),
    /// Replace the node with zero or more nodes.
    Replace(Vec<MdNode<'a>>),
}

struct Instruction<'a> {
    path: Vec<usize>,
    rewrite: Rewrite<'a>,
}

struct Collector<'p, 'c, 'a> {
    preprocessor: &'p Preprocessor<'c>,
    instructions: Vec<Instruction<'a>>,
    jobs: Vec<(DiagramLanguage, String)>,
    job_index: HashMap<(DiagramLanguage, String), usize>,
}

impl<'p, 'c, 'a> Collector<'p, 'c, 'a> {
    fn new(preprocessor: &'p Preprocessor<'c>) -> Self {
        Self {
            preprocessor,
            instructions: Vec::new(),
            jobs: Vec::new(),
            job_index: HashMap::new(),
        }
    }

    fn push(&mut self, path: &[usize], rewrite: Rewrite<'a>) {
        self.instructions.push(Instruction {
            path: path.to_vec(),
            rewrite,
        });
    }

    /// Deduplicated render job for a diagram.
    fn job(&mut self, lang: DiagramLanguage, source: String) -> usize {
        let next = self.jobs.len();
        let key = (lang, source);
        if let Some(&index) = self.job_index.get(&key) {
            return index;
        }
        self.jobs.push(key.clone());
        self.job_index.insert(key, next);
        next
    }

    fn visit(&mut self, nodes: &[MdNode<'a>], path: &mut Vec<usize>) {
        for (i, node) in nodes.iter().enumerate() {
            path.push(i);
            match node {
                MdNode::Container {
                    tag: Tag::CodeBlock(CodeBlockKind::Fenced(info)),
                    ..
                } => {
                    if let Some(lang) = self.preprocessor.diagram_language(info) {
                        let job = self.job(lang, node.plain_text().trim().to_owned());
                        self.push(path, Rewrite::Diagram(job));
                    }
                }
                MdNode::Container {
                    tag: Tag::Image { dest_url, .. },
                    ..
                } => self.visit_image(nodes, i, dest_url, path),
                MdNode::Container { children, .. } => self.visit(children, path),
                MdNode::Leaf(Event::Html(html)) => {
                    if let Some(rewritten) = rewrite_img_tags(html) {
                        self.push(path, Rewrite::Replace(vec![MdNode::Leaf(Event::Html(rewritten.into()))]));
                    }
                }
                MdNode::Leaf(Event::InlineHtml(html)) => {
                    if let Some(rewritten) = rewrite_img_tags(html) {
                        self.push(path, Rewrite::Replace(vec![MdNode::inline_html(rewritten)]));
                    }
                }
                MdNode::Leaf(_) => {}
            }
            path.pop();
        }
    }

    /// Record the rewrite for the image at `siblings[i]` and its `{...}` hint.
    fn visit_image(&mut self, siblings: &[MdNode<'a>], i: usize, url: &str, path: &[usize]) {
        let external = is_external_url(url);
        let filename = attachment_filename(url);
        if !external && filename.is_empty() {
            return;
        }

        let hint = match siblings.get(i + 1) {
            Some(MdNode::Leaf(Event::Text(text))) => {
                parse_brace_params(text).map(|params| (params, &text[params.consumed..]))
            }
            _ => None,
        };
        let (width, height) = hint.map_or((None, None), |(p, _)| (p.width, p.height));

        let node = if external {
            MdNode::inline_html(external_img_html(url, &siblings[i].plain_text(), width, height))
        } else {
            MdNode::text(
                AttachmentStub::new(filename)
                    .with_size(width, height)
                    .to_string(),
            )
        };
        self.push(path, Rewrite::Replace(vec![node]));

        if let Some((_, rest)) = hint {
            let replacement = if rest.is_empty() {
                Vec::new()
            } else {
                vec![MdNode::text(rest.to_owned())]
            };
            let mut sibling_path = path.to_vec();
            if let Some(last) = sibling_path.last_mut() {
                *last += 1;
            }
            self.push(&sibling_path, Rewrite::Replace(replacement));
        }
    }
}

/// Replace the node at `path` with `replacement`.
fn splice_at<'a>(nodes: &mut Vec<MdNode<'a>>, path: &[usize], replacement: Vec<MdNode<'a>>) {
    let Some((&last, parents)) = path.split_last() else {
        return;
    };
    let mut siblings = nodes;
    for &index in parents {
        match siblings.get_mut(index).and_then(MdNode::children_mut) {
            Some(children) => siblings = children,
            None => return,
        }
    }
    if last < siblings.len() {
        siblings.splice(last..=last, replacement);
    }
}

/// Replace every local `<img>` tag in a raw HTML fragment with a stub.
///
/// Returns `None` when nothing was replaced.
pub fn rewrite_img_tags(html: &str) -> Option<String> {
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    let mut changed = false;

    while let Some(tag) = extract_img_attrs(&html[pos..]) {
        let start = pos + tag.span.start;
        let end = pos + tag.span.end;
        out.push_str(&html[pos..start]);

        let local = tag
            .src
            .as_deref()
            .filter(|src| !is_external_url(src))
            .map(attachment_filename)
            .filter(|name| !name.is_empty());
        match local {
            Some(filename) => {
                let stub = AttachmentStub::new(filename).with_size(tag.width, tag.height);
                out.push_str(&escape_html(&stub.to_string()));
                changed = true;
            }
            None => out.push_str(&html[start..end]),
        }
        pos = end;
    }

    if !changed {
        return None;
    }
    out.push_str(&html[pos..]);
    Some(out)
}

fn external_img_html(url: &str, alt: &str, width: Option<u32>, height: Option<u32>) -> String {
    let mut html = format!(r#"<img src="{}" alt="{}""#, escape_html(url), escape_html(alt));
    if let Some(width) = width {
        html.push_str(&format!(r#" width="{width}""#));
    }
    if let Some(height) = height {
        html.push_str(&format!(r#" height="{height}""#));
    }
    html.push_str(" />");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use confpub_diagrams::{PNG_MAGIC, RenderError};
    use pulldown_cmark::html;
    use tempfile::TempDir;

    use super::*;
    use crate::markdown::tree::{flatten, parse};

    struct CountingRenderer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingRenderer {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl DiagramRenderer for CountingRenderer {
        fn supports(&self, language: DiagramLanguage) -> bool {
            language == DiagramLanguage::Mermaid
        }

        fn render(&self, _language: DiagramLanguage, _source: &str) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RenderError::InvalidPng);
            }
            let mut png = PNG_MAGIC.to_vec();
            png.extend_from_slice(&[0; 16]);
            Ok(png)
        }
    }

    fn run(markdown: &str, preprocessor: &Preprocessor<'_>) -> (String, Vec<String>) {
        let mut nodes = parse(markdown);
        let warnings = preprocessor.process(&mut nodes);
        let mut out = String::new();
        html::push_html(&mut out, flatten(nodes).into_iter());
        (out, warnings)
    }

    #[test]
    fn test_local_image_with_brace_width() {
        let (html, _) = run(
            "![Create new topic options](images/new_topic_options.png){ width=290 }\n",
            &Preprocessor::new(),
        );
        assert_eq!(html, "<p>@@ATTACH|file=new_topic_options.png|width=290@@</p>\n");
    }

    #[test]
    fn test_brace_prefix_consumed_from_sibling() {
        let (html, _) = run(
            "See ![a](a.png){width=10px}{height=abc} and more\n",
            &Preprocessor::new(),
        );
        assert_eq!(html, "<p>See @@ATTACH|file=a.png|width=10@@ and more</p>\n");
    }

    #[test]
    fn test_image_without_hint() {
        let (html, _) = run("![a](a.png?raw=1) {not a hint\n", &Preprocessor::new());
        assert_eq!(html, "<p>@@ATTACH|file=a.png@@ {not a hint</p>\n");
    }

    #[test]
    fn test_external_image_keeps_url() {
        let (html, _) = run(
            "![Logo](https://example.com/logo.png){width=50}\n",
            &Preprocessor::new(),
        );
        assert_eq!(
            html,
            "<p><img src=\"https://example.com/logo.png\" alt=\"Logo\" width=\"50\" /></p>\n"
        );
    }

    #[test]
    fn test_linked_image() {
        let (html, _) = run("[![a](a.png)](https://example.com)\n", &Preprocessor::new());
        assert_eq!(
            html,
            "<p><a href=\"https://example.com\">@@ATTACH|file=a.png@@</a></p>\n"
        );
    }

    #[test]
    fn test_raw_inline_img() {
        let (html, _) = run(
            "Text <img src=\"img/b.png\" width=\"120px\"> end\n",
            &Preprocessor::new(),
        );
        assert_eq!(html, "<p>Text @@ATTACH|file=b.png|width=120@@ end</p>\n");
    }

    #[test]
    fn test_raw_html_block_img() {
        let (html, _) = run(
            "<div>\n<img src='a.png' height=40>\n<img src=\"https://x.org/y.png\">\n</div>\n",
            &Preprocessor::new(),
        );
        assert_eq!(
            html,
            "<div>\n@@ATTACH|file=a.png|height=40@@\n<img src=\"https://x.org/y.png\">\n</div>\n"
        );
    }

    #[test]
    fn test_rewrite_img_tags_untouched() {
        assert_eq!(rewrite_img_tags("<b>no image</b>"), None);
        assert_eq!(rewrite_img_tags(r#"<img src="https://a/b.png">"#), None);
        assert_eq!(rewrite_img_tags(r#"<img src="a.png""#), None);
    }

    #[test]
    fn test_diagram_rendered_once_per_distinct_source() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path().join("cache"), tmp.path().join("images"));
        let renderer = CountingRenderer::new(false);
        let preprocessor = Preprocessor::new().with_diagrams(&renderer, &cache);

        let markdown = "```mermaid\ngraph TD; A-->B\n```\n\ntext\n\n```mermaid\n\ngraph TD; A-->B\n\n```\n";
        let (html, warnings) = run(markdown, &preprocessor);

        assert!(warnings.is_empty());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert!(!html.contains("<code"));
        assert_eq!(html.matches("@@ATTACH|file=").count(), 2);

        let filename = confpub_diagrams::DiagramKey::new(DiagramLanguage::Mermaid, "graph TD; A-->B").filename();
        assert!(html.contains(&format!("<p>@@ATTACH|file={filename}@@</p>")));
        assert!(tmp.path().join("images").join(&filename).exists());
    }

    #[test]
    fn test_failed_diagram_keeps_code_block() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path().join("cache"), tmp.path().join("images"));
        let renderer = CountingRenderer::new(true);
        let preprocessor = Preprocessor::new().with_diagrams(&renderer, &cache);

        let (html, warnings) = run("```mermaid\ngraph TD; A-->\n```\n", &preprocessor);

        assert_eq!(warnings.len(), 1);
        assert!(html.contains("<pre><code class=\"language-mermaid\">graph TD; A--&gt;\n</code></pre>"));
        assert!(!html.contains("@@ATTACH"));
    }

    #[test]
    fn test_unsupported_language_left_alone() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path().join("cache"), tmp.path().join("images"));
        let renderer = CountingRenderer::new(false);
        let preprocessor = Preprocessor::new().with_diagrams(&renderer, &cache);

        let (html, _) = run("```plantuml\n@startuml\n@enduml\n```\n", &preprocessor);

        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert!(html.contains("language-plantuml"));
    }

    #[test]
    fn test_diagrams_without_renderer_untouched() {
        let (html, _) = run("```mermaid\ngraph TD\n```\n", &Preprocessor::new());
        assert!(html.contains("language-mermaid"));
    }

    #[test]
    fn test_nested_list_image() {
        let (html, _) = run("- item ![x](x.png){height=5}\n  - ![y](y.png)\n", &Preprocessor::new());
        assert!(html.contains("item @@ATTACH|file=x.png|height=5@@"));
        assert!(html.contains("@@ATTACH|file=y.png@@"));
    }
}

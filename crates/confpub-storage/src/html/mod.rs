//! HTML tree, parser and XHTML serializer.

mod entities;
mod node;
mod parser;
mod serializer;

pub use entities::{convert_html_entities, escape_bare_ampersands};
pub use node::{AttrValue, Element, HtmlNode, VOID_ELEMENTS, is_void};
pub use parser::HtmlParser;
pub use serializer::serialize;

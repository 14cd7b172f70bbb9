//! Markdown parsing and the attachment-stub preprocessor.

mod preprocess;
mod tokenize;
mod tree;

pub use preprocess::{Preprocessor, rewrite_img_tags};
pub use tokenize::{
    BraceParams, ImgTag, attachment_filename, extract_img_attrs, is_external_url,
    normalize_dimension, parse_brace_params,
};
pub use tree::{MdNode, build, flatten, parse, parser_options};

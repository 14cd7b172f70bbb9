//! CLI command implementations.

mod common;
mod publish;
mod render;

pub(crate) use publish::PublishArgs;
pub(crate) use render::RenderArgs;

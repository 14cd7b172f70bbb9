//! CLI error types.

use confpub_config::ConfigError;
use confpub_confluence::PublishError;
use confpub_project::ProjectError;
use confpub_storage::ConvertError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Project(#[from] ProjectError),

    #[error("{0}")]
    Convert(#[from] ConvertError),

    #[error("{0}")]
    Publish(#[from] PublishError),
}

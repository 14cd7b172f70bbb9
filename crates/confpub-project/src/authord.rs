//! Authord project file: `authord.config.json`.

use std::path::Path;

use serde::Deserialize;

use crate::error::ProjectError;
use crate::toc::{TocElement, TocInstance};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthordConfig {
    #[serde(default)]
    pub topics: DirSetting,
    #[serde(default)]
    pub images: DirSetting,
    #[serde(default)]
    instances: Vec<AuthordInstance>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DirSetting {
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthordInstance {
    #[serde(rename = "start-page")]
    start_page: Option<String>,
    #[serde(rename = "toc-elements", default)]
    toc_elements: Vec<TocElement>,
}

impl AuthordConfig {
    /// Parse `authord.config.json` content.
    pub(crate) fn parse(json: &str, path: &Path) -> Result<Self, ProjectError> {
        serde_json::from_str(json).map_err(|source| ProjectError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn into_instances(self) -> Vec<TocInstance> {
        self.instances
            .into_iter()
            .map(|i| TocInstance {
                start_page: i.start_page,
                elements: i.toc_elements,
            })
            .collect()
    }
}

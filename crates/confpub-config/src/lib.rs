//! Configuration management for confpub.
//!
//! Parses `confpub.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `confluence.base_url`
//! - `confluence.username`
//! - `confluence.api_token`
//! - `confluence.page_id`
//! - `diagrams.kroki_url`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the documentation project root.
    pub root: Option<PathBuf>,
    /// Override the target Confluence page.
    pub page_id: Option<String>,
    /// Override the page title.
    pub title: Option<String>,
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "confpub.toml";

/// Default number of seconds a diagram render may take.
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project paths (relative strings from TOML).
    project: ProjectConfigRaw,
    /// Diagram rendering configuration (relative strings from TOML).
    diagrams: DiagramsConfigRaw,
    /// Table-of-contents macro configuration.
    pub toc: TocConfig,
    /// Confluence configuration.
    pub confluence: Option<ConfluenceConfig>,

    /// Resolved project paths (set after loading).
    #[serde(skip)]
    pub project_resolved: ProjectConfig,
    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw project configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ProjectConfigRaw {
    root: Option<String>,
    markdown_dir: Option<String>,
    image_dir: Option<String>,
}

/// Resolved project paths.
///
/// `markdown_dir` and `image_dir` stay `None` unless set explicitly; the
/// project layout detection fills them in from Writerside/Authord config.
#[derive(Debug, Default, Clone)]
pub struct ProjectConfig {
    /// Documentation project root.
    pub root: PathBuf,
    /// Directory containing the markdown topics.
    pub markdown_dir: Option<PathBuf>,
    /// Directory holding images referenced by the topics.
    pub image_dir: Option<PathBuf>,
}

/// Which diagram renderer to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendererKind {
    /// Local `mmdc` (mermaid-cli) process.
    #[default]
    MermaidCli,
    /// Remote Kroki server.
    Kroki,
    /// Diagrams are left as code blocks.
    #[serde(rename = "none")]
    Disabled,
}

/// Raw diagrams configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    renderer: Option<RendererKind>,
    kroki_url: Option<String>,
    mmdc: Option<String>,
    cache_dir: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved diagram rendering configuration.
#[derive(Debug, Clone)]
pub struct DiagramsConfig {
    /// Renderer backend.
    pub renderer: RendererKind,
    /// Kroki server URL (required when `renderer` is Kroki).
    pub kroki_url: Option<String>,
    /// Explicit path to the `mmdc` executable.
    pub mmdc: Option<PathBuf>,
    /// Directory for content-addressed rendered diagrams.
    pub cache_dir: PathBuf,
    /// Upper bound for a single diagram render.
    pub timeout: Duration,
}

impl DiagramsConfig {
    fn default_with_base(base: &Path) -> Self {
        Self {
            renderer: RendererKind::default(),
            kroki_url: None,
            mmdc: None,
            cache_dir: base.join(".confpub").join("diagrams"),
            timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
        }
    }
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Where the table-of-contents macro is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TocPlacement {
    /// First element of the page body.
    #[default]
    Top,
    /// Directly after the first `<h1>` (top when there is none).
    AfterH1,
}

/// Table-of-contents macro configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TocConfig {
    /// Whether to inject a TOC macro.
    pub enabled: bool,
    /// Deepest heading level listed in the TOC.
    pub max_level: u8,
    /// Insertion point.
    pub placement: TocPlacement,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_level: 3,
            placement: TocPlacement::Top,
        }
    }
}

/// Confluence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence base URL (e.g. `https://example.atlassian.net/wiki`).
    pub base_url: String,
    /// Account name for basic auth. Without it the token is sent as a bearer token.
    #[serde(default)]
    pub username: Option<String>,
    /// API token or personal access token.
    pub api_token: String,
    /// Target page ID.
    #[serde(default)]
    pub page_id: Option<String>,
    /// Title override; the current page title is kept when unset.
    #[serde(default)]
    pub title: Option<String>,
}

impl ConfluenceConfig {
    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.base_url, "confluence.base_url")?;
        require_http_url(&self.base_url, "confluence.base_url")?;
        require_non_empty(&self.api_token, "confluence.api_token")?;
        if let Some(username) = &self.username {
            require_non_empty(username, "confluence.username")?;
        }
        Ok(())
    }

    /// Target page ID, required for publishing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when no page ID is configured.
    pub fn require_page_id(&self) -> Result<&str, ConfigError> {
        match self.page_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ConfigError::Validation(
                "confluence.page_id is required (via --page-id or [confluence] config)".to_owned(),
            )),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.api_token`").
        field: String,
        /// Error message (e.g., "${`CONFLUENCE_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `confpub.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root) = &settings.root {
            self.project_resolved.root.clone_from(root);
        }
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams_resolved.kroki_url = Some(kroki_url.clone());
            self.diagrams_resolved.renderer = RendererKind::Kroki;
        }
        if let Some(confluence) = self.confluence.as_mut() {
            if let Some(page_id) = &settings.page_id {
                confluence.page_id = Some(page_id.clone());
            }
            if let Some(title) = &settings.title {
                confluence.title = Some(title.clone());
            }
        }
    }

    /// Get validated Confluence configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_confluence(&self) -> Result<&ConfluenceConfig, ConfigError> {
        let conf = self.confluence.as_ref().ok_or_else(|| {
            ConfigError::Validation("[confluence] section required in config".into())
        })?;
        conf.validate()?;
        Ok(conf)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            project: ProjectConfigRaw::default(),
            diagrams: DiagramsConfigRaw::default(),
            toc: TocConfig::default(),
            confluence: None,
            project_resolved: ProjectConfig {
                root: base.to_path_buf(),
                markdown_dir: None,
                image_dir: None,
            },
            diagrams_resolved: DiagramsConfig::default_with_base(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_diagrams()?;
        self.validate_toc()?;
        Ok(())
    }

    /// Validate diagrams configuration.
    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let diagrams = &self.diagrams_resolved;
        if diagrams.renderer == RendererKind::Kroki {
            let url = diagrams.kroki_url.as_deref().ok_or_else(|| {
                ConfigError::Validation(
                    "diagrams.renderer = \"kroki\" requires kroki_url to be set".to_owned(),
                )
            })?;
            require_non_empty(url, "diagrams.kroki_url")?;
            require_http_url(url, "diagrams.kroki_url")?;
        }
        if diagrams.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Validate TOC configuration.
    fn validate_toc(&self) -> Result<(), ConfigError> {
        if !(1..=6).contains(&self.toc.max_level) {
            return Err(ConfigError::Validation(
                "toc.max_level must be between 1 and 6".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand::expand_opt(&mut self.diagrams.kroki_url, "diagrams.kroki_url")?;

        if let Some(ref mut confluence) = self.confluence {
            confluence.base_url = expand::expand_env(&confluence.base_url, "confluence.base_url")?;
            confluence.api_token =
                expand::expand_env(&confluence.api_token, "confluence.api_token")?;
            expand::expand_opt(&mut confluence.username, "confluence.username")?;
            expand::expand_opt(&mut confluence.page_id, "confluence.page_id")?;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let root = config_dir.join(self.project.root.as_deref().unwrap_or("."));

        self.project_resolved = ProjectConfig {
            markdown_dir: self.project.markdown_dir.as_deref().map(|d| root.join(d)),
            image_dir: self.project.image_dir.as_deref().map(|d| root.join(d)),
            root,
        };

        let defaults = DiagramsConfig::default_with_base(config_dir);
        self.diagrams_resolved = DiagramsConfig {
            renderer: self.diagrams.renderer.unwrap_or(defaults.renderer),
            kroki_url: self.diagrams.kroki_url.clone(),
            mmdc: self.diagrams.mmdc.as_deref().map(PathBuf::from),
            cache_dir: self
                .diagrams
                .cache_dir
                .as_deref()
                .map_or(defaults.cache_dir, |d| config_dir.join(d)),
            timeout: self
                .diagrams
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
        };
    }
}

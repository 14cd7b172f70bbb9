//! Setup shared by `publish` and `render`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use confpub_config::{CliSettings, Config, DiagramsConfig, RendererKind, TocConfig};
use confpub_diagrams::{DiagramRenderer, KrokiRenderer, MermaidCliRenderer};
use confpub_project::{ProjectError, ProjectLayout};
use confpub_storage::{StorageConverter, TocOptions, TocPlacement};

use crate::error::CliError;
use crate::output::Output;

/// Flags accepted by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file.
    /// Default: auto-discover confpub.toml in current directory or parents.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Documentation project root (overrides [project] root).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Loaded configuration with project directories and converter resolved.
pub(crate) struct Project {
    pub config: Config,
    pub root: PathBuf,
    pub markdown_dir: PathBuf,
    pub image_dir: PathBuf,
    pub converter: StorageConverter,
}

impl Project {
    /// Load configuration and detect the project layout.
    ///
    /// Directories set in the configuration win over those of the detected
    /// project; without a project file the root holds everything.
    pub(crate) fn load(
        common: &CommonArgs,
        settings: CliSettings,
        output: &Output,
    ) -> Result<Self, CliError> {
        let settings = CliSettings {
            root: common.root.clone(),
            ..settings
        };
        let config = Config::load(common.config.as_deref(), Some(&settings))?;
        let root = config.project_resolved.root.clone();

        let (detected_markdown, detected_images) = match ProjectLayout::detect(&root) {
            Ok(layout) => {
                tracing::info!(kind = ?layout.kind, config = %layout.config_path.display(), "Detected project");
                (layout.markdown_dir, layout.image_dir)
            }
            Err(ProjectError::NoProject(_)) => (root.clone(), root.clone()),
            Err(e) => return Err(e.into()),
        };
        let markdown_dir = config
            .project_resolved
            .markdown_dir
            .clone()
            .unwrap_or(detected_markdown);
        let image_dir = config
            .project_resolved
            .image_dir
            .clone()
            .unwrap_or(detected_images);

        let mut converter = StorageConverter::new(&image_dir).with_toc(toc_options(&config.toc));
        if let Some(renderer) = diagram_renderer(&config.diagrams_resolved, output) {
            converter = converter.with_diagrams(renderer, &config.diagrams_resolved.cache_dir);
        }

        Ok(Self {
            config,
            root,
            markdown_dir,
            image_dir,
            converter,
        })
    }

    /// Markdown directory relative to the current directory when possible.
    pub(crate) fn display_dir(&self) -> String {
        relative_display(&self.markdown_dir)
    }
}

fn relative_display(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

fn toc_options(toc: &TocConfig) -> TocOptions {
    TocOptions {
        enabled: toc.enabled,
        max_level: toc.max_level,
        placement: match toc.placement {
            confpub_config::TocPlacement::Top => TocPlacement::Top,
            confpub_config::TocPlacement::AfterH1 => TocPlacement::AfterFirstH1,
        },
    }
}

/// Build the configured renderer.
///
/// A missing `mmdc` is not fatal: diagrams then stay code blocks.
fn diagram_renderer(diagrams: &DiagramsConfig, output: &Output) -> Option<Arc<dyn DiagramRenderer>> {
    match diagrams.renderer {
        RendererKind::Disabled => None,
        RendererKind::Kroki => {
            let url = diagrams.kroki_url.clone()?;
            Some(Arc::new(KrokiRenderer::with_timeout(url, diagrams.timeout)))
        }
        RendererKind::MermaidCli => {
            match MermaidCliRenderer::discover(diagrams.mmdc.as_deref(), diagrams.timeout) {
                Ok(renderer) => {
                    tracing::info!(program = %renderer.program().display(), "Using mermaid-cli");
                    Some(Arc::new(renderer))
                }
                Err(e) => {
                    output.warning(&format!(
                        "Diagram rendering disabled: {e}. Mermaid blocks will stay code blocks."
                    ));
                    None
                }
            }
        }
    }
}

//! `render` command implementation.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use confpub_config::CliSettings;
use confpub_confluence::{PublishError, concatenate};
use confpub_project::{OrderingResolver, ProjectOrdering};
use confpub_storage::{export_hash, referenced_attachments};

use super::common::{CommonArgs, Project};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Write the storage XHTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Kroki server URL (switches diagram rendering to Kroki).
    #[arg(long, env = "CONFPUB_KROKI_URL")]
    kroki_url: Option<String>,
}

impl RenderArgs {
    /// Execute the render command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let settings = CliSettings {
            kroki_url: self.kroki_url,
            ..CliSettings::default()
        };
        let project = Project::load(&self.common, settings, output)?;

        let files = ProjectOrdering.resolve(&project.root, &project.markdown_dir)?;
        if files.is_empty() {
            return Err(PublishError::NoMarkdown(project.markdown_dir).into());
        }
        output.info(&format!(
            "Rendering {} file(s) from {}...",
            files.len(),
            project.display_dir()
        ));

        let markdown = concatenate(&files)?;
        let result = project.converter.convert(&markdown)?;
        for warning in &result.warnings {
            output.warning(warning);
        }

        match &self.output {
            Some(path) => {
                std::fs::write(path, &result.xhtml)?;
                output.field("Output", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(result.xhtml.as_bytes())?;
                stdout.write_all(b"\n")?;
            }
        }

        let attachments = referenced_attachments(&result.xhtml);
        output.field("Attachments", attachments.len());
        output.field("Export hash", export_hash(&result.xhtml));
        output.success("Render complete");
        Ok(())
    }
}

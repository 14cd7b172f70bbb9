//! `publish` command implementation.

use clap::Args;
use confpub_config::CliSettings;
use confpub_confluence::{
    ConfluenceClient, PublishError, PublishOptions, PublishOutcome, PublishReport, Publisher,
};
use confpub_project::ProjectOrdering;

use super::common::{CommonArgs, Project};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the publish command.
#[derive(Args)]
pub(crate) struct PublishArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Confluence page ID (overrides [confluence] page_id).
    #[arg(long, env = "CONFPUB_PAGE_ID")]
    page_id: Option<String>,

    /// Page title (overrides [confluence] title; default: keep current title).
    #[arg(long)]
    title: Option<String>,

    /// Show what would change without writing to Confluence.
    #[arg(long)]
    dry_run: bool,

    /// Upload every referenced attachment when the page body changes.
    #[arg(long)]
    force_attachments: bool,
}

impl PublishArgs {
    /// Execute the publish command.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let settings = CliSettings {
            page_id: self.page_id,
            title: self.title,
            ..CliSettings::default()
        };
        let project = Project::load(&self.common, settings, output)?;
        let confluence = project.config.require_confluence()?;
        let page_id = confluence.require_page_id()?.to_owned();

        if self.dry_run {
            output.warning("Dry run: nothing will be written to Confluence");
        }
        output.info(&format!(
            "Publishing {} to page {page_id}...",
            project.display_dir()
        ));

        let client = ConfluenceClient::new(
            &confluence.base_url,
            confluence.username.as_deref(),
            &confluence.api_token,
        );
        let publisher = Publisher::new(&client, &ProjectOrdering, &project.converter);
        let report = publisher
            .publish(&PublishOptions {
                source_root: project.root.clone(),
                markdown_dir: project.markdown_dir.clone(),
                image_dir: project.image_dir.clone(),
                page_id: page_id.clone(),
                title: confluence.title.clone(),
                force_attachments: self.force_attachments,
                dry_run: self.dry_run,
            })
            .inspect_err(|e| print_hint(output, e))?;

        print_report(output, &report);
        output.info(&format!("URL: {}", client.page_url(&page_id)));
        Ok(())
    }
}

fn print_hint(output: &Output, err: &PublishError) {
    if let PublishError::Remote { source, .. } = err
        && matches!(source.status(), Some(401 | 403))
    {
        output.warning("Check [confluence] username and api_token in confpub.toml");
    }
}

fn print_report(output: &Output, report: &PublishReport) {
    output.field("Files", report.files);
    output.field("Export hash", &report.hash);

    for warning in &report.warnings {
        output.warning(&format!("  {warning}"));
    }
    if !report.missing_local.is_empty() {
        output.warning(&format!(
            "{} referenced attachment(s) not found locally:",
            report.missing_local.len()
        ));
        for name in &report.missing_local {
            output.warning(&format!("  {name}"));
        }
    }
    if !report.uploaded.is_empty() {
        let verb = if report.outcome.changed_remote() {
            "Uploaded"
        } else {
            "Would upload"
        };
        output.info(&format!("{verb} {} attachment(s):", report.uploaded.len()));
        for name in &report.uploaded {
            output.info(&format!("  {name}"));
        }
    }

    match report.outcome {
        PublishOutcome::Skipped => output.success("Page is up to date"),
        PublishOutcome::Healed => output.success("Page body unchanged, missing attachments restored"),
        PublishOutcome::Updated { version } => {
            output.success(&format!("Page updated to version {version}"));
        }
        PublishOutcome::WouldSkip => output.highlight("Page is up to date"),
        PublishOutcome::WouldHeal => output.highlight("Page body unchanged, attachments would be restored"),
        PublishOutcome::WouldUpdate { version } => {
            output.highlight(&format!("Page would be updated to version {version}"));
        }
    }
}

//! Publisher implementation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use confpub_project::OrderingResolver;
use confpub_storage::{StorageConverter, export_hash, referenced_attachments};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::PublishOptions;
use super::error::PublishError;
use super::result::{PublishOutcome, PublishReport};
use crate::repository::{AttachmentRepository, PageRepository, PropertyStore};

/// Separator between concatenated Markdown files.
const FILE_SEPARATOR: &str = "\n\n";

/// Publishes a project to a Confluence page, skipping unchanged content.
pub struct Publisher<'a> {
    resolver: &'a dyn OrderingResolver,
    converter: &'a StorageConverter,
    pages: &'a dyn PageRepository,
    attachments: &'a dyn AttachmentRepository,
    properties: &'a dyn PropertyStore,
}

impl<'a> Publisher<'a> {
    /// Create a publisher writing through `remote`.
    #[must_use]
    pub fn new<R>(
        remote: &'a R,
        resolver: &'a dyn OrderingResolver,
        converter: &'a StorageConverter,
    ) -> Self
    where
        R: PageRepository + AttachmentRepository + PropertyStore,
    {
        Self {
            resolver,
            converter,
            pages: remote,
            attachments: remote,
            properties: remote,
        }
    }

    /// Publish the project described by `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - no page id is given, the page does not exist or there is no Markdown
    /// - a Markdown file cannot be read or converted
    /// - a Confluence API call fails (the export hash is then left untouched)
    pub fn publish(&self, options: &PublishOptions) -> Result<PublishReport, PublishError> {
        let page_id = options.page_id.trim();
        if page_id.is_empty() {
            return Err(PublishError::Config("a Confluence page id is required".to_owned()));
        }

        let files = self
            .resolver
            .resolve(&options.source_root, &options.markdown_dir)?;
        if files.is_empty() {
            return Err(PublishError::NoMarkdown(options.markdown_dir.clone()));
        }
        info!(files = files.len(), "Resolved Markdown files");

        let markdown = concatenate(&files)?;
        let converted = self.converter.convert(&markdown)?;
        let hash = export_hash(&converted.xhtml);
        let referenced = referenced_attachments(&converted.xhtml);

        let page = self
            .pages
            .get(page_id)
            .map_err(PublishError::remote("get page", page_id))?
            .ok_or_else(|| PublishError::PageNotFound(page_id.to_owned()))?;
        let remote_hash = self
            .properties
            .get_export_hash(page_id)
            .map_err(PublishError::remote("get export hash", page_id))?;
        let unchanged = remote_hash.as_deref() == Some(hash.as_str());
        debug!(page_id, %hash, remote_hash = ?remote_hash, unchanged, "Compared export hash");

        let wanted: Vec<String> = if !unchanged && options.force_attachments {
            referenced.into_iter().collect()
        } else {
            self.missing_remote(page_id, &referenced)?
        };
        let (uploads, missing_local): (Vec<String>, Vec<String>) = wanted
            .into_iter()
            .partition(|name| options.image_dir.join(name).is_file());
        for name in &missing_local {
            warn!(filename = %name, dir = %options.image_dir.display(), "Referenced attachment not found locally");
        }

        let mut report = PublishReport {
            page_id: page_id.to_owned(),
            outcome: PublishOutcome::Skipped,
            hash,
            files: files.len(),
            uploaded: Vec::new(),
            missing_local,
            warnings: converted.warnings,
        };

        if options.dry_run {
            report.outcome = match (unchanged, uploads.is_empty()) {
                (false, _) => PublishOutcome::WouldUpdate {
                    version: page.version + 1,
                },
                (true, true) => PublishOutcome::WouldSkip,
                (true, false) => PublishOutcome::WouldHeal,
            };
            report.uploaded = uploads;
            return Ok(report);
        }

        if unchanged {
            if uploads.is_empty() {
                info!(page_id, "Page is up to date");
                return Ok(report);
            }
            info!(page_id, count = uploads.len(), "Page body unchanged, restoring missing attachments");
            self.upload_all(page_id, &options.image_dir, &uploads)?;
            report.outcome = PublishOutcome::Healed;
        } else {
            let title = options.title.as_deref().unwrap_or(&page.title);
            let updated = self
                .pages
                .put_storage_body(page_id, &converted.xhtml, title, page.version + 1)
                .map_err(PublishError::remote("update page", page_id))?;
            self.upload_all(page_id, &options.image_dir, &uploads)?;
            self.properties
                .set_export_hash(page_id, &report.hash)
                .map_err(PublishError::remote("set export hash", page_id))?;
            info!(page_id, version = updated.version, "Page updated");
            report.outcome = PublishOutcome::Updated {
                version: updated.version,
            };
        }

        report.uploaded = uploads;
        Ok(report)
    }

    /// Referenced filenames not attached to the page yet.
    fn missing_remote(
        &self,
        page_id: &str,
        referenced: &BTreeSet<String>,
    ) -> Result<Vec<String>, PublishError> {
        if referenced.is_empty() {
            return Ok(Vec::new());
        }
        let existing = self
            .attachments
            .list(page_id)
            .map_err(PublishError::remote("list attachments", page_id))?;
        Ok(referenced.difference(&existing).cloned().collect())
    }

    fn upload_all(&self, page_id: &str, image_dir: &Path, names: &[String]) -> Result<(), PublishError> {
        names.par_iter().try_for_each(|name| {
            self.attachments
                .ensure(page_id, &image_dir.join(name))
                .map(|attachment| debug!(filename = %name, id = %attachment.id, "Attachment uploaded"))
                .map_err(PublishError::remote("upload attachment", name))
        })
    }
}

/// Read `files` in order and join them into one Markdown document.
///
/// # Errors
///
/// Returns `PublishError::Read` for the first file that cannot be read.
pub fn concatenate(files: &[PathBuf]) -> Result<String, PublishError> {
    let mut parts = Vec::with_capacity(files.len());
    for path in files {
        let content = std::fs::read_to_string(path).map_err(|source| PublishError::Read {
            path: path.clone(),
            source,
        })?;
        parts.push(content);
    }
    Ok(parts.join(FILE_SEPARATOR))
}

//! Result types for publish operations.

/// What a publish run did, or would do in a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Body and attachments already up to date.
    Skipped,
    /// Body up to date; missing attachments were uploaded.
    Healed,
    /// Body written as a new page version.
    Updated { version: u32 },
    /// Dry run: nothing would change.
    WouldSkip,
    /// Dry run: attachments would be uploaded.
    WouldHeal,
    /// Dry run: the body would be written as `version`.
    WouldUpdate { version: u32 },
}

impl PublishOutcome {
    /// Whether the run wrote anything to Confluence.
    #[must_use]
    pub fn changed_remote(&self) -> bool {
        matches!(self, Self::Healed | Self::Updated { .. })
    }
}

/// Report of a publish run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub page_id: String,
    pub outcome: PublishOutcome,
    /// Export hash of the generated body.
    pub hash: String,
    /// Number of Markdown files concatenated.
    pub files: usize,
    /// Attachments uploaded (or that would be, in a dry run).
    pub uploaded: Vec<String>,
    /// Referenced attachments with no local file in the image directory.
    pub missing_local: Vec<String>,
    /// Conversion warnings.
    pub warnings: Vec<String>,
}

//! In-memory Confluence for publisher tests.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use confpub_project::{OrderingResolver, ProjectError};

use crate::error::ConfluenceError;
use crate::repository::{AttachmentRepository, PageInfo, PageRepository, PropertyStore};
use crate::types::Attachment;

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub page: Option<PageInfo>,
    pub body: Option<String>,
    pub attachments: BTreeSet<String>,
    pub hash: Option<String>,
    pub fail_put: bool,
    /// Write calls in order: `put`, `ensure:<name>`, `set_hash`.
    pub writes: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct MockConfluence {
    pub state: Mutex<MockState>,
}

impl MockConfluence {
    pub fn with_page(id: &str, title: &str, version: u32) -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().page = Some(PageInfo {
            id: id.to_owned(),
            title: title.to_owned(),
            version,
        });
        mock
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.writes().iter().filter(|w| w.starts_with(prefix)).count()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }
}

fn not_found() -> ConfluenceError {
    ConfluenceError::HttpResponse {
        status: 404,
        body: "No content found".to_owned(),
    }
}

impl PageRepository for MockConfluence {
    fn get(&self, page_id: &str) -> Result<Option<PageInfo>, ConfluenceError> {
        let state = self.state.lock().unwrap();
        Ok(state.page.clone().filter(|p| p.id == page_id))
    }

    fn put_storage_body(
        &self,
        page_id: &str,
        xhtml: &str,
        title: &str,
        version: u32,
    ) -> Result<PageInfo, ConfluenceError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_put {
            return Err(ConfluenceError::HttpResponse {
                status: 409,
                body: "version conflict".to_owned(),
            });
        }
        let page = state.page.as_mut().filter(|p| p.id == page_id).ok_or_else(not_found)?;
        assert_eq!(version, page.version + 1, "version must increase by one");
        page.version = version;
        page.title = title.to_owned();
        let info = page.clone();
        state.body = Some(xhtml.to_owned());
        state.writes.push("put".to_owned());
        Ok(info)
    }
}

impl AttachmentRepository for MockConfluence {
    fn list(&self, _page_id: &str) -> Result<BTreeSet<String>, ConfluenceError> {
        Ok(self.state.lock().unwrap().attachments.clone())
    }

    fn ensure(&self, _page_id: &str, file: &Path) -> Result<Attachment, ConfluenceError> {
        std::fs::metadata(file)?;
        let name = file.file_name().unwrap().to_string_lossy().into_owned();
        let mut state = self.state.lock().unwrap();
        state.attachments.insert(name.clone());
        state.writes.push(format!("ensure:{name}"));
        Ok(Attachment {
            id: format!("att-{name}"),
            title: name,
        })
    }
}

impl PropertyStore for MockConfluence {
    fn get_export_hash(&self, _page_id: &str) -> Result<Option<String>, ConfluenceError> {
        Ok(self.state.lock().unwrap().hash.clone())
    }

    fn set_export_hash(&self, _page_id: &str, hash: &str) -> Result<(), ConfluenceError> {
        let mut state = self.state.lock().unwrap();
        state.hash = Some(hash.to_owned());
        state.writes.push("set_hash".to_owned());
        Ok(())
    }
}

/// Resolver returning a fixed file list.
pub(crate) struct FixedOrder(pub Vec<PathBuf>);

impl OrderingResolver for FixedOrder {
    fn resolve(&self, _root: &Path, _markdown_dir: &Path) -> Result<Vec<PathBuf>, ProjectError> {
        Ok(self.0.clone())
    }
}

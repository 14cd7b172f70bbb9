//! Attachment operations for Confluence API.

use rand::RngExt;
use tracing::info;

use super::{ConfluenceClient, check_status};
use crate::error::ConfluenceError;
use crate::types::{Attachment, AttachmentsResponse};

/// Attachments requested per listing call.
const PAGE_SIZE: usize = 100;

impl ConfluenceClient {
    /// Upload an attachment, updating the existing one when the name is taken.
    pub(crate) fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<Attachment, ConfluenceError> {
        info!("Uploading attachment '{}' to page {}", filename, page_id);
        let url = format!("{}/content/{}/child/attachment", self.api_url(), page_id);

        match self.post_attachment(&url, filename, data, content_type) {
            Ok(body) => {
                let response: AttachmentsResponse = serde_json::from_str(&body)?;
                response
                    .results
                    .into_iter()
                    .next()
                    .ok_or_else(|| ConfluenceError::HttpResponse {
                        status: 200,
                        body: "Empty attachment response".to_owned(),
                    })
            }
            Err(ConfluenceError::HttpResponse { status, body }) if is_duplicate_attachment(status, &body) => {
                let Some(existing) = self.find_attachment_by_name(page_id, filename)? else {
                    return Err(ConfluenceError::HttpResponse { status, body });
                };
                info!(
                    "Updating existing attachment '{}' (id={})",
                    filename, existing.id
                );
                let url = format!(
                    "{}/content/{}/child/attachment/{}/data",
                    self.api_url(),
                    page_id,
                    existing.id
                );
                let body = self.post_attachment(&url, filename, data, content_type)?;
                Ok(serde_json::from_str(&body)?)
            }
            Err(e) => Err(e),
        }
    }

    /// POST a multipart file upload and return the response body.
    fn post_attachment(
        &self,
        url: &str,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, ConfluenceError> {
        let boundary = format!("----ConfpubFormBoundary{:016x}", rand::rng().random::<u64>());
        let body = multipart_body(&boundary, filename, data, content_type);

        let response = self
            .agent
            .post(url)
            .header("Authorization", &self.authorization)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .send(&body[..])?;

        Ok(check_status(response)?.read_to_string()?)
    }

    /// List all attachments on a page, following pagination.
    pub(crate) fn get_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, ConfluenceError> {
        info!("Getting attachments for page {}", page_id);

        let mut attachments = Vec::new();
        let mut start = 0;
        loop {
            let url = format!(
                "{}/content/{}/child/attachment?start={}&limit={}",
                self.api_url(),
                page_id,
                start,
                PAGE_SIZE
            );

            let response = self
                .agent
                .get(&url)
                .header("Authorization", &self.authorization)
                .header("Accept", "application/json")
                .call()?;

            let page: AttachmentsResponse = check_status(response)?.read_json()?;
            let count = page.results.len();
            attachments.extend(page.results);
            if count == 0 || page.links.next.is_none() {
                break;
            }
            start += count;
        }
        Ok(attachments)
    }

    /// Find attachment by filename on a page.
    fn find_attachment_by_name(
        &self,
        page_id: &str,
        filename: &str,
    ) -> Result<Option<Attachment>, ConfluenceError> {
        Ok(self
            .get_attachments(page_id)?
            .into_iter()
            .find(|a| a.title == filename))
    }
}

/// Whether a failed create was rejected because the filename already exists.
fn is_duplicate_attachment(status: u16, body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    status == 400 && (body.contains("same file name") || body.contains("already exists"))
}

fn multipart_body(boundary: &str, filename: &str, data: &[u8], content_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"minorEdit\"\r\n\r\ntrue\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// MIME type for an attachment, by extension.
pub(crate) fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_attachment_detection() {
        assert!(is_duplicate_attachment(
            400,
            "Cannot add a new attachment with same file name as an existing attachment: a.png"
        ));
        assert!(is_duplicate_attachment(400, "Attachment a.png Already Exists"));
        assert!(!is_duplicate_attachment(400, "Bad request"));
        assert!(!is_duplicate_attachment(500, "same file name"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.PNG"), "image/png");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("diagram.svg"), "image/svg+xml");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_multipart_body() {
        let body = multipart_body("XYZ", "a.png", b"DATA", "image/png");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\nDATA\r\n"));
        assert!(text.contains("name=\"minorEdit\"\r\n\r\ntrue\r\n"));
        assert!(text.ends_with("--XYZ--\r\n"));
    }
}

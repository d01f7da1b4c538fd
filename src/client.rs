//! HTTP client for the documents API, for services and front ends that
//! upload receipts or link to them.

use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::config::ServerConfig;
use crate::models::CreatedDocument;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("documents API returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Link to a stored document. Without a base the link is relative to the
/// current origin.
pub fn document_url(base: Option<&str>, id: &str) -> String {
    let path = format!("/api/documents/{}", urlencoding::encode(id));
    match base.map(|b| b.trim_end_matches('/')).filter(|b| !b.is_empty()) {
        Some(base) => format!("{base}{path}"),
        None => path,
    }
}

pub struct DocumentsClient {
    client: Client,
    base_url: String,
}

impl DocumentsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client for this service as configured: `APP_URL` when set, otherwise
    /// the listen address (`0.0.0.0` is reached through `localhost`).
    pub fn from_config(config: &ServerConfig) -> Self {
        match config.app_url.as_deref() {
            Some(app_url) => Self::new(app_url),
            None => {
                let host = match config.host.as_str() {
                    "0.0.0.0" | "::" => "localhost",
                    host => host,
                };
                Self::new(&format!("http://{}:{}", host, config.port))
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn document_url(&self, id: &str) -> String {
        document_url(Some(&self.base_url), id)
    }

    /// Upload a receipt as `multipart/form-data` and return the stored record.
    pub async fn upload_document(
        &self,
        file: Vec<u8>,
        filename: &str,
        content_type: &str,
        width: u32,
        height: u32,
        expense_id: Option<&str>,
    ) -> Result<CreatedDocument, ClientError> {
        let part = Part::bytes(file)
            .file_name(filename.to_string())
            .mime_str(content_type)?;

        let mut form = Form::new()
            .part("file", part)
            .text("width", width.to_string())
            .text("height", height.to_string());
        if let Some(expense_id) = expense_id {
            form = form.text("expenseId", expense_id.to_string());
        }

        let response = self
            .client
            .post(format!("{}/api/documents", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

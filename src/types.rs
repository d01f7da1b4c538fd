// Type definitions shared across handlers and the model layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Provider-specific `response_format` payload (e.g. a JSON schema).
    pub response_format: Option<serde_json::Value>,
}

/// Content part for multimodal messages (text, images)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>, // "low", "high", or "auto"
    },
}

/// Message content - can be simple text or multimodal (text + images)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Multimodal(Vec<ContentPart>),
}

impl MessageContent {
    /// Get the text content (for simple text or first text part in multimodal)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(s) => Some(s),
            MessageContent::Multimodal(parts) => parts.iter().find_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            }),
        }
    }

    pub fn image_urls(&self) -> Vec<&str> {
        match self {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Multimodal(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ImageUrl { url, .. } => Some(url.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user", "assistant", "system"
    pub content: MessageContent,
}

impl LLMMessage {
    /// Create a user message with image (for vision models)
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Multimodal(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    url: image_url.into(),
                    detail: None,
                },
            ]),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Errors surfaced by the HTTP handlers and the extraction helper.
///
/// Detail carried by `Database`, `LLMApi` and `Internal` is for logs only;
/// responses use a fixed message per variant.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("S3 upload not enabled")]
    ServiceDisabled,

    #[error("Receipt extraction is not enabled")]
    FeatureDisabled,

    #[error("{0}")]
    MissingInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("file too large")]
    PayloadTooLarge,

    #[error("No document URL available for extraction")]
    NoDocumentUrl,

    #[error("upload failed")]
    UploadFailed,

    #[error("failed to fetch object")]
    FetchFailed,

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ServiceDisabled | AppError::FeatureDisabled => StatusCode::NOT_IMPLEMENTED,
            AppError::MissingInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NoDocumentUrl => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::LLMApi(_) => StatusCode::BAD_GATEWAY,
            AppError::UploadFailed
            | AppError::FetchFailed
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::LLMApi(_) => "model request failed".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

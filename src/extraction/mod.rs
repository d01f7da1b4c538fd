//! Receipt extraction
//!
//! Resolves an uploaded document to a short-lived signed URL, asks a vision
//! model to read the receipt, and parses the reply into amount, category,
//! date and title.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::db::{CategorySource, DocumentRepository};
use crate::llm::LLMAdapter;
use crate::models::{AppState, Category};
use crate::storage::{ObjectStore, ObjectUrls, SIGNED_URL_TTL};
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

/// Fields read from a receipt.
///
/// `amount` is NaN when the model did not return a number; it serializes
/// as `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptExtraction {
    pub amount: f64,
    pub category_id: Option<String>,
    pub date: Option<String>,
    pub title: Option<String>,
}

/// Turns a stored document into a [`ReceiptExtraction`].
pub struct ReceiptExtractor {
    config: ExtractionConfig,
    store: Option<Arc<dyn ObjectStore>>,
    urls: ObjectUrls,
    documents: Arc<dyn DocumentRepository>,
    categories: Arc<dyn CategorySource>,
    model: Arc<dyn LLMAdapter>,
}

impl ReceiptExtractor {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            config: state.config.extraction.clone(),
            store: state.store.clone(),
            urls: state.urls.clone(),
            documents: state.documents.clone(),
            categories: state.categories.clone(),
            model: state.model.clone(),
        }
    }

    pub async fn extract(&self, id: &str) -> AppResult<ReceiptExtraction> {
        if !self.config.enabled {
            return Err(AppError::FeatureDisabled);
        }

        let categories = self.categories.list().await?;
        let signed_url = self.resolve_signed_url(id).await?;

        let request = LLMRequest {
            model: self.config.model.clone(),
            messages: vec![LLMMessage::user_with_image(
                build_prompt(&categories),
                signed_url,
            )],
            max_tokens: None,
            temperature: None,
            response_format: self.config.structured_output.then(response_format),
        };

        info!(
            document_id = %id,
            model = %request.model,
            categories = categories.len(),
            "Extracting receipt"
        );

        let response = self.model.create_chat_completion(&request).await?;
        debug!(document_id = %id, reply = %response.content, "Model reply");

        Ok(parse_reply(&response.content))
    }

    async fn resolve_signed_url(&self, id: &str) -> AppResult<String> {
        let document = self
            .documents
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Document not found.".to_string()))?;

        if document.url.trim().is_empty() {
            return Err(AppError::NoDocumentUrl);
        }

        let key = self.urls.key_for_url(&document.url);
        if key.is_empty() {
            return Err(AppError::NoDocumentUrl);
        }

        let store = self.store.as_ref().ok_or(AppError::ServiceDisabled)?;
        let url = store
            .sign_url(&key, SIGNED_URL_TTL)
            .await
            .map_err(|e| AppError::Internal(format!("failed to sign {key}: {e}")))?;

        if url.is_empty() {
            return Err(AppError::NoDocumentUrl);
        }
        Ok(url)
    }
}

pub fn build_prompt(categories: &[Category]) -> String {
    let categories = categories
        .iter()
        .map(Category::prompt_label)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "This image contains a receipt.\n\
         Read the total amount and store it as a non-formatted number without any other text or currency.\n\
         Then guess the category for this receipt among the following categories and store its ID: {categories}.\n\
         Guess the expense's date and store it as yyyy-mm-dd.\n\
         Guess a title for the expense.\n\
         Return the amount, the category, the date and the title with just a comma between them, without anything else."
    )
}

/// JSON schema `response_format` used when structured output is enabled.
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "receipt",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "amount": { "type": ["number", "null"] },
                    "categoryId": { "type": ["string", "null"] },
                    "date": { "type": ["string", "null"] },
                    "title": { "type": ["string", "null"] }
                },
                "required": ["amount", "categoryId", "date", "title"],
                "additionalProperties": false
            }
        }
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredReply {
    #[serde(default)]
    amount: Value,
    #[serde(default)]
    category_id: Value,
    #[serde(default)]
    date: Value,
    #[serde(default)]
    title: Value,
}

/// Parse a model reply, preferring a JSON object and falling back to the
/// comma-separated form.
pub fn parse_reply(reply: &str) -> ReceiptExtraction {
    let trimmed = reply.trim();
    if trimmed.starts_with('{') {
        match serde_json::from_str::<StructuredReply>(trimmed) {
            Ok(structured) => {
                return ReceiptExtraction {
                    amount: amount_from_value(&structured.amount),
                    category_id: text_from_value(&structured.category_id),
                    date: text_from_value(&structured.date),
                    title: text_from_value(&structured.title),
                }
            }
            Err(e) => warn!(error = %e, "Reply looked like JSON but did not decode"),
        }
    }
    parse_comma_reply(reply)
}

/// `amount, category id, date, title`; the title keeps any further commas.
pub fn parse_comma_reply(reply: &str) -> ReceiptExtraction {
    let mut parts = reply.splitn(4, ',');
    let amount = parts.next().map(parse_amount).unwrap_or(f64::NAN);
    let category_id = parts.next().and_then(non_empty);
    let date = parts.next().and_then(non_empty);
    let title = parts.next().and_then(non_empty);

    ReceiptExtraction {
        amount,
        category_id,
        date,
        title,
    }
}

/// Only finite numbers count; `inf` and `nan` spelled out by the model do not.
fn parse_amount(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .unwrap_or(f64::NAN)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn amount_from_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_amount(s),
        _ => f64::NAN,
    }
}

fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

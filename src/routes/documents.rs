use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::extraction::{ReceiptExtraction, ReceiptExtractor};
use crate::models::{AppState, CreatedDocument, ExpenseDocument};
use crate::storage::{attachment_disposition, build_key, PutObject};
use crate::types::{AppError, AppResult};

/// Room for multipart boundaries and the small text fields on top of the
/// file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

pub fn router(state: AppState) -> Router {
    let body_limit = state
        .config
        .storage
        .max_file_size
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/documents", post(upload_document))
        .route("/api/documents/{id}", get(get_document))
        .route("/api/documents/{id}/extract", post(extract_receipt))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Fields collected from the upload form.
#[derive(Default)]
struct UploadForm {
    file: Option<Bytes>,
    filename: Option<String>,
    content_type: Option<String>,
    width: Option<String>,
    height: Option<String>,
    expense_id: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    form.filename = field
                        .file_name()
                        .filter(|n| !n.is_empty())
                        .map(str::to_string);
                    form.content_type = field.content_type().map(str::to_string);
                    form.file = Some(field.bytes().await.map_err(multipart_error)?);
                }
                "width" => form.width = Some(field.text().await.map_err(multipart_error)?),
                "height" => form.height = Some(field.text().await.map_err(multipart_error)?),
                "expenseId" => {
                    form.expense_id = Some(field.text().await.map_err(multipart_error)?)
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge;
    }
    error!(error = %err.body_text(), "Failed to read multipart body");
    AppError::UploadFailed
}

fn parse_dimension(value: Option<&str>) -> Option<i32> {
    value?.trim().parse::<i32>().ok().filter(|v| *v > 0)
}

/// `POST /api/documents`
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<CreatedDocument>> {
    let store = state.store()?.clone();

    let multipart = multipart.map_err(|e| {
        warn!(error = %e, "Rejected upload body");
        AppError::MissingInput("No file uploaded".to_string())
    })?;
    let form = UploadForm::read(multipart).await?;

    let body = form
        .file
        .ok_or_else(|| AppError::MissingInput("No file uploaded".to_string()))?;

    let (Some(width), Some(height)) = (
        parse_dimension(form.width.as_deref()),
        parse_dimension(form.height.as_deref()),
    ) else {
        return Err(AppError::MissingInput(
            "Missing width or height".to_string(),
        ));
    };

    if body.len() > state.config.storage.max_file_size {
        warn!(
            size = body.len(),
            max = state.config.storage.max_file_size,
            "Upload exceeds size limit"
        );
        return Err(AppError::PayloadTooLarge);
    }

    let id = Uuid::new_v4().to_string();
    let key = build_key(&id);
    let filename = form.filename.unwrap_or_else(|| id.clone());
    let content_type = form
        .content_type
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
    let expense_id = form
        .expense_id
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    info!(
        document_id = %id,
        filename = %filename,
        size = body.len(),
        content_type = %content_type,
        "Document upload started"
    );

    store
        .put_object(
            &key,
            PutObject {
                body,
                content_type,
                content_disposition: Some(attachment_disposition(&filename)),
            },
        )
        .await
        .map_err(|e| {
            error!(document_id = %id, key = %key, error = %e, "Failed to store upload");
            AppError::UploadFailed
        })?;

    let record = ExpenseDocument {
        id: id.clone(),
        url: state.urls.build_url(&key),
        width,
        height,
        expense_id,
    };

    let document = match state.documents.insert(&record).await {
        Ok(document) => document,
        Err(e) => {
            error!(document_id = %id, error = %e, "Failed to record upload");
            if let Err(cleanup) = store.delete_object(&key).await {
                warn!(key = %key, error = %cleanup, "Orphaned object left in store");
            }
            return Err(AppError::UploadFailed);
        }
    };

    info!(document_id = %id, "Document upload completed");

    Ok(Json(CreatedDocument { document, filename }))
}

/// `GET /api/documents/{id}`
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let store = state.store()?.clone();

    if id.trim().is_empty() {
        return Err(AppError::MissingInput("Missing id".to_string()));
    }

    let document = state
        .documents
        .find(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    let key = state.urls.key_for_url(&document.url);
    let object = store.get_object(&key).await.map_err(|e| {
        error!(document_id = %id, key = %key, error = %e, "Failed to fetch document");
        AppError::FetchFailed
    })?;

    let content_type = object
        .content_type
        .as_deref()
        .and_then(|t| HeaderValue::from_str(t).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(length) = object.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE));

    Ok((headers, object.body).into_response())
}

/// `POST /api/documents/{id}/extract`
pub async fn extract_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReceiptExtraction>> {
    let extraction = ReceiptExtractor::from_state(&state).extract(&id).await?;
    Ok(Json(extraction))
}

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{
    ports::{file_extension, TextExtractor},
    AnswerPayload, DomainError, QnaRequest, UploadedDocument,
};

/// `POST /qna`: multipart form with `query`, `policy` and any number of `files`.
pub async fn qna_form_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnswerPayload>, ApiError> {
    let mut request = QnaRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "query" => request.query = field.text().await.map_err(bad_form)?,
            "policy" => request.policy = field.text().await.map_err(bad_form)?,
            "files" | "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                // Browsers send an empty part when no file was picked.
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                let text = extract(state.extractor.clone(), &filename, bytes.to_vec()).await?;
                request.documents.push(UploadedDocument::new(filename, text));
            }
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    respond(&state, request).await
}

/// `POST /api/v1/qna`: the same request as JSON, with documents already as text.
pub async fn qna_json_handler(
    State(state): State<AppState>,
    Json(request): Json<QnaRequest>,
) -> Result<Json<AnswerPayload>, ApiError> {
    respond(&state, request).await
}

async fn respond(state: &AppState, request: QnaRequest) -> Result<Json<AnswerPayload>, ApiError> {
    let payload = state.qna.respond(request).await?;
    info!(verdict = ?payload.verdict, "question answered");
    Ok(Json(payload))
}

async fn extract(
    extractor: Arc<dyn TextExtractor>,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<String, DomainError> {
    let extension = file_extension(filename);
    if !extractor.supports(&extension) {
        return Err(DomainError::unsupported_file_type(extension));
    }

    let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes, &extension))
        .await
        .map_err(|e| DomainError::internal(format!("extraction task failed: {e}")))??;
    debug!(filename, chars = text.chars().count(), "file extracted");

    Ok(text)
}

fn bad_form(err: axum::extract::multipart::MultipartError) -> DomainError {
    DomainError::validation(format!("invalid multipart form: {}", err.body_text()))
}

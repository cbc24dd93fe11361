//! Route handlers

use super::error::ApiError;
use super::AppState;
use crate::gateway::GenerationRequest;
use crate::history::remote::run_blocking;
use crate::history::{HistoryPage, HistoryQuery, HistoryStats, NewHistoryEntry, RemoteHistoryItem};
use crate::orchestrator::{EntryPoint, GenerationOptions};
use crate::schema::SchemaDocument;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// JSON body of `POST /generate-schema`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateSchemaBody {
    /// Base64 image or `data:` URI
    pub image: String,
    pub prompt: String,
}

/// Successful generation response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSchemaResponse {
    pub success: bool,
    pub schema: SchemaDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
}

/// Query string of `GET /history`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
    pub success: Option<String>,
}

/// Fields of a multipart upload
#[derive(Debug, Default)]
struct UploadForm {
    image: Option<(Bytes, String)>,
    prompt: String,
    schema: Option<String>,
    processing_time: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::validation(format!("Failed to read image field: {}", e))
                })?;
                form.image = Some((data, filename));
            }
            "prompt" | "schema" | "processingTime" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::validation(format!("Failed to read {} field: {}", name, e))
                })?;
                match name.as_str() {
                    "prompt" => form.prompt = text,
                    "schema" => form.schema = Some(text),
                    _ => form.processing_time = Some(text),
                }
            }
            other => tracing::debug!("Ignoring multipart field {}", other),
        }
    }
    Ok(form)
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// `POST /generate-schema`
///
/// JSON bodies require a prompt and are not persisted. Multipart uploads
/// make the prompt optional and save successful results to remote history.
pub async fn generate_schema(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<GenerateSchemaResponse>> {
    if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        let form = read_upload(multipart).await?;
        let (image, filename) = form.image.unwrap_or_default();
        let options = GenerationOptions::new(EntryPoint::Upload).with_remote_save(filename);

        let outcome = state
            .orchestrator
            .run(GenerationRequest::new(image, form.prompt), options)
            .await?;

        return Ok(Json(GenerateSchemaResponse {
            success: true,
            schema: outcome.schema,
            history_id: outcome.history_id,
            processing_time: Some(outcome.processing_time_ms),
        }));
    }

    let Json(body) = Json::<GenerateSchemaBody>::from_request(request, &state)
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?;
    let generation = GenerationRequest::from_base64(&body.image, body.prompt)?;

    let outcome = state
        .orchestrator
        .run(generation, GenerationOptions::new(EntryPoint::Json))
        .await?;

    Ok(Json(GenerateSchemaResponse {
        success: true,
        schema: outcome.schema,
        history_id: None,
        processing_time: None,
    }))
}

/// `GET /history`
pub async fn list_history(
    State(state): State<AppState>,
    params: std::result::Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<HistoryPage>> {
    let Query(params) = params.map_err(|e| ApiError::validation(e.body_text()))?;
    let limit = params
        .limit
        .unwrap_or(state.history.default_page_size)
        .clamp(1, state.history.max_page_size);
    let mut query = HistoryQuery::new(params.page.unwrap_or(1), limit);
    if let Some(search) = params.search {
        query = query.with_search(search);
    }
    if let Some(success) = params.success.filter(|value| !value.is_empty()) {
        query = query.with_success(success == "true");
    }

    let remote = state.remote.clone();
    Ok(Json(run_blocking(move || remote.list(&query)).await?))
}

/// `POST /history`
pub async fn create_history(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<RemoteHistoryItem>> {
    let multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;
    let form = read_upload(multipart).await?;

    let (Some((image, filename)), Some(schema)) = (form.image, form.schema) else {
        return Err(ApiError::validation("Missing required fields"));
    };
    if form.prompt.trim().is_empty() || image.is_empty() {
        return Err(ApiError::validation("Missing required fields"));
    }
    let schema = SchemaDocument::parse(&schema)
        .map_err(|e| ApiError::validation(format!("Invalid schema: {}", e)))?;
    let processing_time_ms = form
        .processing_time
        .and_then(|value| value.trim().parse::<u64>().ok());

    let item = state
        .remote
        .create(NewHistoryEntry {
            prompt: form.prompt,
            image,
            filename,
            schema,
            processing_time_ms,
        })
        .await?;
    Ok(Json(item))
}

/// `GET /history/stats`
pub async fn history_stats(State(state): State<AppState>) -> ApiResult<Json<HistoryStats>> {
    let remote = state.remote.clone();
    Ok(Json(run_blocking(move || remote.stats()).await?))
}

/// `GET /history/:id`
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RemoteHistoryItem>> {
    let remote = state.remote.clone();
    run_blocking(move || remote.get(&id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("History item not found"))
}

/// `DELETE /history/:id`
pub async fn delete_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if state.remote.delete(&id).await? {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::not_found("History item not found"))
    }
}

/// `GET /blobs/*path`
pub async fn get_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    if path.split('/').any(|segment| segment == "..") {
        return Err(ApiError::validation("Invalid blob path"));
    }
    let data = state
        .blobs
        .get(&path)
        .await?
        .ok_or_else(|| ApiError::not_found("Blob not found"))?;

    let content_type = image::ImageFormat::from_path(&path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

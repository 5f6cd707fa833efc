use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ServiceError, StoreError};
use crate::models::*;
use crate::parser::ReportMeta;
use crate::service::ReportService;

const DEFAULT_REPORT_NAME: &str = "Untitled report";

pub struct AppState {
    pub service: ReportService,
    /// Owner recorded on uploads and used for every lookup
    pub owner: String,
    pub max_upload_bytes: usize,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health))
        .route("/api/report/upload", post(upload_report))
        .route("/api/reports", get(list_reports))
        .route("/api/report/{id}", get(get_report).delete(delete_report))
        .route("/api/report/{id}/records", get(report_records))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    #[serde(default)]
    include_all_records: bool,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn upload_report(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, (StatusCode, String)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload.txt").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read name: {}", e)))?;
                let text = text.trim();
                if !text.is_empty() {
                    name = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or((StatusCode::BAD_REQUEST, "Missing 'file' field".to_string()))?;

    if !is_plain_file_name(&file_name) {
        return Err((StatusCode::BAD_REQUEST, "Invalid filename".to_string()));
    }

    let text = String::from_utf8(bytes)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Log file is not valid UTF-8".to_string()))?;

    let report_name = name.unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string());
    let meta = ReportMeta::new(&report_name, &file_name, &state.owner);
    let parser = state.service.parser();

    let parsed = tokio::task::spawn_blocking(move || {
        let start = std::time::Instant::now();
        let result = parser.parse(&text, meta);
        tracing::info!(
            file = %file_name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Parsed upload"
        );
        result
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task failed: {}", e)))?
    .map_err(|e| service_error(e.into()))?;

    for note in &parsed.notes {
        tracing::debug!(line = note.line, "{}", note.message);
    }

    let report = state.service.add_report(parsed).await.map_err(service_error)?;
    let location = format!("/api/report/{}", report.id);

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(report)).into_response())
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Report>, (StatusCode, String)> {
    check_id(&id)?;
    state
        .service
        .get_report(&state.owner, &id, query.include_all_records)
        .await
        .map_err(service_error)?
        .map(Json)
        .ok_or_else(not_found)
}

async fn report_records(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HealRecord>>, (StatusCode, String)> {
    check_id(&id)?;
    state
        .service
        .heal_records(&state.owner, &id)
        .await
        .map_err(service_error)?
        .map(Json)
        .ok_or_else(not_found)
}

async fn list_reports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReportShell>>, (StatusCode, String)> {
    state
        .service
        .list_reports(&state.owner)
        .await
        .map(Json)
        .map_err(service_error)
}

async fn delete_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    check_id(&id)?;
    if state
        .service
        .delete_report(&state.owner, &id)
        .await
        .map_err(service_error)?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

fn check_id(id: &str) -> Result<(), (StatusCode, String)> {
    if id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err((StatusCode::BAD_REQUEST, "Invalid report id".to_string()));
    }
    Ok(())
}

/// A single path component: no separators, not `.` or `..`
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Report not found".to_string())
}

fn service_error(e: ServiceError) -> (StatusCode, String) {
    match e {
        ServiceError::Parse(e) => (StatusCode::UNPROCESSABLE_ENTITY, format!("Parse failed at {}", e)),
        ServiceError::Store(StoreError::InvalidKey(key)) => {
            (StatusCode::BAD_REQUEST, format!("Invalid key '{}'", key))
        }
        ServiceError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        ServiceError::Task(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Task failed: {}", e)),
    }
}

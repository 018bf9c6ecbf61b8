#![cfg(feature = "web")]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, Request, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::collection::AppLists;
use crate::config::Config;
use crate::description::{Description, DescriptionRequest, DescriptionStore};
use crate::error::{AppError, AppResult};
use crate::ingest::{self, DroppedRow, IngestCounts, SheetReport};
use crate::links::{self, StoreLink};
use crate::record::{ListSelector, Record};
use crate::snapshot::SnapshotStore;
use crate::template::{self, TemplateKind};
use crate::view::{RankingView, SortDirection, SortKey};

/// Uploads larger than this are rejected before parsing.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Multipart field carrying the workbook.
const UPLOAD_FIELD: &str = "file";

pub struct AppState {
    pub store: SnapshotStore,
    pub descriptions: DescriptionStore,
}

#[derive(Deserialize)]
struct ListQuery {
    search: Option<String>,
    category: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

#[derive(Deserialize)]
struct TemplateQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct AppStoreQuery {
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    data: AppLists,
    counts: IngestCounts,
    sheets: Vec<SheetReport>,
    skipped_sheets: Vec<String>,
    dropped_rows: Vec<DroppedRow>,
}

#[derive(Serialize)]
struct StoredDescription {
    description: String,
}

#[derive(Serialize)]
struct SaveResponse {
    success: bool,
    message: String,
    timestamp: String,
}

/// Builds the router over an existing store.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/data", get(get_all))
        .route("/api/excel-data", get(get_collection))
        .route("/api/list/:kind", get(get_list))
        .route("/api/categories/:kind", get(get_categories))
        .route("/api/upload", post(upload_workbook))
        .route("/api/save-data", post(save_data))
        .route("/api/excel-template", get(excel_template))
        .route("/api/description/:id", get(get_description))
        .route("/api/generate-description", post(generate_description))
        .route("/api/app-store", get(app_store))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_requests))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = Arc::new(AppState {
        store: config.snapshot_store(),
        descriptions: config.description_store(),
    });
    info!("snapshot file: {}", app_state.store.path().display());
    info!("descriptions dir: {}", app_state.descriptions.dir().display());

    let app = router(app_state).nest_service("/static", ServeDir::new(&config.static_dir));

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Listening on http://{}", config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    if status.is_server_error() {
        error!("{} {} -> {} ({:?})", method, path, status, started.elapsed());
    } else {
        info!("{} {} -> {} ({:?})", method, path, status, started.elapsed());
    }
    response
}

/// Runs file and spreadsheet work on the blocking pool.
async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(AppError::Io(format!("background task failed: {}", e))),
    }
}

async fn get_all(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Record>>> {
    let lists = blocking(move || state.store.read_or_fallback()).await?;
    Ok(Json(lists.all))
}

async fn get_collection(State(state): State<Arc<AppState>>) -> AppResult<Json<AppLists>> {
    let lists = blocking(move || state.store.read_or_fallback()).await?;
    Ok(Json(lists))
}

async fn get_list(
    kind: Result<Path<String>, PathRejection>,
    params: Result<Query<ListQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<Record>>> {
    // Reject bad parameters before touching the snapshot.
    let Path(kind) = kind?;
    let Query(params) = params?;
    let selector: ListSelector = kind.parse()?;
    let sort = match params.sort.as_deref() {
        Some(key) => {
            let dir = match params.order.as_deref() {
                Some(order) => order.parse::<SortDirection>()?,
                None => SortDirection::Asc,
            };
            Some((key.parse::<SortKey>()?, dir))
        }
        None => None,
    };

    let lists = blocking(move || state.store.read_or_fallback()).await?;
    let mut view = RankingView::new(lists.select(selector).to_vec());
    if let Some(term) = params.search {
        view.set_search_term(term);
    }
    if let Some(category) = params.category {
        view.set_selected_category(category);
    }
    if let Some((key, dir)) = sort {
        view.set_sort(key, dir);
    }

    Ok(Json(view.into_filtered()))
}

async fn get_categories(
    kind: Result<Path<String>, PathRejection>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<String>>> {
    let Path(kind) = kind?;
    let selector: ListSelector = kind.parse()?;
    let lists = blocking(move || state.store.read_or_fallback()).await?;
    let view = RankingView::new(lists.select(selector).to_vec());
    Ok(Json(view.categories().to_vec()))
}

async fn upload_workbook(
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let mut file_data: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed upload: {}", e)))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("malformed upload: {}", e)))?;
            file_data = Some(bytes);
        }
    }

    let file_data = file_data
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Validation(format!("no file received in field '{}'", UPLOAD_FIELD)))?;
    info!("received workbook upload of {} bytes", file_data.len());

    let report = blocking(move || ingest::ingest_bytes(&file_data)).await?;
    let counts = report.counts();

    Ok(Json(UploadResponse {
        data: report.data,
        counts,
        sheets: report.sheets,
        skipped_sheets: report.skipped_sheets,
        dropped_rows: report.dropped_rows,
    }))
}

async fn save_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> AppResult<Json<SaveResponse>> {
    let Json(body) = body?;
    let outcome = blocking(move || state.store.write_json(body)).await?;
    Ok(Json(SaveResponse {
        success: true,
        message: "data saved".to_string(),
        timestamp: outcome.timestamp.to_rfc3339(),
    }))
}

async fn excel_template(
    params: Result<Query<TemplateQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(params) = params?;
    let kind = match params.kind.as_deref() {
        Some(raw) => raw.parse::<TemplateKind>()?,
        None => TemplateKind::All,
    };
    let buffer = blocking(move || template::generate(kind)).await?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", kind.file_name()),
            ),
        ],
        buffer,
    )
        .into_response())
}

async fn get_description(
    id: Result<Path<String>, PathRejection>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<StoredDescription>> {
    let Path(id) = id?;
    let text = blocking(move || state.descriptions.read(&id)).await?;
    Ok(Json(StoredDescription {
        description: text.unwrap_or_default(),
    }))
}

async fn generate_description(
    State(state): State<Arc<AppState>>,
    req: Result<Json<DescriptionRequest>, JsonRejection>,
) -> AppResult<Json<Description>> {
    let Json(req) = req?;
    let description = blocking(move || state.descriptions.describe(&req)).await?;
    Ok(Json(description))
}

async fn app_store(
    params: Result<Query<AppStoreQuery>, QueryRejection>,
) -> AppResult<Json<StoreLink>> {
    let Query(params) = params?;
    let name = params
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("missing product name".to_string()))?;
    Ok(Json(links::app_store_link(&name)))
}

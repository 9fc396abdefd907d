use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    extract::multipart::{Field, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    Json,
};
use futures::stream::{self, Stream};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;
use crate::server::AppState;
use crate::server::errors::ApiError;
use crate::server::openapi;
use crate::importer::ImportReport;
use crate::inventory::Inventory;
use crate::sock::{Sock, SockRequest, StockFilter};
use crate::storage::SqliteStore;
use crate::{Error, ImportError};

/// Multipart field holding the uploaded file
pub const UPLOAD_FIELD: &str = "content";

type ApiResult<T> = Result<Json<T>, ApiError>;

fn body(payload: Result<Json<SockRequest>, JsonRejection>) -> Result<SockRequest, ApiError> {
    payload
        .map(|Json(request)| request)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

pub async fn get_quantity(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StockFilter>, QueryRejection>,
) -> ApiResult<i64> {
    let Query(filter) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let total = state
        .with_store(move |store| Inventory::new(store).quantity_with_filter(&filter))
        .await?;
    Ok(Json(total))
}

pub async fn register_income(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SockRequest>, JsonRejection>,
) -> ApiResult<Sock> {
    let request = body(payload)?;
    let sock = state
        .with_store(move |store| Inventory::new(store).register_income(&request))
        .await?;
    Ok(Json(sock))
}

pub async fn register_outcome(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SockRequest>, JsonRejection>,
) -> ApiResult<String> {
    let request = body(payload)?;
    state
        .with_store(move |store| Inventory::new(store).register_outcome(&request))
        .await?;
    Ok(Json("Outcome of socks registered successfully".to_string()))
}

pub async fn get_sock(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Sock> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let sock = state
        .with_store(move |store| Inventory::new(store).get_sock(id))
        .await?;
    Ok(Json(sock))
}

pub async fn update_sock(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SockRequest>, JsonRejection>,
) -> ApiResult<Sock> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let request = body(payload)?;
    let sock = state
        .with_store(move |store| Inventory::new(store).update_sock(id, &request))
        .await?;
    Ok(Json(sock))
}

pub async fn upload_batch(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ImportReport> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            return import_upload(&state, field).await;
        }
    }

    Err(ApiError::bad_request(format!("Missing multipart field '{}'", UPLOAD_FIELD)))
}

/// Stream one uploaded file through the importer under the import lock and timeout
async fn import_upload(state: &AppState, mut field: Field<'_>) -> ApiResult<ImportReport> {
    let file_name = field.file_name().unwrap_or("unnamed").to_string();
    tracing::info!("Uploading file: {}", file_name);

    // One import at a time against the socks table
    let _guard = state.import_lock.lock().await;

    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(CHUNKS_IN_FLIGHT);
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let path = state.database_path.clone();
    let options = state.import_options.clone();
    let reader = SyncIoBridge::new(StreamReader::new(chunk_stream(rx)));
    let mut worker = tokio::task::spawn_blocking(move || -> crate::Result<ImportReport> {
        let store = SqliteStore::connect(&path)?;
        Inventory::new(&store).import_csv(reader, &options, &worker_cancel, None)
    });

    let upload = async {
        forward_chunks(&mut field, tx).await;
        (&mut worker).await
    };
    let outcome = tokio::time::timeout(state.import_timeout, upload).await;

    let report = match outcome {
        Ok(joined) => joined.map_err(|e| Error::Task(e.to_string()))??,
        Err(_) => {
            cancel.cancel();
            let imported = match worker.await {
                Ok(Ok(partial)) => partial.imported,
                Ok(Err(Error::Import(ImportError::Storage { imported, .. }))) => imported,
                _ => 0,
            };
            tracing::warn!("Import of {} timed out, {} rows committed", file_name, imported);
            return Err(Error::Import(ImportError::TimedOut {
                secs: state.import_timeout.as_secs(),
                imported,
            })
            .into());
        }
    };

    tracing::info!(
        "Import of {} done: {} imported, {} failed",
        file_name, report.imported, report.failed
    );
    Ok(Json(report))
}

/// Upload chunks buffered between the request and the import worker
const CHUNKS_IN_FLIGHT: usize = 4;

/// Feed the upload to the worker; dropping `tx` marks the end of input
async fn forward_chunks(field: &mut Field<'_>, tx: mpsc::Sender<io::Result<Bytes>>) {
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => Ok(chunk),
            Ok(None) => break,
            Err(e) => Err(io::Error::other(e.body_text())),
        };
        let failed = chunk.is_err();
        if tx.send(chunk).await.is_err() || failed {
            // Worker gone (fatal header error) or the upload broke off
            break;
        }
    }
}

fn chunk_stream(
    rx: mpsc::Receiver<io::Result<Bytes>>,
) -> Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>> {
    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}

pub async fn api_docs() -> Json<serde_json::Value> {
    Json(openapi::document())
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::config::SockshopConfig;
use crate::importer::ImportOptions;
use crate::storage::SqliteStore;

pub mod errors;
pub mod openapi;
pub mod routes;

/// Server state
pub struct AppState {
    pub database_path: PathBuf,
    pub import_options: ImportOptions,
    pub import_timeout: Duration,
    pub max_upload_bytes: usize,
    /// Held for the whole duration of a batch import
    pub import_lock: Mutex<()>,
}

impl AppState {
    /// Build state from configuration, migrating the database once up front
    pub fn from_config(config: &SockshopConfig) -> anyhow::Result<Self> {
        let database_path = config.database_path();
        crate::config::ensure_db_dir(&database_path)?;
        let store = SqliteStore::open(&database_path)?;
        let stats = store.stats()?;
        tracing::info!(
            "Database {} ready (schema v{}, {} positions)",
            database_path.display(), stats.schema_version, stats.positions
        );

        Ok(Self {
            database_path,
            import_options: ImportOptions { delimiter: config.delimiter()? },
            import_timeout: config.import_timeout(),
            max_upload_bytes: config.max_upload_bytes(),
            import_lock: Mutex::new(()),
        })
    }

    /// Run `f` on a connection opened for this call only
    pub async fn with_store<T, F>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&SqliteStore) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.database_path.clone();
        tokio::task::spawn_blocking(move || {
            let store = SqliteStore::connect(&path)?;
            f(&store)
        })
        .await
        .map_err(|e| crate::Error::Task(e.to_string()))?
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/api/socks", get(routes::get_quantity))
        .route("/api/socks/income", post(routes::register_income))
        .route("/api/socks/outcome", post(routes::register_outcome))
        .route(
            "/api/socks/batch",
            post(routes::upload_batch).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/socks/{id}", get(routes::get_sock).put(routes::update_sock))
        .route("/api-docs", get(routes::api_docs))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &SockshopConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(config)?);
    let app = router(state);

    let addr = format!("{}:{}", config.host(), config.port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on {}", listener.local_addr()?);
    println!("🌍 Server running at http://{}", addr);
    println!("📘 API document at http://{}/api-docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "sockshop-test-boundary";

    fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let config = SockshopConfig {
            database: Some(dir.path().join("test.db").to_string_lossy().to_string()),
            ..Default::default()
        };
        Arc::new(AppState::from_config(&config).unwrap())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_request(field: &str, csv: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"socks.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = field,
            csv = csv
        );
        Request::builder()
            .method("POST")
            .uri("/api/socks/batch")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_income_then_quantity() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (status, sock) = send(
            router(state.clone()),
            json_request("POST", "/api/socks/income", json!({"color": "red", "cottonPercentage": 40, "quantity": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sock["quantity"], 10);
        assert_eq!(sock["cottonPercentage"], 40);

        let request = Request::builder()
            .uri("/api/socks?color=red&minCottonPercentage=30&maxCottonPercentage=50")
            .body(Body::empty())
            .unwrap();
        let (status, total) = send(router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(total, json!(10));
    }

    #[tokio::test]
    async fn test_invalid_filter_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .uri("/api/socks?color=red&minCottonPercentage=60&maxCottonPercentage=40")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(test_state(&dir)), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");
    }

    #[tokio::test]
    async fn test_validation_errors_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            router(test_state(&dir)),
            json_request("POST", "/api/socks/income", json!({"color": "", "cottonPercentage": 140})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(body["message"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_outcome_without_stock() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (status, _) = send(
            router(state.clone()),
            json_request("POST", "/api/socks/outcome", json!({"color": "red", "cottonPercentage": 40, "quantity": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(
            router(state.clone()),
            json_request("POST", "/api/socks/income", json!({"color": "red", "cottonPercentage": 40, "quantity": 1})),
        )
        .await;
        let (status, body) = send(
            router(state),
            json_request("POST", "/api/socks/outcome", json!({"color": "red", "cottonPercentage": 40, "quantity": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("Not enough"));
    }

    #[tokio::test]
    async fn test_update_and_get_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (_, sock) = send(
            router(state.clone()),
            json_request("POST", "/api/socks/income", json!({"color": "red", "cottonPercentage": 40, "quantity": 10})),
        )
        .await;
        let id = sock["id"].as_i64().unwrap();

        let (status, updated) = send(
            router(state.clone()),
            json_request("PUT", &format!("/api/socks/{}", id), json!({"color": "blue", "cottonPercentage": 50, "quantity": 20})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["color"], "blue");

        let request = Request::builder().uri(format!("/api/socks/{}", id)).body(Body::empty()).unwrap();
        let (status, fetched) = send(router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["quantity"], 20);

        let request = Request::builder().uri("/api/socks/9999").body(Body::empty()).unwrap();
        let (status, _) = send(router(state), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_upload_reports_row_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let csv = "color;cottonPercentage;quantity\nred;40;10\nblue;abc;5\ngreen;10;1";
        let (status, report) = send(router(state.clone()), upload_request("content", csv)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["imported"], 2);
        assert_eq!(report["failed"], 1);
        assert_eq!(report["errors"][0]["row"], 2);
        assert_eq!(report["errors"][0]["column"], "cottonPercentage");

        let request = Request::builder().uri("/api/socks?color=red").body(Body::empty()).unwrap();
        let (_, total) = send(router(state), request).await;
        assert_eq!(total, json!(10));
    }

    #[tokio::test]
    async fn test_batch_upload_fatal_and_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (status, body) = send(
            router(state.clone()),
            upload_request("content", "color;color;quantity\nred;red;1"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("Duplicate header column"));

        let (status, _) = send(router(state), upload_request("file", "color;cottonPercentage;quantity")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_income_past_stock_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let max = crate::sock::MAX_QUANTITY;

        let (status, _) = send(
            router(state.clone()),
            json_request("POST", "/api/socks/income", json!({"color": "red", "cottonPercentage": 40, "quantity": max})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            router(state.clone()),
            json_request("POST", "/api/socks/income", json!({"color": "red", "cottonPercentage": 40, "quantity": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"].as_array().unwrap().len(), 1);

        let request = Request::builder().uri("/api/socks?color=red").body(Body::empty()).unwrap();
        let (status, total) = send(router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(total, json!(max));
    }

    #[tokio::test]
    async fn test_slow_import_times_out_and_keeps_committed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = SockshopConfig {
            database: Some(dir.path().join("test.db").to_string_lossy().to_string()),
            ..Default::default()
        };
        let mut state = AppState::from_config(&config).unwrap();
        state.import_timeout = Duration::from_millis(1);
        let state = Arc::new(state);

        let rows = 20_000;
        let mut csv = String::from("color;cottonPercentage;quantity\n");
        for _ in 0..rows {
            csv.push_str("red;40;1\n");
        }

        let (status, body) = send(router(state.clone()), upload_request("content", &csv)).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert!(body["message"].as_str().unwrap().contains("timed out"));

        let request = Request::builder().uri("/api/socks?color=red").body(Body::empty()).unwrap();
        let (_, total) = send(router(state), request).await;
        assert!(total.as_i64().unwrap() < rows);
    }

    #[tokio::test]
    async fn test_imports_wait_for_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        // Stand in for an import already running
        let running = state.import_lock.lock().await;

        let pending = tokio::spawn(send(
            router(state.clone()),
            upload_request("content", "color;cottonPercentage;quantity\nred;40;3"),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!pending.is_finished());

        let store = SqliteStore::connect(&state.database_path).unwrap();
        assert_eq!(store.total_quantity("red", 0, 100).unwrap(), 0);

        drop(running);
        let (status, report) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["imported"], 1);
        assert_eq!(store.total_quantity("red", 0, 100).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_api_docs_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let request = Request::builder().uri("/api-docs").body(Body::empty()).unwrap();
        let (status, doc) = send(router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/api/socks/batch"].is_object());

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

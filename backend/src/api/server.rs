//! HTTP server for the installation dashboard.
//!
//! Stateless between requests: each upload is parsed, aggregated and
//! discarded. The only shared state is the immutable [`PipelineConfig`].
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | GET    | `/api/dashboard`  | Awaiting-input state                 |
//! | POST   | `/api/upload`     | Upload CSV (multipart field `file`)  |
//! | POST   | `/api/records`    | Compute from JSON rows               |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::logs::LOG_BROADCASTER;
use super::types::{DashboardResponse, RecordsRequest, UploadParams};
use crate::config::{PipelineConfig, MAX_UPLOAD_BYTES};
use crate::error::{PipelineError, PipelineResult, ServerResult};
use crate::metrics::pipeline::{dashboard_from_bytes, dashboard_from_rows, Dashboard, DashboardState};

/// Shared, read-only server state.
pub type AppState = Arc<PipelineConfig>;

type ApiResult = Result<Json<DashboardResponse>, (StatusCode, Json<DashboardResponse>)>;

/// Build the router (without binding).
pub fn router(config: PipelineConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route("/api/upload", post(upload_csv))
        .route("/api/records", post(upload_records))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server
pub async fn start_server(port: u16, config: PipelineConfig) -> ServerResult<()> {
    info!(
        "Pipeline config: dedupe={}, columns=[{}]",
        config.dedupe,
        config.column_map.required().join(", ")
    );
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("🚀 Installation dashboard API on http://localhost:{}", port);
    info!("   POST /api/upload    - Upload CSV file");
    info!("   POST /api/records   - Compute from JSON rows");
    info!("   GET  /api/dashboard - Empty dashboard state");
    info!("   GET  /api/logs      - SSE log stream");
    info!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "installboard",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "records": "POST /api/records",
            "dashboard": "GET /api/dashboard",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// Nothing uploaded yet
async fn dashboard() -> Json<DashboardResponse> {
    Json(DashboardResponse::from(DashboardState::from(None::<PipelineResult<Dashboard>>)))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();
    info!("📡 Log stream opened ({} listener(s))", LOG_BROADCASTER.subscriber_count());

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
async fn upload_csv(
    State(config): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> ApiResult {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let config = effective_config(&config, &params);
    let result = file_data.filter(|b| !b.is_empty()).map(|bytes| {
        info!(
            "📄 New upload: {} ({} bytes)",
            file_name.as_deref().unwrap_or("unknown"),
            bytes.len()
        );
        dashboard_from_bytes(&bytes, &config)
    });

    if result.is_none() {
        info!("Upload without a file, awaiting input");
    }
    respond(result)
}

/// JSON rows endpoint
async fn upload_records(
    State(config): State<AppState>,
    Query(params): Query<UploadParams>,
    Json(request): Json<RecordsRequest>,
) -> ApiResult {
    let config = effective_config(&config, &params);
    respond(Some(
        dashboard_from_rows(request.rows, request.columns, &config).map_err(PipelineError::from),
    ))
}

fn effective_config(config: &PipelineConfig, params: &UploadParams) -> PipelineConfig {
    let mut config = config.clone();
    if let Some(dedupe) = params.dedupe {
        config.dedupe = dedupe;
    }
    config
}

/// Map a pipeline result (`None`: nothing uploaded) to a status code and payload.
fn respond(result: Option<PipelineResult<Dashboard>>) -> ApiResult {
    let status = match &result {
        None | Some(Ok(_)) => StatusCode::OK,
        Some(Err(PipelineError::Metrics(_))) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(Err(PipelineError::Csv(_))) => StatusCode::BAD_REQUEST,
    };

    let response = DashboardResponse::from(DashboardState::from(result));
    if status.is_success() {
        if let Some(metrics) = &response.metrics {
            info!(
                "📊 {} installed / {} required ({}%)",
                metrics.total_installed, metrics.total_required, metrics.overall_completion
            );
        }
        Ok(Json(response))
    } else {
        Err((status, Json(response)))
    }
}

fn bad_request(message: String) -> (StatusCode, Json<DashboardResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(DashboardResponse::error(message, Vec::new())),
    )
}

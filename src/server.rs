use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::controller::ScanController;
use crate::query::QuerySource;
use crate::types::{ScanConfigPatch, ScanProfile, ScanSessionState};

/// Operator-facing view of the controller state.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub state: String, // "idle" | "scanning"
    pub cursor: String,
    pub total: u64,
    pub processed: u64,
    pub record_count: usize,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl Status {
    fn from_snapshot(snapshot: &ScanSessionState) -> Self {
        Self {
            state: if snapshot.running { "scanning" } else { "idle" }.to_string(),
            cursor: snapshot.cursor.clone(),
            total: snapshot.progress.total,
            processed: snapshot.progress.processed,
            record_count: snapshot.records.len(),
            started_at: snapshot.started_at.clone(),
            finished_at: snapshot.finished_at.clone(),
        }
    }
}

/// Config update body: all fields optional, absent fields unchanged.
#[derive(Debug, Deserialize)]
pub struct ConfigRequest {
    #[serde(flatten)]
    pub patch: ScanConfigPatch,
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub result_bound: usize,
    pub page_work_hint: usize,
    pub match_pattern: String,
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub profile: ScanProfile,
}

/// Serve the operator surface over the given controller. Issues the one-shot
/// keyspace-total fetch on attach, then blocks serving requests.
pub async fn spawn_server<Q: QuerySource>(
    bind: &str,
    controller: Arc<ScanController<Q>>,
) -> Result<()> {
    controller.update_total_keys().await;

    let api = Router::new()
        .route("/status", get(get_status::<Q>))
        .route("/start", post(post_start::<Q>))
        .route("/stop", post(post_stop::<Q>))
        .route("/config", post(post_config::<Q>))
        .route("/profile", post(post_profile::<Q>))
        .route("/records", get(get_records::<Q>))
        .route("/table", get(get_table::<Q>))
        .with_state(controller);

    let app = Router::new().nest("/api", api);

    tracing::info!(%bind, "operator surface listening");
    axum::serve(tokio::net::TcpListener::bind(bind).await?, app).await?;
    Ok(())
}

async fn get_status<Q: QuerySource>(
    State(controller): State<Arc<ScanController<Q>>>,
) -> impl IntoResponse {
    let snapshot = controller.snapshot().await;
    (StatusCode::OK, Json(Status::from_snapshot(&snapshot)))
}

async fn post_start<Q: QuerySource>(
    State(controller): State<Arc<ScanController<Q>>>,
) -> impl IntoResponse {
    controller.start().await;
    let snapshot = controller.snapshot().await;
    (StatusCode::ACCEPTED, Json(Status::from_snapshot(&snapshot)))
}

async fn post_stop<Q: QuerySource>(
    State(controller): State<Arc<ScanController<Q>>>,
) -> impl IntoResponse {
    controller.stop().await;
    let snapshot = controller.snapshot().await;
    (StatusCode::OK, Json(Status::from_snapshot(&snapshot)))
}

async fn post_config<Q: QuerySource>(
    State(controller): State<Arc<ScanController<Q>>>,
    Json(request): Json<ConfigRequest>,
) -> impl IntoResponse {
    if let Some(interval_ms) = request.interval_ms {
        // Changing the interval stops a live scan rather than re-timing it;
        // the operator restarts explicitly.
        controller.set_interval_ms(interval_ms).await;
    }
    let config = controller.set_config(request.patch).await;
    let out = ConfigResponse {
        result_bound: config.result_bound,
        page_work_hint: config.page_work_hint,
        match_pattern: config.match_pattern,
        interval_ms: controller.interval_ms(),
    };
    (StatusCode::OK, Json(out))
}

async fn post_profile<Q: QuerySource>(
    State(controller): State<Arc<ScanController<Q>>>,
    Json(request): Json<ProfileRequest>,
) -> impl IntoResponse {
    // Upstream target changed: stop and re-derive defaults, no auto-restart.
    let config = controller.change_source_defaults(request.profile).await;
    let out = ConfigResponse {
        result_bound: config.result_bound,
        page_work_hint: config.page_work_hint,
        match_pattern: config.match_pattern,
        interval_ms: controller.interval_ms(),
    };
    (StatusCode::OK, Json(out))
}

async fn get_records<Q: QuerySource>(
    State(controller): State<Arc<ScanController<Q>>>,
) -> impl IntoResponse {
    let snapshot = controller.snapshot().await;
    (StatusCode::OK, Json(snapshot.records))
}

async fn get_table<Q: QuerySource>(
    State(controller): State<Arc<ScanController<Q>>>,
) -> impl IntoResponse {
    (StatusCode::OK, Json(controller.table().await))
}

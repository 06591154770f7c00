use crate::build_info;
use crate::model::HealthStatus;
use crate::util::{IntoJson, WebResult};
use crate::AppState;
use axum::extract::State;
use axum::Json;

/// GET /api/health
///
/// 只反映进程存活，不探测 APS 连通性
pub async fn health_check(State(app_state): State<AppState>) -> Json<WebResult> {
    let status = HealthStatus {
        status: "ok".to_string(),
        version: build_info::package_version().to_string(),
        uptime: app_state.started_at.elapsed().as_secs(),
        timestamp: chrono::Local::now().to_rfc3339(),
        bucket: app_state.aps.bucket_key().to_string(),
    };
    WebResult::ok(status).into_json()
}

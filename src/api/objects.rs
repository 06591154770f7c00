//! 存储桶对象管理接口

use crate::aps::ApsError;
use crate::model::aps::ListObjectsQuery;
use crate::util::{IntoJson, ServerError, WebResult};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::utils::is_valid_upload_name;

/// GET /api/objects
pub async fn list_objects(
    State(app_state): State<AppState>,
    Query(query): Query<ListObjectsQuery>,
) -> Result<Json<WebResult>, ServerError> {
    let token = app_state.aps.get_access_token().await?;
    let page = app_state
        .aps
        .list_objects(&token.access_token, app_state.aps.bucket_key(), &query)
        .await?;
    Ok(WebResult::ok(page).into_json())
}

/// DELETE /api/objects/:object_name
pub async fn delete_object(
    State(app_state): State<AppState>,
    Path(object_name): Path<String>,
) -> Result<Json<WebResult>, ServerError> {
    if !is_valid_upload_name(&object_name) {
        return Err(ServerError::BadRequest(format!(
            "Invalid object name: {}",
            object_name
        )));
    }

    let token = app_state.aps.get_access_token().await?;
    match app_state
        .aps
        .delete_object(&token.access_token, app_state.aps.bucket_key(), &object_name)
        .await
    {
        Ok(()) => Ok(WebResult::ok(json!({ "objectName": object_name })).into_json()),
        Err(ApsError::Delete { status, .. }) if status == StatusCode::NOT_FOUND => Err(
            ServerError::NotFound(format!("Object not found: {}", object_name)),
        ),
        Err(e) => Err(e.into()),
    }
}

//! 上传与查看页面
//!
//! GET/POST `/`：上传文件后走完整的上传转换流程，返回 Viewer 页面；
//! GET/POST `/params`：对上传目录中已有的文件重新发起流程，同时收集六个数值参数。

use crate::aps::{ViewerPipeline, ViewerSession};
use crate::model::{ModelParameters, ObjectDescriptor, ParameterForm};
use crate::util::logging::standards::events;
use crate::util::middleware::RequestId;
use crate::util::page::PageRenderer;
use crate::util::ServerError;
use crate::AppState;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::{Extension, Form};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::utils::{
    generate_object_name, is_valid_upload_name, list_uploaded_names, prune_uploads,
};

const FILE_FIELD: &str = "file";

/// GET /
pub async fn upload_form(State(app_state): State<AppState>) -> Html<String> {
    Html(PageRenderer::upload_form(app_state.config.uploads.max_upload_mb))
}

/// POST /
pub async fn upload_and_view(
    State(app_state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    mut multipart: Multipart,
) -> Result<Html<String>, ServerError> {
    let request_id = request_id.map(|Extension(id)| id.0).unwrap_or_default();
    let upload_dir = PathBuf::from(&app_state.config.uploads.directory);

    let mut stored = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        if original_name.trim().is_empty() {
            warn!(
                event = events::UPLOAD_REJECTED,
                request_id = %request_id,
                reason = "empty_filename",
                "上传被拒绝：未选择文件"
            );
            return Err(ServerError::BadRequest("No selected file".to_string()));
        }

        let object_name = generate_object_name(&original_name);
        info!(
            event = events::UPLOAD_RECEIVED,
            request_id = %request_id,
            original_name = %original_name,
            object = %object_name,
            "收到上传文件"
        );

        let local_path = upload_dir.join(&object_name);
        let size = save_field(field, &upload_dir, &local_path).await?;
        info!(
            event = events::UPLOAD_STORED,
            request_id = %request_id,
            object = %object_name,
            size = size,
            path = %local_path.display(),
            "上传文件已保存"
        );
        if app_state.config.uploads.retain_local_files {
            prune_local_copies(&upload_dir, app_state.config.uploads.max_retained_files).await;
        }
        stored = Some(ObjectDescriptor {
            object_name,
            local_path,
            bucket_key: app_state.aps.bucket_key().to_string(),
        });
        break;
    }

    let Some(descriptor) = stored else {
        warn!(
            event = events::UPLOAD_REJECTED,
            request_id = %request_id,
            reason = "missing_file_part",
            "上传被拒绝：缺少文件字段"
        );
        return Err(ServerError::BadRequest("No file part".to_string()));
    };

    let result = ViewerPipeline::new(&app_state.aps, &app_state.config.translation)
        .run(&descriptor)
        .await;

    if !app_state.config.uploads.retain_local_files {
        remove_local_copy(&descriptor.local_path).await;
    }

    Ok(render_viewer(&app_state, &result?))
}

/// GET /params
pub async fn parameter_form(
    State(app_state): State<AppState>,
) -> Result<Html<String>, ServerError> {
    let upload_dir = PathBuf::from(&app_state.config.uploads.directory);
    let names = list_uploaded_names(&upload_dir).await?;
    Ok(Html(PageRenderer::parameter_form(&names)))
}

/// POST /params
///
/// 参数只记录日志，不参与转换任务。
pub async fn view_with_parameters(
    State(app_state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Form(form): Form<ParameterForm>,
) -> Result<Html<String>, ServerError> {
    let request_id = request_id.map(|Extension(id)| id.0).unwrap_or_default();
    let parameters = ModelParameters::from_form(&form)
        .map_err(|field| ServerError::BadRequest(format!("Invalid numeric value for {}", field)))?;

    if parameters.filename.is_empty() {
        return Err(ServerError::BadRequest("No file name".to_string()));
    }
    if !is_valid_upload_name(&parameters.filename) {
        return Err(ServerError::BadRequest(format!(
            "Invalid file name: {}",
            parameters.filename
        )));
    }

    let local_path = Path::new(&app_state.config.uploads.directory).join(&parameters.filename);
    if !tokio::fs::try_exists(&local_path).await.unwrap_or(false) {
        return Err(ServerError::NotFound(format!(
            "Uploaded file not found: {}",
            parameters.filename
        )));
    }

    // 每次请求使用新的对象名，本地文件复用
    let object_name = generate_object_name(&parameters.filename);
    info!(
        event = events::PARAMS_RECEIVED,
        request_id = %request_id,
        file = %parameters.filename,
        object = %object_name,
        params = ?parameters.params,
        "收到模型参数"
    );

    let descriptor = ObjectDescriptor {
        object_name,
        local_path,
        bucket_key: app_state.aps.bucket_key().to_string(),
    };
    let session = ViewerPipeline::new(&app_state.aps, &app_state.config.translation)
        .run(&descriptor)
        .await?;

    Ok(render_viewer(&app_state, &session))
}

fn render_viewer(app_state: &AppState, session: &ViewerSession) -> Html<String> {
    Html(PageRenderer::viewer(
        &session.access_token,
        &session.urn,
        &app_state.config.translation.viewer_version,
    ))
}

/// 逐块写入上传文件，失败时删除残留文件
async fn save_field(
    mut field: Field<'_>,
    upload_dir: &Path,
    local_path: &Path,
) -> Result<u64, ServerError> {
    tokio::fs::create_dir_all(upload_dir).await?;
    let mut file = tokio::fs::File::create(local_path).await?;

    let mut written: u64 = 0;
    let outcome: Result<(), ServerError> = async {
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = outcome {
        drop(file);
        remove_local_copy(local_path).await;
        return Err(e);
    }
    Ok(written)
}

async fn remove_local_copy(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(
            event = events::UPLOAD_CLEANUP,
            path = %path.display(),
            "已删除本地上传文件"
        ),
        Err(e) => warn!(
            event = events::UPLOAD_CLEANUP,
            path = %path.display(),
            error = %e,
            "删除本地上传文件失败"
        ),
    }
}

async fn prune_local_copies(upload_dir: &Path, keep: usize) {
    match prune_uploads(upload_dir, keep.max(1)).await {
        Ok(removed) if !removed.is_empty() => info!(
            event = events::UPLOAD_CLEANUP,
            removed = removed.len(),
            keep = keep,
            "已清理较早的本地上传文件"
        ),
        Ok(_) => {}
        Err(e) => warn!(
            event = events::UPLOAD_CLEANUP,
            dir = %upload_dir.display(),
            error = %e,
            "清理本地上传文件失败"
        ),
    }
}

fn multipart_error(err: MultipartError) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(err.body_text())
    } else {
        ServerError::BadRequest(err.body_text())
    }
}

//! Centralised logging metadata (event names, shared keys, etc.).

/// Canonical event names used across the service.
pub mod events {
    /// HTTP request lifecycle.
    pub const REQUEST_START: &str = "request.start";
    pub const REQUEST_COMPLETE: &str = "request.complete";
    pub const REQUEST_ERROR: &str = "request.error";
    pub const REQUEST_SLOW: &str = "request.slow";

    /// 上传入口
    pub const UPLOAD_RECEIVED: &str = "upload.received";
    pub const UPLOAD_REJECTED: &str = "upload.rejected";
    pub const UPLOAD_STORED: &str = "upload.stored";
    pub const UPLOAD_CLEANUP: &str = "upload.cleanup";
    pub const PARAMS_RECEIVED: &str = "params.received";

    /// APS 认证
    pub const APS_TOKEN_REQUEST: &str = "aps.token.request";
    pub const APS_TOKEN_ISSUED: &str = "aps.token.issued";
    pub const APS_TOKEN_FAILED: &str = "aps.token.failed";

    /// APS 对象存储
    pub const OSS_TICKET_ISSUED: &str = "aps.oss.ticket_issued";
    pub const OSS_TRANSFER_COMPLETE: &str = "aps.oss.transfer_complete";
    pub const OSS_TRANSFER_FAILED: &str = "aps.oss.transfer_failed";
    pub const OSS_FINALIZED: &str = "aps.oss.finalized";
    pub const OSS_FINALIZE_FAILED: &str = "aps.oss.finalize_failed";
    pub const OSS_DELETED: &str = "aps.oss.deleted";
    pub const OSS_DELETE_FAILED: &str = "aps.oss.delete_failed";
    pub const OSS_LISTED: &str = "aps.oss.listed";

    /// 模型转换
    pub const TRANSLATION_SUBMITTED: &str = "aps.translation.submitted";
    pub const TRANSLATION_POLL: &str = "aps.translation.poll";
    pub const TRANSLATION_SUCCESS: &str = "aps.translation.success";
    pub const TRANSLATION_FAILED: &str = "aps.translation.failed";
    pub const TRANSLATION_TIMEOUT: &str = "aps.translation.timeout";

    /// 整体流水线
    pub const PIPELINE_START: &str = "pipeline.start";
    pub const PIPELINE_COMPLETE: &str = "pipeline.complete";
    pub const PIPELINE_ERROR: &str = "pipeline.error";
}

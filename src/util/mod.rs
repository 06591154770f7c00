use crate::aps::ApsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;

pub mod config;
pub mod http_client;
pub mod log;
pub mod logging;
pub mod middleware;
pub mod page;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebResult {
    pub success: bool,
    #[serde(rename = "errorCode")]
    pub code: u32,
    #[serde(rename = "errorMsg")]
    pub msg: String,
    pub data: Value,
}

/// 处理请求时的错误，统一映射为 HTTP 状态码
#[derive(Debug)]
pub enum ServerError {
    /// 请求参数/上传内容不合法
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    /// APS 调用链路失败
    Upstream(ApsError),
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Upstream(ApsError::TranslationTimeout { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ServerError::Upstream(ApsError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::BadRequest(msg)
            | ServerError::NotFound(msg)
            | ServerError::PayloadTooLarge(msg) => write!(f, "{}", msg),
            ServerError::Upstream(err) => write!(f, "{}", err),
            ServerError::Internal(msg) => write!(f, "Server internal error: {}", msg),
        }
    }
}

impl From<ApsError> for ServerError {
    fn from(err: ApsError) -> Self {
        ServerError::Upstream(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "请求处理失败");
        }
        let body = WebResult::err_with_code(status.as_u16() as u32, self);
        (status, body.into_json()).into_response()
    }
}

impl WebResult {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            success: true,
            code: 200,
            msg: "".to_string(),
            data: json!(data),
        }
    }

    pub fn err_with_code(code: u32, msg: impl ToString) -> Self {
        Self {
            success: false,
            code,
            msg: msg.to_string(),
            data: Default::default(),
        }
    }
}

pub trait IntoJson {
    fn into_json(self) -> Json<WebResult>;
}

impl IntoJson for WebResult {
    fn into_json(self) -> Json<WebResult> {
        Json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ServerError::BadRequest("No file part".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(ApsError::MissingEtag).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServerError::from(ApsError::TranslationTimeout {
                urn: "abc".into(),
                timeout_secs: 120,
            })
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_web_result_serialization() {
        let value = serde_json::to_value(WebResult::err_with_code(400, "No selected file")).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["errorCode"], 400);
        assert_eq!(value["errorMsg"], "No selected file");
    }
}

//! Autodesk Platform Services 客户端
//!
//! 认证、对象存储（OSS）、模型转换（Model Derivative）三组接口，
//! 以及把它们串成"上传 → 转换 → 查看"流程的 [`ViewerPipeline`]。

mod auth;
mod derivative;
mod error;
mod oss;
mod pipeline;
mod urn;

pub use derivative::{PollSettings, TranslationOutput};
pub use error::ApsError;
pub use pipeline::{ViewerPipeline, ViewerSession};
pub use urn::DesignUrn;

use crate::util::config::ApsConfig;
use reqwest::{Client, Response, StatusCode};

/// APS 接口客户端，进程内共享一份
#[derive(Debug, Clone)]
pub struct ApsClient {
    http: Client,
    config: ApsConfig,
}

impl ApsClient {
    pub fn new(http: Client, config: ApsConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ApsConfig {
        &self.config
    }

    pub fn bucket_key(&self) -> &str {
        &self.config.bucket_key
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn object_endpoint(&self, bucket_key: &str, object_name: &str) -> String {
        self.endpoint(&format!(
            "/oss/v2/buckets/{}/objects/{}",
            urlencoding::encode(bucket_key),
            urlencoding::encode(object_name)
        ))
    }
}

/// 读取失败响应的状态码与正文，正文读取失败时留空
async fn read_error_body(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

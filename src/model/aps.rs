//! APS 接口报文结构

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 认证接口返回的访问令牌
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// 签名直传凭据
#[derive(Debug, Clone, Deserialize)]
pub struct UploadTicket {
    #[serde(rename = "uploadKey")]
    pub upload_key: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// 直传完成后的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// 去掉引号后的 ETag
    pub etag: String,
    /// 实际上传的字节数
    pub size: u64,
}

/// 完成上传请求体
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeUploadRequest {
    #[serde(rename = "uploadKey")]
    pub upload_key: String,
    #[serde(rename = "eTags")]
    pub etags: Vec<String>,
    pub size: u64,
}

/// 完成上传后返回的对象信息
#[derive(Debug, Clone, Deserialize)]
pub struct FinalizedObject {
    #[serde(rename = "objectId")]
    pub object_id: String,
    #[serde(rename = "objectKey", default)]
    pub object_key: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// 存储桶中的对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketObject {
    #[serde(rename = "bucketKey")]
    pub bucket_key: String,
    #[serde(rename = "objectKey")]
    pub object_key: String,
    #[serde(rename = "objectId")]
    pub object_id: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub location: Option<String>,
}

/// 对象列表分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketObjectPage {
    #[serde(default)]
    pub items: Vec<BucketObject>,
    /// 下一页地址（APS 原样返回）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// 对象列表查询参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListObjectsQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(rename = "beginsWith", default)]
    pub begins_with: Option<String>,
    #[serde(rename = "startAt", default)]
    pub start_at: Option<String>,
}

/// 转换任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestStatus {
    Pending,
    Success,
    Failed,
}

impl ManifestStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "success" => ManifestStatus::Success,
            "failed" => ManifestStatus::Failed,
            _ => ManifestStatus::Pending,
        }
    }
}

/// 转换任务清单（只解析轮询需要的字段，原文保留用于诊断）
#[derive(Debug, Clone)]
pub struct Manifest {
    pub status: ManifestStatus,
    pub progress: Option<String>,
    pub raw: Value,
}

impl Manifest {
    pub fn from_value(raw: Value) -> Self {
        let status = ManifestStatus::parse(raw.get("status").and_then(Value::as_str).unwrap_or(""));
        let progress = raw
            .get("progress")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            status,
            progress,
            raw,
        }
    }
}

/// 轮询结果：成功、失败、超时三种互不相同的终态
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Success,
    Failed(Value),
    TimedOut,
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manifest_status_parsing() {
        assert_eq!(ManifestStatus::parse("success"), ManifestStatus::Success);
        assert_eq!(ManifestStatus::parse("failed"), ManifestStatus::Failed);
        assert_eq!(ManifestStatus::parse("inprogress"), ManifestStatus::Pending);
        assert_eq!(ManifestStatus::parse("timeout"), ManifestStatus::Pending);

        let manifest = Manifest::from_value(json!({"status": "inprogress", "progress": "25% complete"}));
        assert_eq!(manifest.status, ManifestStatus::Pending);
        assert_eq!(manifest.progress.as_deref(), Some("25% complete"));

        let manifest = Manifest::from_value(json!({"type": "manifest"}));
        assert_eq!(manifest.status, ManifestStatus::Pending);
    }

    #[test]
    fn test_finalize_request_wire_format() {
        let body = FinalizeUploadRequest {
            upload_key: "key-1".to_string(),
            etags: vec!["abc".to_string()],
            size: 11,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"uploadKey": "key-1", "eTags": ["abc"], "size": 11})
        );
    }
}

use super::{read_error_body, ApsClient, ApsError};
use crate::model::aps::{
    BucketObjectPage, FinalizeUploadRequest, FinalizedObject, ListObjectsQuery, TransferReceipt,
    UploadTicket,
};
use crate::util::logging::standards::events;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// 单页最多返回的对象数
const MAX_LIST_LIMIT: u32 = 100;

impl ApsClient {
    /// 为对象申请单分片的签名直传地址
    pub async fn request_signed_upload(
        &self,
        token: &str,
        bucket_key: &str,
        object_name: &str,
    ) -> Result<UploadTicket, ApsError> {
        let url = format!("{}/signeds3upload", self.object_endpoint(bucket_key, object_name));
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("parts", 1)])
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = read_error_body(response).await;
            warn!(
                status = status.as_u16(),
                bucket = bucket_key,
                object = object_name,
                body = %body,
                "获取签名上传地址失败"
            );
            return Err(ApsError::SignedUpload { status, body });
        }

        let ticket: UploadTicket = response.json().await?;
        debug!(
            event = events::OSS_TICKET_ISSUED,
            object = object_name,
            urls = ticket.urls.len(),
            "已获取签名上传地址"
        );
        Ok(ticket)
    }

    /// 把本地文件整体 PUT 到签名地址
    ///
    /// 大小取自同一次打开的文件元数据，既作为 Content-Length 也写入回执，
    /// 保证完成上传时上报的大小与实际传输一致。
    pub async fn put_object_bytes(
        &self,
        signed_url: &str,
        local_path: &Path,
    ) -> Result<TransferReceipt, ApsError> {
        let file = tokio::fs::File::open(local_path).await?;
        let size = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .http
            .put(signed_url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(body)
            .timeout(self.config.upload_timeout())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(event = events::OSS_TRANSFER_FAILED, error = %e, "文件直传请求失败");
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                event = events::OSS_TRANSFER_FAILED,
                status = status.as_u16(),
                "文件直传失败"
            );
            return Err(ApsError::Transfer { status });
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(strip_etag_quotes)
            .filter(|etag| !etag.is_empty())
            .ok_or(ApsError::MissingEtag)?;

        info!(
            event = events::OSS_TRANSFER_COMPLETE,
            size = size,
            etag = %etag,
            "文件直传完成"
        );
        Ok(TransferReceipt { etag, size })
    }

    /// 上报 ETag 与大小，完成签名直传
    pub async fn finalize_upload(
        &self,
        token: &str,
        bucket_key: &str,
        object_name: &str,
        upload_key: &str,
        receipt: &TransferReceipt,
    ) -> Result<FinalizedObject, ApsError> {
        let url = format!("{}/signeds3upload", self.object_endpoint(bucket_key, object_name));
        let payload = FinalizeUploadRequest {
            upload_key: upload_key.to_string(),
            etags: vec![receipt.etag.clone()],
            size: receipt.size,
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&payload)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = read_error_body(response).await;
            warn!(
                event = events::OSS_FINALIZE_FAILED,
                status = status.as_u16(),
                object = object_name,
                body = %body,
                "完成上传失败"
            );
            return Err(ApsError::Finalize { status, body });
        }

        let object: FinalizedObject = response.json().await?;
        info!(
            event = events::OSS_FINALIZED,
            object = object_name,
            object_id = %object.object_id,
            "上传已完成"
        );
        Ok(object)
    }

    pub async fn delete_object(
        &self,
        token: &str,
        bucket_key: &str,
        object_name: &str,
    ) -> Result<(), ApsError> {
        let response = self
            .http
            .delete(self.object_endpoint(bucket_key, object_name))
            .bearer_auth(token)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = read_error_body(response).await;
            warn!(
                event = events::OSS_DELETE_FAILED,
                status = status.as_u16(),
                object = object_name,
                body = %body,
                "删除对象失败"
            );
            return Err(ApsError::Delete { status, body });
        }

        info!(event = events::OSS_DELETED, object = object_name, "对象已删除");
        Ok(())
    }

    pub async fn list_objects(
        &self,
        token: &str,
        bucket_key: &str,
        query: &ListObjectsQuery,
    ) -> Result<BucketObjectPage, ApsError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = query.limit {
            params.push(("limit", limit.clamp(1, MAX_LIST_LIMIT).to_string()));
        }
        if let Some(prefix) = query.begins_with.as_deref().filter(|s| !s.is_empty()) {
            params.push(("beginsWith", prefix.to_string()));
        }
        if let Some(start_at) = query.start_at.as_deref().filter(|s| !s.is_empty()) {
            params.push(("startAt", start_at.to_string()));
        }

        let url = self.endpoint(&format!(
            "/oss/v2/buckets/{}/objects",
            urlencoding::encode(bucket_key)
        ));
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&params)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = read_error_body(response).await;
            warn!(status = status.as_u16(), body = %body, "查询对象列表失败");
            return Err(ApsError::ListObjects { status, body });
        }

        let page: BucketObjectPage = response.json().await?;
        debug!(event = events::OSS_LISTED, count = page.items.len(), "已查询对象列表");
        Ok(page)
    }
}

/// 去掉 ETag 两端的引号
pub(crate) fn strip_etag_quotes(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aps::test_support;
    use mockito::Matcher;
    use serde_json::json;
    use std::io::Write;

    fn temp_model(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_strip_etag_quotes() {
        assert_eq!(
            strip_etag_quotes("\"9b2cf535f27731c974343645a3985328\""),
            "9b2cf535f27731c974343645a3985328"
        );
        assert_eq!(strip_etag_quotes("abc"), "abc");
        assert_eq!(strip_etag_quotes(" \"\" "), "");
    }

    #[tokio::test]
    async fn test_request_signed_upload_single_part() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/oss/v2/buckets/bucket62218/objects/model.f3d/signeds3upload")
            .match_query(Matcher::UrlEncoded("parts".into(), "1".into()))
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"uploadKey":"key-1","urls":["https://s3.example.com/put"]}"#)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let ticket = client
            .request_signed_upload("tok-1", "bucket62218", "model.f3d")
            .await
            .unwrap();

        assert_eq!(ticket.upload_key, "key-1");
        assert_eq!(ticket.urls, vec!["https://s3.example.com/put".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_object_bytes_reports_exact_size() {
        let content = b"solid body bytes\n";
        let file = temp_model(content);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/put")
            .match_header("content-type", "application/octet-stream")
            .match_header("content-length", content.len().to_string().as_str())
            .match_body(Matcher::Exact(String::from_utf8_lossy(content).into_owned()))
            .with_status(200)
            .with_header("etag", "\"etag-123\"")
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let receipt = client
            .put_object_bytes(&format!("{}/put", server.url()), file.path())
            .await
            .unwrap();

        assert_eq!(receipt.etag, "etag-123");
        assert_eq!(receipt.size, content.len() as u64);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_object_bytes_missing_etag() {
        let file = temp_model(b"abc");

        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("PUT", "/put").with_status(200).create_async().await;

        let client = test_support::client(&server.url());
        let result = client
            .put_object_bytes(&format!("{}/put", server.url()), file.path())
            .await;
        assert!(matches!(result, Err(ApsError::MissingEtag)));
    }

    #[tokio::test]
    async fn test_put_object_bytes_rejected() {
        let file = temp_model(b"abc");

        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("PUT", "/put").with_status(403).create_async().await;

        let client = test_support::client(&server.url());
        let result = client
            .put_object_bytes(&format!("{}/put", server.url()), file.path())
            .await;
        assert!(matches!(result, Err(ApsError::Transfer { status }) if status.as_u16() == 403));
    }

    #[tokio::test]
    async fn test_finalize_sends_receipt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oss/v2/buckets/bucket62218/objects/model.f3d/signeds3upload")
            .match_body(Matcher::Json(json!({
                "uploadKey": "key-1",
                "eTags": ["etag-123"],
                "size": 17
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"objectId":"urn:adsk.objects:os.object:bucket62218/model.f3d","objectKey":"model.f3d","size":17}"#)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let receipt = TransferReceipt {
            etag: "etag-123".to_string(),
            size: 17,
        };
        let object = client
            .finalize_upload("tok-1", "bucket62218", "model.f3d", "key-1", &receipt)
            .await
            .unwrap();

        assert_eq!(object.object_id, "urn:adsk.objects:os.object:bucket62218/model.f3d");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_finalize_failure_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oss/v2/buckets/bucket62218/objects/model.f3d/signeds3upload")
            .with_status(400)
            .with_body(r#"{"reason":"Part Number 1 etag mismatch"}"#)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let receipt = TransferReceipt {
            etag: "wrong".to_string(),
            size: 3,
        };
        match client
            .finalize_upload("tok-1", "bucket62218", "model.f3d", "key-1", &receipt)
            .await
        {
            Err(ApsError::Finalize { status, body }) => {
                assert_eq!(status.as_u16(), 400);
                assert!(body.contains("etag mismatch"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_and_delete_objects() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/oss/v2/buckets/bucket62218/objects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "100".into()),
                Matcher::UrlEncoded("beginsWith".into(), "176".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items":[{"bucketKey":"bucket62218","objectKey":"1760000000000ABCDEFGH.f3d","objectId":"urn:adsk.objects:os.object:bucket62218/1760000000000ABCDEFGH.f3d","size":3}]}"#,
            )
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/oss/v2/buckets/bucket62218/objects/1760000000000ABCDEFGH.f3d")
            .with_status(200)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let query = ListObjectsQuery {
            limit: Some(500),
            begins_with: Some("176".to_string()),
            start_at: None,
        };
        let page = client.list_objects("tok-1", "bucket62218", &query).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].object_key, "1760000000000ABCDEFGH.f3d");
        assert!(page.next.is_none());

        client
            .delete_object("tok-1", "bucket62218", "1760000000000ABCDEFGH.f3d")
            .await
            .unwrap();

        list.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_missing_object() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/oss/v2/buckets/bucket62218/objects/gone.f3d")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let result = client.delete_object("tok-1", "bucket62218", "gone.f3d").await;
        assert!(matches!(result, Err(ApsError::Delete { status, .. }) if status.as_u16() == 404));
    }
}

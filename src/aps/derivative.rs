use super::{read_error_body, ApsClient, ApsError, DesignUrn};
use crate::model::aps::{Manifest, ManifestStatus, PollOutcome};
use crate::util::config::TranslationConfig;
use crate::util::logging::standards::events;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// 转换输出格式与视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutput {
    pub format: String,
    pub views: Vec<String>,
}

impl From<&TranslationConfig> for TranslationOutput {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            format: config.output_format.clone(),
            views: config.views.clone(),
        }
    }
}

/// 轮询参数：固定间隔，总时长封顶
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl From<&TranslationConfig> for PollSettings {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.timeout(),
        }
    }
}

impl ApsClient {
    /// 提交转换任务，只负责提交，不等待完成
    pub async fn submit_translation(
        &self,
        token: &str,
        urn: &DesignUrn,
        output: &TranslationOutput,
    ) -> Result<Value, ApsError> {
        let job = json!({
            "input": { "urn": urn.as_str() },
            "output": {
                "formats": [{ "type": output.format, "views": output.views }]
            }
        });

        let response = self
            .http
            .post(self.endpoint("/modelderivative/v2/designdata/job"))
            .bearer_auth(token)
            .json(&job)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = read_error_body(response).await;
            warn!(
                status = status.as_u16(),
                urn = %urn,
                body = %body,
                "提交模型转换任务失败"
            );
            return Err(ApsError::TranslationSubmit { status, body });
        }

        let accepted: Value = response.json().await?;
        info!(
            event = events::TRANSLATION_SUBMITTED,
            urn = %urn,
            result = accepted.get("result").and_then(|v| v.as_str()).unwrap_or(""),
            "模型转换任务已提交"
        );
        Ok(accepted)
    }

    /// 查询转换清单；非 200 视为尚未就绪，返回 None
    pub async fn fetch_manifest(
        &self,
        token: &str,
        urn: &DesignUrn,
    ) -> Result<Option<Manifest>, ApsError> {
        let url = self.endpoint(&format!(
            "/modelderivative/v2/designdata/{}/manifest",
            urn.as_str()
        ));
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            debug!(
                event = events::TRANSLATION_POLL,
                urn = %urn,
                status = response.status().as_u16(),
                "转换清单尚不可用"
            );
            return Ok(None);
        }

        let raw: Value = response.json().await?;
        Ok(Some(Manifest::from_value(raw)))
    }

    /// 按固定间隔轮询转换状态，直到成功、失败或超时
    ///
    /// 每次查询都受剩余时间约束，整体耗时不会超过 `settings.timeout`。
    /// 查询出错与非 200 响应一样只记录日志，继续等待。
    pub async fn wait_for_translation(
        &self,
        token: &str,
        urn: &DesignUrn,
        settings: PollSettings,
    ) -> PollOutcome {
        let started = Instant::now();
        let deadline = started + settings.timeout;
        let mut attempts: u32 = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            attempts += 1;

            match tokio::time::timeout(remaining, self.fetch_manifest(token, urn)).await {
                Ok(Ok(Some(manifest))) => match manifest.status {
                    ManifestStatus::Success => {
                        info!(
                            event = events::TRANSLATION_SUCCESS,
                            urn = %urn,
                            attempts = attempts,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "模型转换完成"
                        );
                        return PollOutcome::Success;
                    }
                    ManifestStatus::Failed => {
                        error!(
                            event = events::TRANSLATION_FAILED,
                            urn = %urn,
                            manifest = %manifest.raw,
                            "模型转换失败"
                        );
                        return PollOutcome::Failed(manifest.raw);
                    }
                    ManifestStatus::Pending => {
                        debug!(
                            event = events::TRANSLATION_POLL,
                            urn = %urn,
                            attempt = attempts,
                            progress = manifest.progress.as_deref().unwrap_or(""),
                            "模型转换进行中"
                        );
                    }
                },
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    warn!(
                        event = events::TRANSLATION_POLL,
                        urn = %urn,
                        attempt = attempts,
                        error = %e,
                        "查询转换清单失败，继续等待"
                    );
                }
                Err(_) => break,
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(settings.interval.min(remaining)).await;
        }

        warn!(
            event = events::TRANSLATION_TIMEOUT,
            urn = %urn,
            attempts = attempts,
            timeout_ms = settings.timeout.as_millis() as u64,
            "等待模型转换超时"
        );
        PollOutcome::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aps::test_support;
    use mockito::Matcher;

    const URN_PATH: &str = "/modelderivative/v2/designdata/dXJuOmE/manifest";

    fn urn() -> DesignUrn {
        DesignUrn::from_object_id("urn:a")
    }

    fn fast_poll(timeout_ms: u64) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(20),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn test_settings_from_config() {
        let config = TranslationConfig::default();
        let poll = PollSettings::from(&config);
        assert_eq!(poll.interval, Duration::from_secs(3));
        assert_eq!(poll.timeout, Duration::from_secs(120));

        let output = TranslationOutput::from(&config);
        assert_eq!(output.format, "svf");
        assert_eq!(output.views, vec!["3d".to_string()]);
    }

    #[tokio::test]
    async fn test_submit_translation_job() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/modelderivative/v2/designdata/job")
            .match_header("authorization", "Bearer tok-1")
            .match_body(Matcher::Json(json!({
                "input": { "urn": "dXJuOmE" },
                "output": { "formats": [{ "type": "svf", "views": ["3d"] }] }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":"created","urn":"dXJuOmE"}"#)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let output = TranslationOutput::from(&TranslationConfig::default());
        let accepted = client.submit_translation("tok-1", &urn(), &output).await.unwrap();

        assert_eq!(accepted["result"], "created");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_translation_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/modelderivative/v2/designdata/job")
            .with_status(400)
            .with_body(r#"{"diagnostic":"Failed to parse URN"}"#)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let output = TranslationOutput::from(&TranslationConfig::default());
        let result = client.submit_translation("tok-1", &urn(), &output).await;
        assert!(matches!(
            result,
            Err(ApsError::TranslationSubmit { status, .. }) if status.as_u16() == 400
        ));
    }

    #[tokio::test]
    async fn test_poll_returns_success_immediately() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", URN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","progress":"complete"}"#)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let started = std::time::Instant::now();
        let outcome = client
            .wait_for_translation("tok-1", &urn(), fast_poll(5_000))
            .await;

        assert!(outcome.is_success());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_poll_failed_is_distinct() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", URN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"failed","derivatives":[{"status":"failed"}]}"#)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        match client
            .wait_for_translation("tok-1", &urn(), fast_poll(5_000))
            .await
        {
            PollOutcome::Failed(manifest) => assert_eq!(manifest["status"], "failed"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_inprogress_times_out() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", URN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"inprogress","progress":"10% complete"}"#)
            .expect_at_least(2)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let started = std::time::Instant::now();
        let outcome = client
            .wait_for_translation("tok-1", &urn(), fast_poll(200))
            .await;

        assert!(matches!(outcome, PollOutcome::TimedOut));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(2));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_poll_keeps_waiting_on_non_200() {
        let mut server = mockito::Server::new_async().await;
        let not_ready = server
            .mock("GET", URN_PATH)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let ready = server
            .mock("GET", URN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let client = test_support::client(&server.url());
        let outcome = client
            .wait_for_translation("tok-1", &urn(), fast_poll(5_000))
            .await;

        assert!(outcome.is_success());
        not_ready.assert_async().await;
        ready.assert_async().await;
    }
}

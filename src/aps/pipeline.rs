use super::{ApsClient, ApsError, DesignUrn, PollSettings, TranslationOutput};
use crate::model::aps::PollOutcome;
use crate::model::ObjectDescriptor;
use crate::util::config::TranslationConfig;
use crate::util::logging::standards::events;
use std::time::Instant;
use tracing::{error, info};

/// 一次成功流程的结果，用于渲染 Viewer 页面
#[derive(Debug, Clone)]
pub struct ViewerSession {
    pub access_token: String,
    pub urn: DesignUrn,
    pub object_id: String,
    pub object_name: String,
}

/// 上传 → 完成上传 → 提交转换 → 等待完成
///
/// 步骤严格串行，任一步失败立即中止，不做重试。
pub struct ViewerPipeline<'a> {
    client: &'a ApsClient,
    output: TranslationOutput,
    poll: PollSettings,
}

impl<'a> ViewerPipeline<'a> {
    pub fn new(client: &'a ApsClient, translation: &TranslationConfig) -> Self {
        Self {
            client,
            output: TranslationOutput::from(translation),
            poll: PollSettings::from(translation),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub async fn run(&self, descriptor: &ObjectDescriptor) -> Result<ViewerSession, ApsError> {
        let started = Instant::now();
        info!(
            event = events::PIPELINE_START,
            object = %descriptor.object_name,
            bucket = %descriptor.bucket_key,
            "开始上传并转换模型"
        );

        let result = self.execute(descriptor).await;
        match &result {
            Ok(session) => info!(
                event = events::PIPELINE_COMPLETE,
                object = %descriptor.object_name,
                urn = %session.urn,
                duration_ms = started.elapsed().as_millis() as u64,
                "模型已可查看"
            ),
            Err(e) => error!(
                event = events::PIPELINE_ERROR,
                object = %descriptor.object_name,
                duration_ms = started.elapsed().as_millis() as u64,
                upstream_status = e.upstream_status().map(|s| s.as_u16()),
                error = %e,
                "上传转换流程失败"
            ),
        }
        result
    }

    async fn execute(&self, descriptor: &ObjectDescriptor) -> Result<ViewerSession, ApsError> {
        let token = self.client.get_access_token().await?;
        let access_token = token.access_token;

        let ticket = self
            .client
            .request_signed_upload(&access_token, &descriptor.bucket_key, &descriptor.object_name)
            .await?;
        let signed_url = ticket.urls.first().ok_or(ApsError::EmptyUploadTicket)?;

        let receipt = self
            .client
            .put_object_bytes(signed_url, &descriptor.local_path)
            .await?;

        let finalized = self
            .client
            .finalize_upload(
                &access_token,
                &descriptor.bucket_key,
                &descriptor.object_name,
                &ticket.upload_key,
                &receipt,
            )
            .await?;

        let urn = DesignUrn::from_object_id(&finalized.object_id);
        self.client
            .submit_translation(&access_token, &urn, &self.output)
            .await?;

        match self
            .client
            .wait_for_translation(&access_token, &urn, self.poll)
            .await
        {
            PollOutcome::Success => {}
            PollOutcome::Failed(manifest) => {
                return Err(ApsError::TranslationFailed {
                    urn: urn.to_string(),
                    manifest,
                })
            }
            PollOutcome::TimedOut => {
                return Err(ApsError::TranslationTimeout {
                    urn: urn.to_string(),
                    timeout_secs: self.poll.timeout.as_secs(),
                })
            }
        }

        Ok(ViewerSession {
            access_token,
            urn,
            object_id: finalized.object_id,
            object_name: descriptor.object_name.clone(),
        })
    }
}

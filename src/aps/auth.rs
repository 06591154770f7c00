use super::{read_error_body, ApsClient, ApsError};
use crate::model::aps::AccessToken;
use crate::util::logging::standards::events;
use tracing::{debug, info, warn};

impl ApsClient {
    /// client-credentials 方式换取两腿令牌，每次请求都重新获取
    pub async fn get_access_token(&self) -> Result<AccessToken, ApsError> {
        debug!(
            event = events::APS_TOKEN_REQUEST,
            scope = %self.config.scope,
            "请求 APS 访问令牌"
        );

        let response = self
            .http
            .post(self.endpoint("/authentication/v2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.config.scope.as_str()),
            ])
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = read_error_body(response).await;
            warn!(
                event = events::APS_TOKEN_FAILED,
                status = status.as_u16(),
                body = %body,
                "APS 认证失败"
            );
            return Err(ApsError::Authentication { status, body });
        }

        let token: AccessToken = response.json().await?;
        info!(
            event = events::APS_TOKEN_ISSUED,
            expires_in = token.expires_in,
            "已获取 APS 访问令牌"
        );
        Ok(token)
    }
}

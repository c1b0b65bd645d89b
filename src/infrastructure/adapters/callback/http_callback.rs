//! HTTP Callback Client - 以 POST JSON 的方式回传结果

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::application::ports::{CallbackClientPort, CallbackResponse, DeliveryError};
use crate::domain::delivery::DeliveryPayload;

/// HTTP 回调客户端，不重试
pub struct HttpCallbackClient {
    client: Client,
}

impl HttpCallbackClient {
    pub fn new(timeout_secs: u64) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DeliveryError::CallbackError(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackClientPort for HttpCallbackClient {
    async fn post(&self, url: &str, payload: &DeliveryPayload) -> Result<CallbackResponse, DeliveryError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::CallbackError(format!("timeout posting to {}", url))
                } else {
                    DeliveryError::CallbackError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(CallbackResponse { status, body })
    }
}

//! Response Channel Ports - 结果回传通道
//!
//! 两条互斥的回传路径：响应队列 / HTTP 回调

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::delivery::DeliveryPayload;

/// 回传错误，只记录日志，不会让任务重新失败
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to encode payload: {0}")]
    EncodeError(String),

    #[error("Failed to publish to queue `{queue}`: {message}")]
    PublishError { queue: String, message: String },

    #[error("Callback request failed: {0}")]
    CallbackError(String),

    #[error("Callback returned HTTP {status}")]
    CallbackStatus { status: u16, body: String },
}

/// 回调响应
#[derive(Debug, Clone)]
pub struct CallbackResponse {
    pub status: u16,
    pub body: String,
}

/// 响应队列发布端口
#[async_trait]
pub trait QueuePublisherPort: Send + Sync {
    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), DeliveryError>;
}

/// HTTP 回调端口
#[async_trait]
pub trait CallbackClientPort: Send + Sync {
    async fn post(&self, url: &str, payload: &DeliveryPayload) -> Result<CallbackResponse, DeliveryError>;
}

//! AMQP Response Publisher - 把结果发布到响应队列
//!
//! 实现 QueuePublisherPort trait

use async_trait::async_trait;
use lapin::Channel;
use std::collections::HashSet;
use tokio::sync::Mutex;

use super::session::{declare_queue, publish_to_queue};
use crate::application::ports::{DeliveryError, QueuePublisherPort};

/// 响应队列发布器
pub struct AmqpResponsePublisher {
    channel: Channel,
    /// 已声明过的队列
    declared: Mutex<HashSet<String>>,
}

impl AmqpResponsePublisher {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            declared: Mutex::new(HashSet::new()),
        }
    }

    async fn ensure_declared(&self, queue: &str) -> Result<(), DeliveryError> {
        let mut declared = self.declared.lock().await;
        if declared.contains(queue) {
            return Ok(());
        }

        declare_queue(&self.channel, queue)
            .await
            .map_err(|e| DeliveryError::PublishError {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;
        declared.insert(queue.to_string());
        Ok(())
    }
}

#[async_trait]
impl QueuePublisherPort for AmqpResponsePublisher {
    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), DeliveryError> {
        self.ensure_declared(queue).await?;

        publish_to_queue(&self.channel, queue, &body)
            .await
            .map_err(|e| DeliveryError::PublishError {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(queue = %queue, size = body.len(), "Published response");
        Ok(())
    }
}

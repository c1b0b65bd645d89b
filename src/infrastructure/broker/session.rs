//! Broker Session - AMQP 连接与通道的生命周期
//!
//! 进程启动时建立连接和通道，所有退出路径（正常、出错、Ctrl-C、看门狗）
//! 都会调用 close。

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use lapin::{
    options::{BasicConsumeOptions, BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions},
    publisher_confirm::Confirmation,
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use std::sync::Arc;
use thiserror::Error;

const REPLY_SUCCESS: u16 = 200;

/// Broker 错误
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Failed to connect to broker: {0}")]
    ConnectError(String),

    #[error("Failed to open channel: {0}")]
    ChannelError(String),

    #[error("Failed to declare queue `{queue}`: {message}")]
    DeclareError { queue: String, message: String },

    #[error("Failed to start consumer on `{queue}`: {message}")]
    ConsumeError { queue: String, message: String },

    #[error("Failed to publish to `{queue}`: {message}")]
    PublishError { queue: String, message: String },

    #[error("Consumer stream error: {0}")]
    StreamError(String),

    #[error("Consumer stream closed")]
    StreamClosed,
}

/// 入站消息流（消息体）
pub type MessageStream = BoxStream<'static, Result<Vec<u8>, BrokerError>>;

/// 已建立的 broker 会话
pub struct BrokerSession {
    connection: Arc<Connection>,
    channel: Channel,
    request_queue: String,
}

impl BrokerSession {
    /// 连接 broker、打开通道并声明请求队列
    pub async fn open(url: &str, request_queue: &str) -> Result<Self, BrokerError> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| BrokerError::ConnectError(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::ChannelError(e.to_string()))?;
        // 发布都要等 broker 确认
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| BrokerError::ChannelError(e.to_string()))?;

        declare_queue(&channel, request_queue).await?;

        tracing::info!(queue = %request_queue, "Broker session opened");

        Ok(Self {
            connection: Arc::new(connection),
            channel,
            request_queue: request_queue.to_string(),
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    pub fn request_queue(&self) -> &str {
        &self.request_queue
    }

    /// 供看门狗在强制退出前关闭连接
    pub fn closer(&self) -> BrokerCloser {
        BrokerCloser {
            connection: self.connection.clone(),
        }
    }

    /// 开始消费请求队列
    ///
    /// 自动确认：消息一收到即确认，处理中崩溃会丢失该任务
    pub async fn consume(&self, consumer_tag: &str) -> Result<MessageStream, BrokerError> {
        let consumer = self
            .channel
            .basic_consume(
                &self.request_queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::ConsumeError {
                queue: self.request_queue.clone(),
                message: e.to_string(),
            })?;

        tracing::info!(queue = %self.request_queue, consumer_tag = %consumer_tag, "Waiting for messages");

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(|d| d.data)
                    .map_err(|e| BrokerError::StreamError(e.to_string()))
            })
            .boxed())
    }

    /// 向请求队列发送一条消息
    pub async fn send(&self, body: &[u8]) -> Result<(), BrokerError> {
        publish_to_queue(&self.channel, &self.request_queue, body).await
    }

    /// 关闭通道和连接
    pub async fn close(self) {
        if let Err(e) = self.channel.close(REPLY_SUCCESS, "worker shutdown").await {
            tracing::debug!(error = %e, "Channel already closed");
        }
        self.closer().close().await;
    }
}

/// 连接关闭句柄
#[derive(Clone)]
pub struct BrokerCloser {
    connection: Arc<Connection>,
}

impl BrokerCloser {
    pub async fn close(&self) {
        match self.connection.close(REPLY_SUCCESS, "worker shutdown").await {
            Ok(()) => tracing::info!("Broker connection closed"),
            Err(e) => tracing::debug!(error = %e, "Broker connection already closed"),
        }
    }
}

/// 声明队列（与发送端默认参数一致：非持久化）
pub(crate) async fn declare_queue(channel: &Channel, queue: &str) -> Result<(), BrokerError> {
    channel
        .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
        .await
        .map_err(|e| BrokerError::DeclareError {
            queue: queue.to_string(),
            message: e.to_string(),
        })?;
    Ok(())
}

/// 通过默认交换机发布到指定队列，并等待确认
pub(crate) async fn publish_to_queue(
    channel: &Channel,
    queue: &str,
    body: &[u8],
) -> Result<(), BrokerError> {
    let publish_error = |message: String| BrokerError::PublishError {
        queue: queue.to_string(),
        message,
    };

    let confirmation = channel
        .basic_publish(
            "",
            queue,
            BasicPublishOptions::default(),
            body,
            BasicProperties::default().with_content_type("application/json".into()),
        )
        .await
        .map_err(|e| publish_error(e.to_string()))?
        .await
        .map_err(|e| publish_error(format!("publish not confirmed: {}", e)))?;

    check_confirmation(queue, confirmation)
}

/// 只有 Ack 算发布成功；通道必须已开启 confirm 模式
fn check_confirmation(queue: &str, confirmation: Confirmation) -> Result<(), BrokerError> {
    let message = match confirmation {
        Confirmation::Ack(_) => return Ok(()),
        Confirmation::Nack(_) => "broker rejected the message (nack)",
        Confirmation::NotRequested => "publisher confirms are not enabled on the channel",
    };
    Err(BrokerError::PublishError {
        queue: queue.to_string(),
        message: message.to_string(),
    })
}

//! Broker Layer - AMQP 消息队列
//!
//! - session: 连接/通道生命周期、消费与发送
//! - publisher: 响应队列发布

mod publisher;
mod session;

pub use publisher::AmqpResponsePublisher;
pub use session::{BrokerCloser, BrokerError, BrokerSession, MessageStream};

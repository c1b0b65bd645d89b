//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod broker;
pub mod persistence;
pub mod worker;

pub use broker::{AmqpResponsePublisher, BrokerSession};
pub use worker::{ActivityClock, LivenessWatchdog, QueueWorker};

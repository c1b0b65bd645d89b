//! Queue Worker - 消费循环
//!
//! 一次只处理一条消息；单个任务的失败不会中断循环，
//! 只有消息流出错或结束时才返回。

use futures_util::{Stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::watchdog::ActivityClock;
use crate::application::pipeline::{TaskProcessor, TaskStage};
use crate::infrastructure::broker::BrokerError;

/// 处理计数
#[derive(Debug, Default)]
pub struct WorkerStats {
    received: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl WorkerStats {
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// 队列消费者
pub struct QueueWorker {
    processor: Arc<TaskProcessor>,
    clock: Arc<ActivityClock>,
    stats: WorkerStats,
}

impl QueueWorker {
    pub fn new(processor: Arc<TaskProcessor>, clock: Arc<ActivityClock>) -> Self {
        Self {
            processor,
            clock,
            stats: WorkerStats::default(),
        }
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// 消费消息直到消息流结束或出错
    pub async fn run<S>(&self, mut messages: S) -> Result<(), BrokerError>
    where
        S: Stream<Item = Result<Vec<u8>, BrokerError>> + Unpin,
    {
        tracing::info!("QueueWorker started");

        while let Some(next) = messages.next().await {
            let body = match next {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!(error = %e, "Consumer stream failed");
                    return Err(e);
                }
            };

            self.clock.begin_task();
            self.stats.received.fetch_add(1, Ordering::Relaxed);

            let report = self.processor.handle(&body).await;
            match report.stage {
                TaskStage::Delivered => self.stats.delivered.fetch_add(1, Ordering::Relaxed),
                _ => self.stats.failed.fetch_add(1, Ordering::Relaxed),
            };

            self.clock.end_task();
        }

        tracing::warn!(
            received = self.stats.received(),
            delivered = self.stats.delivered(),
            failed = self.stats.failed(),
            "QueueWorker stopped"
        );
        Err(BrokerError::StreamClosed)
    }
}

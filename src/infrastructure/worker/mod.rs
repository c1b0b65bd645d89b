//! Worker Layer - 队列消费与存活监控
//!
//! QueueWorker 顺序处理请求队列中的消息，
//! LivenessWatchdog 在长时间空闲后结束进程

mod queue_worker;
mod watchdog;

pub use queue_worker::{QueueWorker, WorkerStats};
pub use watchdog::{ActivityClock, IdleShutdown, LivenessWatchdog, ProcessExit};

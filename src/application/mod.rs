//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义
//! - pipeline: 任务处理、结果回传、任务生成
//! - error: 任务级错误定义

pub mod error;
pub mod pipeline;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use error::TaskError;
pub use pipeline::{DeliveryOutcome, ResponseDispatcher, TaskProcessor, TaskReport, TaskStage};

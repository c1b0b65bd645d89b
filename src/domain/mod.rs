//! Domain Layer - 领域层
//!
//! - Task: 入站任务
//! - Delivery: 回传载荷

pub mod delivery;
pub mod task;

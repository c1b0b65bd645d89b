//! Pipeline - 任务处理用例
//!
//! - task_processor: 单条消息的处理状态机
//! - response_dispatcher: 结果回传
//! - seeding: 从数据库记录生成初始任务

mod response_dispatcher;
mod seeding;
mod task_processor;

pub use response_dispatcher::{DeliveryOutcome, ResponseDispatcher};
pub use seeding::{build_seed_tasks, SeedFile, SeedTask, SeedTemplate};
pub use task_processor::{TaskProcessor, TaskReport, TaskStage};

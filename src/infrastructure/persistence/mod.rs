//! Persistence Layer - 数据持久化
//!
//! SQLite 存储实现（seed 模式的任务来源）

pub mod sqlite;

pub use self::sqlite::SqliteVoiceSampleSource;

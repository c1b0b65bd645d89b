//! SQLite Persistence - 任务来源数据库

mod database;
mod voice_sample_repo;

pub use database::*;
pub use voice_sample_repo::*;

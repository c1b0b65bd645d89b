//! Voice Sample Source Port - 待处理任务来源
//!
//! 只读查询：每个用户最近上传的若干个参考音频

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 用户上传的参考音频记录
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSampleRecord {
    pub user_id: i64,
    pub file_id: i64,
    pub file_name: String,
    pub file_hash: String,
    pub date_created: DateTime<Utc>,
}

/// 查询条件
#[derive(Debug, Clone)]
pub struct VoiceSampleCriteria {
    /// 用户安全级别（如 "Family"）
    pub security_level: String,
    /// 文件 MIME 类型（如 "audio/mp3"）
    pub mime_type: String,
    /// 每个用户最多取几个文件
    pub files_per_user: u32,
}

/// Voice Sample Source Port
#[async_trait]
pub trait VoiceSampleSourcePort: Send + Sync {
    /// 按 user_id 升序、同一用户内按上传时间倒序返回
    async fn recent_voice_samples(
        &self,
        criteria: &VoiceSampleCriteria,
    ) -> Result<Vec<VoiceSampleRecord>, RepositoryError>;
}

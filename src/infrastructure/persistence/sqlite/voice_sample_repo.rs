//! SQLite Voice Sample Source

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{
    RepositoryError, VoiceSampleCriteria, VoiceSampleRecord, VoiceSampleSourcePort,
};

/// 每个用户最近的 N 个参考音频
const RECENT_VOICE_SAMPLES_SQL: &str = r#"
    SELECT user_id, file_id, file_name, file_hash, date_created FROM (
        SELECT f.user_id, f.id AS file_id, f.file_name, f.file_hash, f.date_created,
               ROW_NUMBER() OVER (PARTITION BY f.user_id ORDER BY f.date_created DESC) AS rn
        FROM security_levels sl
        INNER JOIN users u ON sl.id = u.security_id
        INNER JOIN user_uploaded_files f ON u.id = f.user_id
        WHERE sl.security_level = ?
          AND f.file_mime_type = ?
          AND f.file_name GLOB '*voice_sample_[0-9]*'
    )
    WHERE rn <= ?
    ORDER BY user_id, date_created DESC
"#;

/// SQLite Voice Sample Source
pub struct SqliteVoiceSampleSource {
    pool: DbPool,
}

impl SqliteVoiceSampleSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct VoiceSampleRow {
    user_id: i64,
    file_id: i64,
    file_name: String,
    file_hash: String,
    date_created: String,
}

impl TryFrom<VoiceSampleRow> for VoiceSampleRecord {
    type Error = RepositoryError;

    fn try_from(row: VoiceSampleRow) -> Result<Self, Self::Error> {
        Ok(VoiceSampleRecord {
            user_id: row.user_id,
            file_id: row.file_id,
            file_name: row.file_name,
            file_hash: row.file_hash,
            date_created: DateTime::parse_from_rfc3339(&row.date_created)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl VoiceSampleSourcePort for SqliteVoiceSampleSource {
    async fn recent_voice_samples(
        &self,
        criteria: &VoiceSampleCriteria,
    ) -> Result<Vec<VoiceSampleRecord>, RepositoryError> {
        let rows: Vec<VoiceSampleRow> = sqlx::query_as(RECENT_VOICE_SAMPLES_SQL)
            .bind(&criteria.security_level)
            .bind(&criteria.mime_type)
            .bind(criteria.files_per_user as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(rows = rows.len(), "Loaded recent voice samples");

        rows.into_iter().map(VoiceSampleRecord::try_from).collect()
    }
}

//! Voice Asset Port - 参考音频同步抽象
//!
//! 本地按音色划分目录存放参考音频，按任务声明的文件列表做增量同步

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::task::VoiceFile;

/// 下载错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status} from {url}")]
    BadStatus { status: u16, url: String },

    #[error("Failed to read response body: {0}")]
    BodyError(String),
}

/// 音色目录同步错误
///
/// 任意一个文件失败都会中止本次同步，已写入的文件保留
#[derive(Debug, Error)]
pub enum AssetSyncError {
    #[error("Failed to prepare voice directory {path}: {message}")]
    Directory { path: String, message: String },

    #[error("Failed to download `{file_name}`: {source}")]
    Download {
        file_name: String,
        #[source]
        source: FetchError,
    },

    #[error("Hash mismatch for `{file_name}`: expected {expected}, got {actual}")]
    HashMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },

    #[error("IO error on `{file_name}`: {message}")]
    IoError { file_name: String, message: String },

    #[error("Failed to prune voice directory {path}: {message}")]
    Prune { path: String, message: String },
}

/// 一次同步的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 新下载或因哈希不符重新下载的文件
    pub downloaded: Vec<String>,
    /// 哈希一致、直接复用的文件
    pub reused: Vec<String>,
    /// 不在声明列表中而被删除的文件
    pub removed: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.downloaded.is_empty() && self.removed.is_empty()
    }
}

/// Voice Asset Store Port
#[async_trait]
pub trait VoiceAssetStorePort: Send + Sync {
    /// 音色对应的本地目录
    fn voice_dir(&self, voice_id: &str) -> PathBuf;

    /// 同步音色目录
    ///
    /// 成功后目录内的文件集合与 `files` 按名称完全一致，
    /// 且每个文件的 MD5 都经过校验或刚刚下载。
    async fn sync(&self, voice_id: &str, files: &[VoiceFile]) -> Result<SyncReport, AssetSyncError>;
}

/// 参考音频下载端口
#[async_trait]
pub trait AssetFetcherPort: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

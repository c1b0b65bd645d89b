//! 应用层错误定义
//!
//! 单个任务处理过程中的错误分类

use thiserror::Error;

use crate::application::ports::{AssetSyncError, SynthesisError};
use crate::domain::task::ParseError;

pub const EMPTY_TEXT_MESSAGE: &str = "text is empty";

/// 任务错误
///
/// 除 Parse 外都会转换成失败载荷回传给发起方
#[derive(Debug, Error)]
pub enum TaskError {
    /// 消息无法解析，没有回复地址
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// 参考音频同步失败
    #[error(transparent)]
    AssetSync(#[from] AssetSyncError),

    /// 输入校验失败
    #[error("{0}")]
    Validation(String),

    /// 合成后端失败
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// 读取合成结果失败
    #[error("Failed to read synthesized audio {path}: {message}")]
    OutputRead { path: String, message: String },
}

impl TaskError {
    pub fn empty_text() -> Self {
        Self::Validation(EMPTY_TEXT_MESSAGE.to_string())
    }

    /// 错误类别（用于日志字段）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::AssetSync(_) => "asset_sync",
            Self::Validation(_) => "validation",
            Self::Synthesis(_) => "synthesis",
            Self::OutputRead { .. } => "output_read",
        }
    }
}

//! Task Context - Errors

use thiserror::Error;

/// 消息解析错误
///
/// 解析失败时没有可用的回复地址，只记录日志
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed JSON: {0}")]
    Json(String),

    #[error("Message body is not a JSON object")]
    NotAnObject,

    #[error("Invalid task message: {}", .problems.join("; "))]
    Invalid { problems: Vec<String> },
}

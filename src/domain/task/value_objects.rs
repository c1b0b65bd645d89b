//! Task Context - Value Objects

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 用户标识
///
/// 来源消息中可能是字符串或整数，原样透传到响应中；
/// 同时用于拼接本地音色目录名，所以不允许路径分隔符。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserId(Value);

impl UserId {
    pub fn from_value(value: Value) -> Result<Self, &'static str> {
        match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Self(value)),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err("must not be empty");
                }
                if !is_plain_name(trimmed) {
                    return Err("must not contain path separators");
                }
                Ok(Self(value))
            }
            _ => Err("must be a string or an integer"),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "{}", s.trim()),
            other => write!(f, "{}", other),
        }
    }
}

/// 输出文件名
///
/// 不变量: 总是以 `.wav` 结尾，且不含路径分隔符
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFileName(String);

impl OutputFileName {
    /// 取第一个 `.` 之前的部分并追加 `.wav`
    pub fn normalize(raw: &str) -> Result<Self, &'static str> {
        let base = raw.trim().split('.').next().unwrap_or_default().trim();
        if base.is_empty() {
            return Err("must have a non-empty base name");
        }
        if !is_plain_name(base) {
            return Err("must be a plain file name");
        }
        Ok(Self(format!("{}.wav", base)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OutputFileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 参考音频声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceFile {
    /// 本地文件名（目录内唯一）
    pub file_name: String,
    /// 下载地址
    pub file_url: String,
    /// 内容的 MD5（十六进制）
    pub file_hash: String,
}

/// 回复方式
///
/// 同时给出队列名和回调地址时，队列优先
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMode {
    Queue(String),
    Callback(String),
    None,
}

impl ReplyMode {
    pub fn resolve(response_queue: Option<String>, callback_url: Option<String>) -> Self {
        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        match (non_blank(response_queue), non_blank(callback_url)) {
            (Some(queue), _) => ReplyMode::Queue(queue),
            (None, Some(url)) => ReplyMode::Callback(url),
            (None, None) => ReplyMode::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ReplyMode::None)
    }
}

/// 单层文件名：非空、不含分隔符、不是 `.` / `..`
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

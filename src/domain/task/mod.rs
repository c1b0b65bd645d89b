//! Task Context - 合成任务限界上下文
//!
//! 职责:
//! - 入站消息的严格解码
//! - 参考音频声明与回复方式

mod entities;
mod errors;
mod value_objects;

pub use entities::Task;
pub use errors::ParseError;
pub use value_objects::{is_plain_name, OutputFileName, ReplyMode, UserId, VoiceFile};

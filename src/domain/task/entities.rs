//! Task Context - Entities

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::errors::ParseError;
use super::value_objects::{is_plain_name, OutputFileName, ReplyMode, UserId, VoiceFile};

/// 合成任务 - 由一条入站消息解码得到
///
/// 不变量:
/// - voice_files 中的 file_name 互不相同且都是单层文件名
/// - output_file_name 已规范化为 `.wav`
/// - reply 最多只有一种回复方式
///
/// 每条消息构造一次，处理结束即丢弃。
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub user_id: UserId,
    pub text: String,
    pub output_file_name: OutputFileName,
    pub voice_files: Vec<VoiceFile>,
    /// 透传字段，缺省为 null
    pub auth_token: Value,
    /// 透传字段，缺省为 null
    pub event_id: Value,
    pub reply: ReplyMode,
}

/// 原始消息，所有字段都先按 Value 读取，以便一次性报告全部问题
#[derive(Debug, Deserialize)]
struct RawTaskMessage {
    user_id: Option<Value>,
    text: Option<Value>,
    output_file_name: Option<Value>,
    files: Option<Value>,
    auth_token: Option<Value>,
    event_id: Option<Value>,
    callback_url: Option<Value>,
    #[serde(rename = "queueResponse")]
    queue_response: Option<Value>,
}

impl Task {
    /// 严格解码入站消息
    ///
    /// 返回的 `ParseError::Invalid` 会列出所有缺失或非法的字段
    pub fn decode(body: &[u8]) -> Result<Self, ParseError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ParseError::Json(e.to_string()))?;
        if !value.is_object() {
            return Err(ParseError::NotAnObject);
        }
        let raw: RawTaskMessage =
            serde_json::from_value(value).map_err(|e| ParseError::Json(e.to_string()))?;

        let mut problems = Vec::new();

        let user_id = match raw.user_id {
            Some(v) => UserId::from_value(v)
                .map_err(|reason| problems.push(format!("field `user_id` {}", reason)))
                .ok(),
            None => {
                problems.push("missing field `user_id`".to_string());
                None
            }
        };

        let text = required_string(raw.text, "text", &mut problems);

        let output_file_name = required_string(raw.output_file_name, "output_file_name", &mut problems)
            .and_then(|name| {
                OutputFileName::normalize(&name)
                    .map_err(|reason| {
                        problems.push(format!("field `output_file_name` {}", reason))
                    })
                    .ok()
            });

        let voice_files = match raw.files {
            Some(Value::Array(entries)) => Some(decode_voice_files(entries, &mut problems)),
            Some(_) => {
                problems.push("field `files` must be an array".to_string());
                None
            }
            None => {
                problems.push("missing field `files`".to_string());
                None
            }
        };

        let callback_url = optional_string(raw.callback_url, "callback_url", &mut problems);
        let response_queue = optional_string(raw.queue_response, "queueResponse", &mut problems);

        match (user_id, text, output_file_name, voice_files) {
            (Some(user_id), Some(text), Some(output_file_name), Some(voice_files))
                if problems.is_empty() =>
            {
                Ok(Task {
                    user_id,
                    text,
                    output_file_name,
                    voice_files,
                    auth_token: raw.auth_token.unwrap_or(Value::Null),
                    event_id: raw.event_id.unwrap_or(Value::Null),
                    reply: ReplyMode::resolve(response_queue, callback_url),
                })
            }
            _ => Err(ParseError::Invalid { problems }),
        }
    }

    /// 音色标识，也是音色目录名
    pub fn voice_id(&self) -> String {
        format!("user_{}", self.user_id)
    }

    /// text 去掉空白后是否为空
    pub fn has_blank_text(&self) -> bool {
        self.text.trim().is_empty()
    }
}

fn required_string(value: Option<Value>, field: &str, problems: &mut Vec<String>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            problems.push(format!("field `{}` must be a string", field));
            None
        }
        None => {
            problems.push(format!("missing field `{}`", field));
            None
        }
    }
}

fn optional_string(value: Option<Value>, field: &str, problems: &mut Vec<String>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            problems.push(format!("field `{}` must be a string", field));
            None
        }
        None => None,
    }
}

fn decode_voice_files(entries: Vec<Value>, problems: &mut Vec<String>) -> Vec<VoiceFile> {
    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(mut object) = entry else {
            problems.push(format!("files[{}] must be an object", index));
            continue;
        };

        let file_name = entry_string(&mut object, index, "file_name", problems);
        let file_url = entry_string(&mut object, index, "file_url", problems);
        let file_hash = entry_string(&mut object, index, "file_hash", problems);

        if let Some(name) = &file_name {
            if !is_plain_name(name) {
                problems.push(format!("files[{}].file_name must be a plain file name", index));
                continue;
            }
            if !seen.insert(name.clone()) {
                problems.push(format!("files[{}].file_name `{}` is duplicated", index, name));
                continue;
            }
        }

        if let (Some(file_name), Some(file_url), Some(file_hash)) = (file_name, file_url, file_hash) {
            files.push(VoiceFile {
                file_name,
                file_url,
                file_hash,
            });
        }
    }

    files
}

fn entry_string(
    object: &mut Map<String, Value>,
    index: usize,
    key: &str,
    problems: &mut Vec<String>,
) -> Option<String> {
    match object.remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::String(_)) => {
            problems.push(format!("files[{}].{} must not be empty", index, key));
            None
        }
        Some(_) => {
            problems.push(format!("files[{}].{} must be a string", index, key));
            None
        }
        None => {
            problems.push(format!("files[{}] missing `{}`", index, key));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_message() -> Value {
        json!({
            "user_id": 42,
            "text": "hello world",
            "output_file_name": "greet",
            "files": [
                {"file_name": "voice_sample_1.mp3", "file_url": "http://files/1", "file_hash": "abc", "file_id": 7}
            ],
            "auth_token": "tok1",
            "event_id": 9,
            "queueResponse": "resp-q"
        })
    }

    #[test]
    fn test_decode_full_message() {
        let body = serde_json::to_vec(&sample_message()).unwrap();
        let task = Task::decode(&body).unwrap();

        assert_eq!(task.user_id.to_string(), "42");
        assert_eq!(task.voice_id(), "user_42");
        assert_eq!(task.output_file_name.as_str(), "greet.wav");
        assert_eq!(task.voice_files.len(), 1);
        assert_eq!(task.voice_files[0].file_name, "voice_sample_1.mp3");
        assert_eq!(task.auth_token, json!("tok1"));
        assert_eq!(task.event_id, json!(9));
        assert_eq!(task.reply, ReplyMode::Queue("resp-q".into()));
    }

    #[test]
    fn test_decode_defaults_passthrough_fields() {
        let mut message = sample_message();
        let object = message.as_object_mut().unwrap();
        object.remove("auth_token");
        object.remove("event_id");
        object.remove("queueResponse");
        object.insert("callback_url".into(), json!("http://cb/endpoint"));

        let task = Task::decode(&serde_json::to_vec(&message).unwrap()).unwrap();
        assert_eq!(task.auth_token, Value::Null);
        assert_eq!(task.event_id, Value::Null);
        assert_eq!(task.reply, ReplyMode::Callback("http://cb/endpoint".into()));
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(matches!(Task::decode(b"{not json"), Err(ParseError::Json(_))));
        assert!(matches!(Task::decode(b"[1, 2]"), Err(ParseError::NotAnObject)));
    }

    #[test]
    fn test_decode_lists_every_problem() {
        let body = serde_json::to_vec(&json!({
            "user_id": "../x",
            "files": [
                {"file_name": "a.mp3", "file_url": "u", "file_hash": "h"},
                {"file_name": "a.mp3", "file_url": "u", "file_hash": "h"},
                {"file_name": "sub/b.mp3", "file_url": "u"},
                "nope"
            ]
        }))
        .unwrap();

        let Err(ParseError::Invalid { problems }) = Task::decode(&body) else {
            panic!("expected invalid message");
        };

        let joined = problems.join("\n");
        assert!(joined.contains("field `user_id`"));
        assert!(joined.contains("missing field `text`"));
        assert!(joined.contains("missing field `output_file_name`"));
        assert!(joined.contains("files[1].file_name `a.mp3` is duplicated"));
        assert!(joined.contains("files[2] missing `file_hash`"));
        assert!(joined.contains("files[2].file_name must be a plain file name"));
        assert!(joined.contains("files[3] must be an object"));
    }

    #[test]
    fn test_blank_text_is_decoded_but_flagged() {
        let mut message = sample_message();
        message["text"] = json!("   \n");
        let task = Task::decode(&serde_json::to_vec(&message).unwrap()).unwrap();
        assert!(task.has_blank_text());
    }
}

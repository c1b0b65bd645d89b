//! Delivery Context - 回传载荷

use serde::Serialize;
use serde_json::Value;

use crate::domain::task::Task;

pub const STATUS_SUCCESS: &str = "success";
pub const ACTION_SAVE_USER_FILE: &str = "saveUserFile";
pub const FILE_TYPE_WAV: &str = "audio/wav";
pub const FILE_GROUP_EVENT: &str = "event";

/// 成功载荷，字段顺序与线上格式一致
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessPayload {
    pub status: &'static str,
    pub action: &'static str,
    pub auth_token: Value,
    pub file_name: String,
    /// base64 编码的音频内容
    pub file_content: String,
    pub file_type: &'static str,
    pub file_group: &'static str,
    pub user_id: Value,
    pub event_id: Value,
    pub text: String,
}

/// 失败载荷
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailurePayload {
    pub error: String,
}

/// 回传给任务发起方的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeliveryPayload {
    Success(SuccessPayload),
    Failure(FailurePayload),
}

impl DeliveryPayload {
    pub fn success(task: &Task, file_content: String) -> Self {
        Self::Success(SuccessPayload {
            status: STATUS_SUCCESS,
            action: ACTION_SAVE_USER_FILE,
            auth_token: task.auth_token.clone(),
            file_name: task.output_file_name.as_str().to_string(),
            file_content,
            file_type: FILE_TYPE_WAV,
            file_group: FILE_GROUP_EVENT,
            user_id: task.user_id.as_value().clone(),
            event_id: task.event_id.clone(),
            text: task.text.clone(),
        })
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(FailurePayload {
            error: error.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// 用于日志的 JSON，省略音频内容
    pub fn redacted_json(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(content) = value.get_mut("file_content") {
            *content = Value::String("...".to_string());
        }
        value
    }
}

//! Response Dispatcher - 结果回传
//!
//! 每个任务最多回传一次：
//! - 有响应队列名时发布到队列（优先）
//! - 否则有回调地址时 POST JSON
//! - 都没有时不回传

use serde_json::Value;
use std::sync::Arc;

use crate::application::ports::{CallbackClientPort, DeliveryError, QueuePublisherPort};
use crate::domain::delivery::DeliveryPayload;
use crate::domain::task::ReplyMode;

/// 回传结果
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// 已发布到响应队列
    Published { queue: String },
    /// 已 POST 到回调地址
    Posted { url: String, status: u16 },
    /// 任务没有回复方式
    Skipped,
    /// 回传失败（只记录日志）
    Failed { error: DeliveryError },
}

/// 结果回传器
pub struct ResponseDispatcher {
    publisher: Arc<dyn QueuePublisherPort>,
    callback: Arc<dyn CallbackClientPort>,
    log_body_limit: usize,
}

impl ResponseDispatcher {
    pub fn new(
        publisher: Arc<dyn QueuePublisherPort>,
        callback: Arc<dyn CallbackClientPort>,
        log_body_limit: usize,
    ) -> Self {
        Self {
            publisher,
            callback,
            log_body_limit,
        }
    }

    /// 回传结果，失败不会向上传播
    pub async fn deliver(&self, reply: &ReplyMode, payload: &DeliveryPayload) -> DeliveryOutcome {
        let outcome = match reply {
            ReplyMode::Queue(queue) => self.publish(queue, payload).await,
            ReplyMode::Callback(url) => self.post(url, payload).await,
            ReplyMode::None => {
                tracing::debug!("No reply channel on task, skipping delivery");
                return DeliveryOutcome::Skipped;
            }
        };

        match &outcome {
            DeliveryOutcome::Failed { error } => {
                tracing::error!(error = %error, success = payload.is_success(), "Failed to deliver response");
            }
            DeliveryOutcome::Published { queue } => {
                tracing::info!(queue = %queue, success = payload.is_success(), "Response published");
            }
            DeliveryOutcome::Posted { url, status } => {
                tracing::info!(url = %url, status = status, success = payload.is_success(), "Response posted");
            }
            DeliveryOutcome::Skipped => {}
        }

        outcome
    }

    async fn publish(&self, queue: &str, payload: &DeliveryPayload) -> DeliveryOutcome {
        let body = match payload.to_json_bytes() {
            Ok(body) => body,
            Err(e) => {
                return DeliveryOutcome::Failed {
                    error: DeliveryError::EncodeError(e.to_string()),
                }
            }
        };

        match self.publisher.publish(queue, body).await {
            Ok(()) => DeliveryOutcome::Published {
                queue: queue.to_string(),
            },
            Err(error) => DeliveryOutcome::Failed { error },
        }
    }

    async fn post(&self, url: &str, payload: &DeliveryPayload) -> DeliveryOutcome {
        tracing::debug!(url = %url, payload = %payload.redacted_json(), "Posting callback");

        match self.callback.post(url, payload).await {
            Ok(response) => {
                let logged_body = redact_response_body(&response.body);
                let logged_body = truncate(&logged_body, self.log_body_limit);
                tracing::debug!(
                    url = %url,
                    status = response.status,
                    body = %logged_body,
                    "Callback response"
                );
                if (200..300).contains(&response.status) {
                    DeliveryOutcome::Posted {
                        url: url.to_string(),
                        status: response.status,
                    }
                } else {
                    DeliveryOutcome::Failed {
                        error: DeliveryError::CallbackStatus {
                            status: response.status,
                            body: logged_body.to_string(),
                        },
                    }
                }
            }
            Err(error) => DeliveryOutcome::Failed { error },
        }
    }
}

/// 回调方常把请求原样回显，日志里去掉其中的音频内容
fn redact_response_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(mut value) => {
            redact_file_content(&mut value);
            value.to_string()
        }
        Err(_) => body.to_string(),
    }
}

fn redact_file_content(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == "file_content" {
                    *child = Value::String("...".to_string());
                } else {
                    redact_file_content(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_file_content),
        _ => {}
    }
}

/// 按字符截断（不切断 UTF-8）
fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{RecordingCallback, RecordingPublisher};
    use serde_json::json;

    fn dispatcher(
        publisher: Arc<RecordingPublisher>,
        callback: Arc<RecordingCallback>,
    ) -> ResponseDispatcher {
        ResponseDispatcher::new(publisher, callback, 5000)
    }

    #[tokio::test]
    async fn test_queue_delivery() {
        let publisher = Arc::new(RecordingPublisher::default());
        let callback = Arc::new(RecordingCallback::with_status(200));
        let dispatcher = dispatcher(publisher.clone(), callback.clone());

        let outcome = dispatcher
            .deliver(&ReplyMode::Queue("resp-q".into()), &DeliveryPayload::failure("boom"))
            .await;

        assert!(matches!(outcome, DeliveryOutcome::Published { ref queue } if queue == "resp-q"));
        let published = publisher.messages();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "resp-q");
        let body: Value = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(body, json!({"error": "boom"}));
        assert!(callback.calls().is_empty());
    }

    #[tokio::test]
    async fn test_callback_delivery() {
        let publisher = Arc::new(RecordingPublisher::default());
        let callback = Arc::new(RecordingCallback::with_status(200));
        let dispatcher = dispatcher(publisher.clone(), callback.clone());

        let outcome = dispatcher
            .deliver(&ReplyMode::Callback("http://cb".into()), &DeliveryPayload::failure("boom"))
            .await;

        assert!(matches!(outcome, DeliveryOutcome::Posted { status: 200, .. }));
        assert_eq!(callback.calls(), vec![("http://cb".to_string(), json!({"error": "boom"}))]);
        assert!(publisher.messages().is_empty());
    }

    #[tokio::test]
    async fn test_callback_error_status_is_failure_but_not_propagated() {
        let publisher = Arc::new(RecordingPublisher::default());
        let callback = Arc::new(RecordingCallback::with_status(500));
        let dispatcher = dispatcher(publisher, callback);

        let outcome = dispatcher
            .deliver(&ReplyMode::Callback("http://cb".into()), &DeliveryPayload::failure("boom"))
            .await;

        assert!(matches!(
            outcome,
            DeliveryOutcome::Failed {
                error: DeliveryError::CallbackStatus { status: 500, .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let publisher = Arc::new(RecordingPublisher::failing());
        let callback = Arc::new(RecordingCallback::with_status(200));
        let dispatcher = dispatcher(publisher, callback);

        let outcome = dispatcher
            .deliver(&ReplyMode::Queue("resp-q".into()), &DeliveryPayload::failure("boom"))
            .await;
        assert!(matches!(
            outcome,
            DeliveryOutcome::Failed {
                error: DeliveryError::PublishError { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_no_reply_mode_skips() {
        let publisher = Arc::new(RecordingPublisher::default());
        let callback = Arc::new(RecordingCallback::with_status(200));
        let dispatcher = dispatcher(publisher.clone(), callback.clone());

        let outcome = dispatcher
            .deliver(&ReplyMode::None, &DeliveryPayload::failure("boom"))
            .await;

        assert!(matches!(outcome, DeliveryOutcome::Skipped));
        assert!(publisher.messages().is_empty());
        assert!(callback.calls().is_empty());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[test]
    fn test_echoed_file_content_is_redacted() {
        let body = r#"{"request":{"POST":{"file_content":"UklGRiQAAABXQVZF","user_id":"42"}}}"#;
        let redacted: Value = serde_json::from_str(&redact_response_body(body)).unwrap();
        assert_eq!(redacted["request"]["POST"]["file_content"], json!("..."));
        assert_eq!(redacted["request"]["POST"]["user_id"], json!("42"));

        assert_eq!(redact_response_body("<html>oops</html>"), "<html>oops</html>");
    }

    #[tokio::test]
    async fn test_failed_callback_body_never_carries_audio() {
        let publisher = Arc::new(RecordingPublisher::default());
        let callback = Arc::new(RecordingCallback::with_response(
            502,
            r#"{"request":{"POST":{"file_content":"UklGRiQAAABXQVZF"}}}"#,
        ));
        let dispatcher = dispatcher(publisher, callback);

        let outcome = dispatcher
            .deliver(&ReplyMode::Callback("http://cb".into()), &DeliveryPayload::failure("boom"))
            .await;

        match outcome {
            DeliveryOutcome::Failed {
                error: DeliveryError::CallbackStatus { status, body },
            } => {
                assert_eq!(status, 502);
                assert!(!body.contains("UklGRiQAAABXQVZF"));
                assert!(body.contains("\"file_content\":\"...\""));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

//! Task Processor - 单条消息的处理状态机
//!
//! Received → Parsed → AssetsSynced → Synthesized → Delivered
//! 任意阶段出错进入 Failed；只要能解析出回复方式，就一定回传一次结果。

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::application::error::TaskError;
use crate::application::pipeline::{DeliveryOutcome, ResponseDispatcher};
use crate::application::ports::{
    SynthesisError, SynthesisRequest, SynthesizerPort, VoiceAssetStorePort,
};
use crate::domain::delivery::DeliveryPayload;
use crate::domain::task::Task;

/// 任务阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    Received,
    Parsed,
    AssetsSynced,
    Synthesized,
    Delivered,
    Failed,
}

/// 单条消息的处理结果
#[derive(Debug)]
pub struct TaskReport {
    pub stage: TaskStage,
    pub error: Option<TaskError>,
    /// 解析失败时为 None
    pub delivery: Option<DeliveryOutcome>,
}

/// 任务处理器
pub struct TaskProcessor {
    voice_store: Arc<dyn VoiceAssetStorePort>,
    synthesizer: Arc<dyn SynthesizerPort>,
    dispatcher: ResponseDispatcher,
}

impl TaskProcessor {
    pub fn new(
        voice_store: Arc<dyn VoiceAssetStorePort>,
        synthesizer: Arc<dyn SynthesizerPort>,
        dispatcher: ResponseDispatcher,
    ) -> Self {
        Self {
            voice_store,
            synthesizer,
            dispatcher,
        }
    }

    /// 处理一条原始消息，不会返回错误
    pub async fn handle(&self, body: &[u8]) -> TaskReport {
        let span = tracing::info_span!("task", trace_id = %Uuid::new_v4());
        self.handle_inner(body).instrument(span).await
    }

    async fn handle_inner(&self, body: &[u8]) -> TaskReport {
        let mut stage = TaskStage::Received;
        tracing::debug!(size = body.len(), "Message received");

        let task = match Task::decode(body) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable message");
                advance(&mut stage, TaskStage::Failed);
                return TaskReport {
                    stage,
                    error: Some(TaskError::Parse(e)),
                    delivery: None,
                };
            }
        };
        advance(&mut stage, TaskStage::Parsed);

        tracing::info!(
            user_id = %task.user_id,
            event_id = %task.event_id,
            voice_files = task.voice_files.len(),
            output = %task.output_file_name,
            "Task parsed"
        );

        let (payload, error) = match self.execute(&task, &mut stage).await {
            Ok(payload) => (payload, None),
            Err(e) => {
                tracing::error!(
                    user_id = %task.user_id,
                    kind = e.kind(),
                    error = %e,
                    "Task failed"
                );
                advance(&mut stage, TaskStage::Failed);
                (DeliveryPayload::failure(e.to_string()), Some(e))
            }
        };

        let delivery = self.dispatcher.deliver(&task.reply, &payload).await;
        if error.is_none() {
            advance(&mut stage, TaskStage::Delivered);
            tracing::info!(user_id = %task.user_id, output = %task.output_file_name, "Task completed");
        }

        TaskReport {
            stage,
            error,
            delivery: Some(delivery),
        }
    }

    async fn execute(&self, task: &Task, stage: &mut TaskStage) -> Result<DeliveryPayload, TaskError> {
        let voice_id = task.voice_id();

        let report = self.voice_store.sync(&voice_id, &task.voice_files).await?;
        tracing::info!(
            voice_id = %voice_id,
            downloaded = report.downloaded.len(),
            reused = report.reused.len(),
            removed = report.removed.len(),
            "Voice assets synced"
        );
        advance(stage, TaskStage::AssetsSynced);

        if task.has_blank_text() {
            return Err(TaskError::empty_text());
        }

        let request = SynthesisRequest {
            voice_id: voice_id.clone(),
            voice_dir: self.voice_store.voice_dir(&voice_id),
            text: task.text.clone(),
            output_name: task.output_file_name.as_str().to_string(),
        };
        tracing::info!(
            backend = self.synthesizer.name(),
            voice_id = %voice_id,
            text_len = task.text.len(),
            "Starting synthesis"
        );
        let output = self.synthesizer.synthesize(request).await?;
        let primary = output.primary().ok_or(SynthesisError::NoOutput)?;
        if output.files.len() > 1 {
            tracing::debug!(files = ?output.files, "Backend produced several files, using the first");
        }
        advance(stage, TaskStage::Synthesized);

        let audio = tokio::fs::read(primary)
            .await
            .map_err(|e| TaskError::OutputRead {
                path: primary.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(path = %primary.display(), size = audio.len(), "Synthesized audio loaded");

        Ok(DeliveryPayload::success(task, BASE64.encode(audio)))
    }
}

fn advance(stage: &mut TaskStage, next: TaskStage) {
    tracing::debug!(from = ?*stage, to = ?next, "Task stage changed");
    *stage = next;
}

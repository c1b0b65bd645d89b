//! 测试替身（仅测试编译）

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::ports::{
    AssetSyncError, CallbackClientPort, CallbackResponse, DeliveryError, FetchError,
    QueuePublisherPort, SyncReport, SynthesisError, SynthesisOutput, SynthesisRequest,
    SynthesizerPort, VoiceAssetStorePort,
};
use crate::domain::delivery::DeliveryPayload;
use crate::domain::task::VoiceFile;

/// 记录所有发布到队列的消息
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn json_messages(&self) -> Vec<(String, Value)> {
        self.messages()
            .into_iter()
            .map(|(queue, body)| (queue, serde_json::from_slice(&body).unwrap()))
            .collect()
    }
}

#[async_trait]
impl QueuePublisherPort for RecordingPublisher {
    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::PublishError {
                queue: queue.to_string(),
                message: "channel closed".to_string(),
            });
        }
        self.messages.lock().unwrap().push((queue.to_string(), body));
        Ok(())
    }
}

/// 记录所有回调请求
pub struct RecordingCallback {
    calls: Mutex<Vec<(String, Value)>>,
    status: u16,
    body: String,
}

impl RecordingCallback {
    pub fn with_status(status: u16) -> Self {
        Self::with_response(status, "{}")
    }

    pub fn with_response(status: u16, body: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status,
            body: body.to_string(),
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackClientPort for RecordingCallback {
    async fn post(
        &self,
        url: &str,
        payload: &DeliveryPayload,
    ) -> Result<CallbackResponse, DeliveryError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), serde_json::to_value(payload).unwrap()));
        Ok(CallbackResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// 只记录调用的音色存储
pub struct RecordingVoiceStore {
    root: PathBuf,
    syncs: Mutex<Vec<(String, Vec<VoiceFile>)>>,
    fail_with: Option<String>,
}

impl RecordingVoiceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            syncs: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn failing(root: impl Into<PathBuf>, message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(root)
        }
    }

    pub fn syncs(&self) -> Vec<(String, Vec<VoiceFile>)> {
        self.syncs.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceAssetStorePort for RecordingVoiceStore {
    fn voice_dir(&self, voice_id: &str) -> PathBuf {
        self.root.join(voice_id)
    }

    async fn sync(&self, voice_id: &str, files: &[VoiceFile]) -> Result<SyncReport, AssetSyncError> {
        self.syncs
            .lock()
            .unwrap()
            .push((voice_id.to_string(), files.to_vec()));
        match &self.fail_with {
            Some(message) => Err(AssetSyncError::Download {
                file_name: files
                    .first()
                    .map(|f| f.file_name.clone())
                    .unwrap_or_default(),
                source: FetchError::NetworkError(message.clone()),
            }),
            None => Ok(SyncReport::default()),
        }
    }
}

/// 合成桩：把固定字节写到输出目录，或返回固定错误
pub struct StubSynthesizer {
    output_dir: PathBuf,
    audio: Vec<u8>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl StubSynthesizer {
    pub fn producing(output_dir: impl Into<PathBuf>, audio: &[u8]) -> Self {
        Self {
            output_dir: output_dir.into(),
            audio: audio.to_vec(),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            output_dir: PathBuf::new(),
            audio: Vec::new(),
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesizerPort for StubSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(SynthesisError::Backend(message.clone()));
        }
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;
        let path = self.output_dir.join(&request.output_name);
        tokio::fs::write(&path, &self.audio)
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;
        Ok(SynthesisOutput::single(path))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

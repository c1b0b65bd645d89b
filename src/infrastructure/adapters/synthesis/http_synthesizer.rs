//! HTTP Synthesizer - 调用外部 TTS HTTP 服务
//!
//! 实现 SynthesizerPort trait
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/infer
//! Request: {"text": "...", "voice": "user_42", "voice_dir": "...", "output_name": "greet.wav"}
//! Response: audio/wav binary

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::ports::{
    SynthesisError, SynthesisOutput, SynthesisRequest, SynthesizerPort,
};

/// TTS 推理请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    text: &'a str,
    voice: &'a str,
    /// 参考音频目录（TTS 服务与 worker 共享文件系统时使用）
    voice_dir: String,
    output_name: &'a str,
}

/// HTTP 合成后端配置
#[derive(Debug, Clone)]
pub struct HttpSynthesizerConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 输出根目录，结果写入 `{output_dir}/{voice}/{output_name}`
    pub output_dir: PathBuf,
}

impl Default for HttpSynthesizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 1800,
            output_dir: PathBuf::from("results/longform"),
        }
    }
}

impl HttpSynthesizerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// HTTP 合成后端
pub struct HttpSynthesizer {
    client: Client,
    config: HttpSynthesizerConfig,
}

impl HttpSynthesizer {
    pub fn new(config: HttpSynthesizerConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn infer_url(&self) -> String {
        format!("{}/api/tts/infer", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SynthesizerPort for HttpSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
        let body = TtsHttpRequest {
            text: &request.text,
            voice: &request.voice_id,
            voice_dir: request.voice_dir.display().to_string(),
            output_name: &request.output_name,
        };

        tracing::debug!(
            url = %self.infer_url(),
            text_len = request.text.len(),
            voice = %request.voice_id,
            "Sending TTS infer request"
        );

        let response = self
            .client
            .post(self.infer_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else if e.is_connect() {
                    SynthesisError::NetworkError(format!("Cannot connect to TTS service: {}", e))
                } else {
                    SynthesisError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(format!("Failed to read audio: {}", e)))?;
        if audio_data.is_empty() {
            return Err(SynthesisError::InvalidResponse("empty audio body".to_string()));
        }

        let voice_out_dir = self.config.output_dir.join(&request.voice_id);
        tokio::fs::create_dir_all(&voice_out_dir)
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;
        let path = voice_out_dir.join(&request.output_name);
        tokio::fs::write(&path, &audio_data)
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;

        tracing::info!(
            path = %path.display(),
            audio_size = audio_data.len(),
            "TTS inference completed"
        );

        Ok(SynthesisOutput::single(path))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

//! Synthesizer Port - TTS 合成后端抽象
//!
//! 合成后端是外部黑盒，这里只约定输入输出

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    IoError(String),

    /// 后端自身抛出的错误，原样回传
    #[error("{0}")]
    Backend(String),

    #[error("Synthesis backend produced no output")]
    NoOutput,
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 音色标识（如 `user_42`）
    pub voice_id: String,
    /// 已同步好的参考音频目录
    pub voice_dir: PathBuf,
    /// 要合成的文本，调用方保证非空
    pub text: String,
    /// 输出文件名（`.wav`）
    pub output_name: String,
}

/// 合成结果
#[derive(Debug, Clone, Default)]
pub struct SynthesisOutput {
    /// 生成的音频文件，第一个为主输出
    pub files: Vec<PathBuf>,
}

impl SynthesisOutput {
    pub fn single(path: PathBuf) -> Self {
        Self { files: vec![path] }
    }

    pub fn primary(&self) -> Option<&PathBuf> {
        self.files.first()
    }
}

/// Synthesizer Port
#[async_trait]
pub trait SynthesizerPort: Send + Sync {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError>;

    /// 后端名称（用于日志）
    fn name(&self) -> &'static str;
}

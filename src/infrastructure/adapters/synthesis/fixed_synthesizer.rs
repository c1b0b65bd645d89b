//! Fixed Synthesizer - 不调用任何模型的合成后端
//!
//! 总是把同一个 WAV 文件复制到输出位置，用于冒烟测试和链路联调

use async_trait::async_trait;
use std::path::PathBuf;

use crate::application::ports::{
    SynthesisError, SynthesisOutput, SynthesisRequest, SynthesizerPort,
};

/// Fixed Synthesizer 配置
#[derive(Debug, Clone)]
pub struct FixedSynthesizerConfig {
    /// 固定返回的音频文件路径
    pub audio_file_path: PathBuf,
    /// 输出根目录
    pub output_dir: PathBuf,
}

/// Fixed Synthesizer
pub struct FixedSynthesizer {
    config: FixedSynthesizerConfig,
    /// 缓存的音频数据
    audio_data: Vec<u8>,
}

impl FixedSynthesizer {
    pub fn new(config: FixedSynthesizerConfig) -> Result<Self, std::io::Error> {
        let audio_data = std::fs::read(&config.audio_file_path)?;
        tracing::info!(
            path = %config.audio_file_path.display(),
            size = audio_data.len(),
            "FixedSynthesizer initialized"
        );
        Ok(Self { config, audio_data })
    }
}

#[async_trait]
impl SynthesizerPort for FixedSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
        tracing::debug!(
            text_len = request.text.len(),
            voice = %request.voice_id,
            "FixedSynthesizer: returning fixed audio"
        );

        let dir = self.config.output_dir.join(&request.voice_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;
        let path = dir.join(&request.output_name);
        tokio::fs::write(&path, &self.audio_data)
            .await
            .map_err(|e| SynthesisError::IoError(e.to_string()))?;

        Ok(SynthesisOutput::single(path))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

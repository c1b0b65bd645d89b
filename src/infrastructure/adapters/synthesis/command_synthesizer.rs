//! Command Synthesizer - 以子进程方式调用 TTS 脚本
//!
//! 参数模板占位符:
//! - `{voice}`: 音色标识
//! - `{voice_dir}`: 参考音频目录
//! - `{text}`: 合成文本
//! - `{output}`: 输出文件名（含 `.wav`）
//! - `{output_stem}`: 输出文件名（不含扩展名）
//! - `{output_dir}`: 输出根目录
//!
//! 脚本需要把结果写到 `{output_dir}/{voice}/{output}`

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::application::ports::{
    SynthesisError, SynthesisOutput, SynthesisRequest, SynthesizerPort,
};

/// stderr 回传的最大行数
const STDERR_TAIL_LINES: usize = 5;

/// 子进程后端配置
#[derive(Debug, Clone)]
pub struct CommandSynthesizerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub output_dir: PathBuf,
    pub timeout_secs: u64,
}

/// 子进程合成后端
pub struct CommandSynthesizer {
    config: CommandSynthesizerConfig,
}

impl CommandSynthesizer {
    pub fn new(config: CommandSynthesizerConfig) -> Self {
        Self { config }
    }

    fn render_args(&self, request: &SynthesisRequest) -> Vec<String> {
        let stem = request
            .output_name
            .strip_suffix(".wav")
            .unwrap_or(&request.output_name);
        let output_dir = self.config.output_dir.display().to_string();
        let voice_dir = request.voice_dir.display().to_string();

        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{voice_dir}", &voice_dir)
                    .replace("{voice}", &request.voice_id)
                    .replace("{output_stem}", stem)
                    .replace("{output_dir}", &output_dir)
                    .replace("{output}", &request.output_name)
                    .replace("{text}", &request.text)
            })
            .collect()
    }

    fn expected_output(&self, request: &SynthesisRequest) -> PathBuf {
        self.config
            .output_dir
            .join(&request.voice_id)
            .join(&request.output_name)
    }
}

#[async_trait]
impl SynthesizerPort for CommandSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
        let args = self.render_args(&request);
        let expected = self.expected_output(&request);

        // 同名旧结果必须先删掉，否则脚本未写出时会误用上一次的音频
        match tokio::fs::remove_file(&expected).await {
            Ok(()) => tracing::debug!(path = %expected.display(), "Removed previous output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SynthesisError::IoError(format!(
                    "Failed to remove previous output {}: {}",
                    expected.display(),
                    e
                )))
            }
        }

        tracing::debug!(program = %self.config.program, args = ?args, "Spawning TTS command");

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SynthesisError::IoError(format!("Failed to spawn {}: {}", self.config.program, e))
            })?;

        let output = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| SynthesisError::Timeout)?
        .map_err(|e| SynthesisError::IoError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr_tail(&stderr);
            tracing::warn!(status = %output.status, stderr = %tail, "TTS command failed");
            return Err(SynthesisError::Backend(if tail.is_empty() {
                format!("TTS command exited with {}", output.status)
            } else {
                tail
            }));
        }

        match tokio::fs::metadata(&expected).await {
            Ok(meta) if meta.is_file() => {
                tracing::info!(path = %expected.display(), size = meta.len(), "TTS command completed");
                Ok(SynthesisOutput::single(expected))
            }
            _ => Err(SynthesisError::InvalidResponse(format!(
                "TTS command did not produce {}",
                expected.display()
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

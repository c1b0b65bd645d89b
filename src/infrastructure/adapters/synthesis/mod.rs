//! Synthesis Adapter - TTS 合成后端实现

mod command_synthesizer;
mod fixed_synthesizer;
mod http_synthesizer;

pub use command_synthesizer::{CommandSynthesizer, CommandSynthesizerConfig};
pub use fixed_synthesizer::{FixedSynthesizer, FixedSynthesizerConfig};
pub use http_synthesizer::{HttpSynthesizer, HttpSynthesizerConfig};

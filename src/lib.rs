//! voxq - 队列驱动的 TTS worker
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Task: 入站任务消息的解码与校验
//! - Delivery: 回传载荷
//!
//! 应用层 (application/):
//! - Ports: 端口定义（VoiceAssetStore, Synthesizer, QueuePublisher, CallbackClient, VoiceSampleSource）
//! - Pipeline: 任务处理状态机、结果回传、任务生成
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: 参考音频下载、合成后端、HTTP 回调
//! - Broker: AMQP 会话与响应发布
//! - Worker: 消费循环与空闲看门狗
//! - Persistence: SQLite 任务来源

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};

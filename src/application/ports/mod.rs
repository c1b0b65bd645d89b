//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod response_channel;
mod synthesizer;
mod voice_assets;
mod voice_samples;

pub use response_channel::{
    CallbackClientPort, CallbackResponse, DeliveryError, QueuePublisherPort,
};
pub use synthesizer::{SynthesisError, SynthesisOutput, SynthesisRequest, SynthesizerPort};
pub use voice_assets::{
    AssetFetcherPort, AssetSyncError, FetchError, SyncReport, VoiceAssetStorePort,
};
pub use voice_samples::{
    RepositoryError, VoiceSampleCriteria, VoiceSampleRecord, VoiceSampleSourcePort,
};

//! Voice Adapter - 参考音频下载与本地同步

mod http_fetcher;
mod voice_asset_store;

pub use http_fetcher::HttpAssetFetcher;
pub use voice_asset_store::{content_hash, FileVoiceAssetStore};

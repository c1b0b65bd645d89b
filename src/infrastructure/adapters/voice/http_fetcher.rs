//! HTTP Asset Fetcher - 通过 HTTP GET 下载参考音频

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::application::ports::{AssetFetcherPort, FetchError};

/// HTTP 下载器
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcherPort for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| FetchError::BodyError(e.to_string()))?;

        Ok(data.to_vec())
    }
}

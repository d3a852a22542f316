/// Image loader: download bytes over HTTP and decode them
///
/// Decoding is CPU-bound, so it runs on tokio's blocking pool.
/// Every load observes a cancellation token owned by the screen.
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::FetchError;
use crate::state::data::{DecodedImage, ImageRequest};

/// Future returned by [`ImageLoader::load`]
pub type LoadFuture = BoxFuture<'static, Result<DecodedImage, FetchError>>;

/// Trait for fetching and decoding an image.
///
/// The workflow only depends on this, so tests can swap in a scripted loader.
pub trait ImageLoader: Send + Sync {
    /// Fetch `request` and decode it. Resolves to `FetchError::Cancelled`
    /// if `cancel` fires first.
    fn load(&self, request: ImageRequest, cancel: CancellationToken) -> LoadFuture;
}

/// Real loader using reqwest
#[derive(Debug, Clone)]
pub struct HttpImageLoader {
    client: reqwest::Client,
}

impl HttpImageLoader {
    /// Create a loader with the timeout and user agent from settings
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl ImageLoader for HttpImageLoader {
    fn load(&self, request: ImageRequest, cancel: CancellationToken) -> LoadFuture {
        let client = self.client.clone();
        async move {
            let url = parse_url(request.url())?;
            tracing::debug!("fetching {}", url);

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("fetch of {} cancelled", url);
                    Err(FetchError::Cancelled)
                }
                result = fetch_and_decode(client, url.clone()) => result,
            }
        }
        .boxed()
    }
}

/// Only http(s) URLs are fetched
fn parse_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

async fn fetch_and_decode(client: reqwest::Client, url: Url) -> Result<DecodedImage, FetchError> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    tracing::debug!("received {} bytes from {}", bytes.len(), url);

    let decoded = tokio::task::spawn_blocking(move || DecodedImage::from_bytes(&bytes))
        .await
        .map_err(|e| FetchError::Decode(format!("Task join error: {}", e)))?
        .map_err(|e| FetchError::Decode(e.to_string()))?;

    tracing::info!("📷 decoded {}x{} image from {}", decoded.width(), decoded.height(), url);
    Ok(decoded)
}

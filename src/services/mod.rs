//! Adapters for the three remote services a job passes through
//!
//! Each adapter performs exactly one request per call and never retries.

pub mod recognition;
pub mod synthesis;
pub mod translation;

use crate::error::ServiceError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;

pub use recognition::HttpRecognizer;
pub use synthesis::{SpeechSynthesisClient, SynthesisSettings};
pub use translation::HttpTranslator;

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
pub const SUBSCRIPTION_REGION_HEADER: &str = "Ocp-Apim-Subscription-Region";

/// One-shot speech to text
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// `language` is a locale such as `en-US`. `auto` is forwarded unchanged for endpoints that detect it.
    async fn recognize(&self, audio: Bytes, language: &str) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ServiceError>;
}

/// Text to speech, producing 16 kHz 16-bit mono PCM in a RIFF container
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, ServiceError>;
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ServiceError> {
    Ok(ClientBuilder::new()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_nodelay(true)
        .build()?)
}

/// Joins a base endpoint and an api path without doubling slashes
pub(crate) fn api_url(endpoint: &str, api_path: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if api_path.starts_with('/') {
        format!("{}{}", endpoint, api_path)
    } else {
        format!("{}/{}", endpoint, api_path)
    }
}

/// Turns a non-2xx response into `ServiceError::Status`, keeping the body for diagnosis
pub(crate) async fn check_status(resp: Response) -> Result<Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

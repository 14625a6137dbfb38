use super::{Recognizer, SUBSCRIPTION_KEY_HEADER, api_url, build_client, check_status};
use crate::error::ServiceError;
use crate::io_struct::{RecognitionOutcome, RecognitionResponse};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

const RECOGNITION_PATH: &str = "/speech/recognition/conversation/cognitiveservices/v1";
const AUDIO_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";

/// Speech recognition over the short-audio REST api
#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    client: Client,
    endpoint: String,
    key: String,
}

impl HttpRecognizer {
    pub fn new(endpoint: String, key: String, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
            key,
        })
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, audio: Bytes, language: &str) -> Result<String, ServiceError> {
        let resp = self
            .client
            .post(api_url(&self.endpoint, RECOGNITION_PATH))
            .query(&[("language", language), ("format", "simple")])
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(reqwest::header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
            .body(audio)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;
        let parsed: RecognitionResponse = serde_json::from_slice(&body)
            .map_err(|e| ServiceError::Malformed(format!("recognition response: {}", e)))?;

        match parsed.outcome() {
            RecognitionOutcome::Recognized => {
                let text = parsed.display_text.unwrap_or_default();
                if text.trim().is_empty() {
                    return Err(ServiceError::NoMatch("empty transcript".to_string()));
                }
                Ok(text)
            }
            RecognitionOutcome::NoMatch => Err(ServiceError::NoMatch(parsed.recognition_status)),
            RecognitionOutcome::Error(status) => Err(ServiceError::Rejected(status)),
        }
    }
}

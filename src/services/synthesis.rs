use super::{SUBSCRIPTION_KEY_HEADER, Synthesizer, api_url, build_client, check_status};
use crate::error::ServiceError;
use crate::io_struct::build_ssml;
use crate::language::VoiceMap;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use std::time::Duration;

const SYNTHESIS_PATH: &str = "/cognitiveservices/v1";
pub const OUTPUT_FORMAT: &str = "riff-16khz-16bit-mono-pcm";
const USER_AGENT: &str = "speech-relay";

/// Everything needed to construct one synthesis client
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub endpoint: String,
    pub key: String,
    /// Used for any locale `voices` has no entry for
    pub voice: String,
    pub voices: VoiceMap,
    pub timeout: Duration,
}

/// A pooled handle to the synthesis service. Each handle owns its own
/// connection pool, so keeping several warm spreads load across connections.
#[derive(Debug)]
pub struct SpeechSynthesisClient {
    client: Client,
    url: Url,
    key: String,
    voice: String,
    voices: VoiceMap,
}

impl SpeechSynthesisClient {
    pub fn new(settings: &SynthesisSettings) -> Result<Self, ServiceError> {
        let url = Url::parse(&api_url(&settings.endpoint, SYNTHESIS_PATH)).map_err(|e| {
            ServiceError::Malformed(format!(
                "invalid synthesis endpoint {}: {}",
                settings.endpoint, e
            ))
        })?;
        if settings.voice.trim().is_empty() {
            return Err(ServiceError::Malformed("synthesis voice is empty".to_string()));
        }
        Ok(Self {
            client: build_client(settings.timeout)?,
            url,
            key: settings.key.clone(),
            voice: settings.voice.clone(),
            voices: settings.voices.clone(),
        })
    }
}

#[async_trait]
impl Synthesizer for SpeechSynthesisClient {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, ServiceError> {
        let voice = self.voices.voice_for(language, &self.voice);
        let resp = self
            .client
            .post(self.url.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .body(build_ssml(text, language, voice))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let audio = resp.bytes().await?;
        if audio.is_empty() {
            return Err(ServiceError::EmptyAudio);
        }
        Ok(audio)
    }
}

#![allow(dead_code)]

pub mod mock_services;

use async_trait::async_trait;
use bytes::Bytes;
use speech_relay_rs::admission::AdmissionQueue;
use speech_relay_rs::app_state::AppState;
use speech_relay_rs::client_pool::{ClientPool, PoolPolicy};
use speech_relay_rs::config::ServiceConfig;
use speech_relay_rs::error::ServiceError;
use speech_relay_rs::pipeline::{Pipeline, PipelineConfig};
use speech_relay_rs::services::{Recognizer, Synthesizer, Translator};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const BOUNDARY: &str = "----speechrelayboundary";

/// Builds a multipart/form-data body with an optional audio file and language
pub fn multipart_body(audio: Option<&[u8]>, language: Option<&str>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    if let Some(audio) = audio {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"clip.wav\"\r\nContent-Type: audio/wav\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(audio);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(language) = language {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"language\"\r\n\r\n{}\r\n",
                BOUNDARY, language
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

#[derive(Default)]
pub struct CallCounts {
    pub recognize: AtomicUsize,
    pub translate: AtomicUsize,
    pub synthesize: AtomicUsize,
}

impl CallCounts {
    pub fn get(&self) -> (usize, usize, usize) {
        (
            self.recognize.load(Ordering::SeqCst),
            self.translate.load(Ordering::SeqCst),
            self.synthesize.load(Ordering::SeqCst),
        )
    }
}

pub struct FakeRecognizer {
    pub text: Option<String>,
    pub calls: Arc<CallCounts>,
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn recognize(&self, _audio: Bytes, _language: &str) -> Result<String, ServiceError> {
        self.calls.recognize.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| ServiceError::NoMatch("NoMatch".to_string()))
    }
}

pub struct UppercaseTranslator {
    pub calls: Arc<CallCounts>,
}

#[async_trait]
impl Translator for UppercaseTranslator {
    async fn translate(&self, text: &str, _target: &str) -> Result<String, ServiceError> {
        self.calls.translate.fetch_add(1, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
}

pub struct EchoSynthesizer {
    pub calls: Arc<CallCounts>,
    pub delay: Duration,
}

#[async_trait]
impl Synthesizer for EchoSynthesizer {
    async fn synthesize(&self, text: &str, _language: &str) -> Result<Bytes, ServiceError> {
        self.calls.synthesize.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// App state wired to in-process fakes instead of remote services
pub fn fake_state(
    recognized: Option<&str>,
    concurrency: usize,
    synth_delay: Duration,
) -> (AppState, Arc<CallCounts>) {
    let calls = Arc::new(CallCounts::default());
    let synth_calls = calls.clone();
    let pool = ClientPool::initialize(2, PoolPolicy::Exclusive, move |_| {
        Ok::<_, String>(Arc::new(EchoSynthesizer {
            calls: synth_calls.clone(),
            delay: synth_delay,
        }) as Arc<dyn Synthesizer>)
    })
    .unwrap();
    let pipeline = Pipeline::new(
        Arc::new(FakeRecognizer {
            text: recognized.map(str::to_string),
            calls: calls.clone(),
        }),
        Arc::new(UppercaseTranslator {
            calls: calls.clone(),
        }),
        Arc::new(pool),
        PipelineConfig {
            recognition_language: "auto".to_string(),
            default_target_language: "en-US".to_string(),
            stage_timeout: Duration::from_secs(5),
        },
    );
    let state = AppState::with_parts(pipeline, AdmissionQueue::new(concurrency, None), 1024, 0);
    (state, calls)
}

/// A valid configuration pointing every remote service at `endpoint`
pub fn service_config(endpoint: &str, port: u16) -> ServiceConfig {
    use clap::Parser;
    let port = port.to_string();
    ServiceConfig::try_parse_from([
        "speech-relay",
        "--port",
        port.as_str(),
        "--speech-key",
        "test-speech-key",
        "--speech-region",
        "local",
        "--speech-endpoint",
        endpoint,
        "--translator-key",
        "test-translator-key",
        "--translator-region",
        "local",
        "--translator-endpoint",
        endpoint,
        "--synthesis-pool-size",
        "2",
        "--log-interval",
        "0",
    ])
    .unwrap()
}

pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Polls `cond` until it holds, failing the test after two seconds
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

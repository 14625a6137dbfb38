use crate::admission::AdmissionQueue;
use crate::client_pool::ClientPool;
use crate::config::ServiceConfig;
use crate::error::PipelineError;
use crate::pipeline::{Pipeline, PipelineConfig, TranslationJob};
use crate::services::{
    HttpRecognizer, HttpTranslator, SpeechSynthesisClient, SynthesisSettings, Synthesizer,
};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;

/// Shared state handed to every request handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub queue: Arc<AdmissionQueue>,
    pub max_upload_bytes: usize,
    pub log_interval: u64,
}

impl AppState {
    /// Builds the adapters, the synthesis pool and the admission queue.
    /// Any failure here is fatal: the server must not start listening.
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let timeout = config.stage_timeout();
        if config.recognition_language_unsupported() {
            log::warn!(
                "recognition_language={} is not supported by the regional short-audio endpoint, set a locale such as en-US",
                config.recognition_language
            );
        }

        let recognizer = HttpRecognizer::new(
            config.recognition_endpoint(),
            config.speech_key.clone(),
            timeout,
        )?;
        let translator = HttpTranslator::new(
            config.translator_endpoint.clone(),
            config.translator_key.clone(),
            config.translator_region.clone(),
            timeout,
        )?;

        let settings = SynthesisSettings {
            endpoint: config.synthesis_endpoint(),
            key: config.speech_key.clone(),
            voice: config.synthesis_voice.clone(),
            voices: config.voice_map()?,
            timeout,
        };
        log::info!(
            "Synthesis voice: {} ({} per-locale overrides)",
            settings.voice,
            settings.voices.len()
        );
        let synthesizers = ClientPool::initialize(
            config.synthesis_pool_size,
            config.pool_policy()?,
            |_| SpeechSynthesisClient::new(&settings).map(|c| Arc::new(c) as Arc<dyn Synthesizer>),
        )?;

        let pipeline = Pipeline::new(
            Arc::new(recognizer),
            Arc::new(translator),
            Arc::new(synthesizers),
            PipelineConfig {
                recognition_language: config.recognition_language.clone(),
                default_target_language: config.default_target_language.clone(),
                stage_timeout: timeout,
            },
        );
        let queue = AdmissionQueue::new(config.queue_concurrency, config.max_queue_depth);

        Ok(Self::with_parts(
            pipeline,
            queue,
            config.max_upload_bytes,
            config.log_interval,
        ))
    }

    pub fn with_parts(
        pipeline: Pipeline,
        queue: AdmissionQueue,
        max_upload_bytes: usize,
        log_interval: u64,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            queue: Arc::new(queue),
            max_upload_bytes,
            log_interval,
        }
    }

    /// Queues a job and waits for its pipeline to finish
    pub async fn translate(&self, job: TranslationJob) -> Result<Bytes, PipelineError> {
        let job_id = job.id.clone();
        log::debug!(
            "{} submitted: {} bytes, target={:?}, queue={:?}",
            job_id,
            job.audio.len(),
            job.target_language,
            self.queue.stats()
        );
        let pipeline = self.pipeline.clone();
        match self.queue.submit(async move { pipeline.run(job).await }).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{} not admitted: {}", job_id, e);
                Err(e)
            }
        }
    }

    pub fn loads(&self) -> serde_json::Value {
        json!({
            "queue": self.queue.stats().to_json(),
            "pool": self.pipeline.synthesizers().to_json(),
        })
    }
}

//! Per-job orchestration: recognize, translate, synthesize
//!
//! Stages run strictly in order and the first failure short-circuits the
//! rest. Nothing is retried and nothing outlives the job.

use crate::client_pool::ClientPool;
use crate::error::{PipelineError, Stage};
use crate::services::{Recognizer, Synthesizer, Translator};
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type SynthesisPool = ClientPool<dyn Synthesizer>;

/// An uploaded clip waiting to be translated
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub id: String,
    pub audio: Bytes,
    pub target_language: Option<String>,
    pub submitted_at: Instant,
}

impl TranslationJob {
    pub fn new(audio: Bytes, target_language: Option<String>) -> Self {
        Self {
            id: format!("job-{:016x}", rand::random::<u64>()),
            audio,
            target_language: target_language.filter(|lang| !lang.trim().is_empty()),
            submitted_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Passed to the recognizer as its language parameter
    pub recognition_language: String,
    /// Used when a job does not name a target language
    pub default_target_language: String,
    /// Deadline applied to each remote stage separately
    pub stage_timeout: Duration,
}

pub struct Pipeline {
    recognizer: Arc<dyn Recognizer>,
    translator: Arc<dyn Translator>,
    synthesizers: Arc<SynthesisPool>,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("synthesizers", &self.synthesizers)
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        translator: Arc<dyn Translator>,
        synthesizers: Arc<SynthesisPool>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            recognizer,
            translator,
            synthesizers,
            config,
        }
    }

    pub fn synthesizers(&self) -> &SynthesisPool {
        &self.synthesizers
    }

    pub async fn run(&self, job: TranslationJob) -> Result<Bytes, PipelineError> {
        let result = self.execute(&job).await;
        let elapsed = job.submitted_at.elapsed();
        match &result {
            Ok(audio) => log::info!(
                "{} completed in {:?}: {} bytes of audio",
                job.id,
                elapsed,
                audio.len()
            ),
            Err(e) if e.stage() == Stage::Validation => {
                log::warn!("{} rejected at {}: {}", job.id, e.stage(), e)
            }
            Err(e) => log::error!(
                "{} failed at {} after {:?}: {}",
                job.id,
                e.stage(),
                elapsed,
                e
            ),
        }
        result
    }

    async fn execute(&self, job: &TranslationJob) -> Result<Bytes, PipelineError> {
        if job.audio.is_empty() {
            return Err(PipelineError::Validation("audio payload is empty".to_string()));
        }

        let text = self
            .with_deadline(
                Stage::Recognition,
                self.recognizer
                    .recognize(job.audio.clone(), &self.config.recognition_language),
            )
            .await?
            .map_err(PipelineError::RecognitionFailed)?;
        log::debug!("{} recognized {} chars", job.id, text.chars().count());

        let target_language = job
            .target_language
            .as_deref()
            .unwrap_or(&self.config.default_target_language);

        let translated = self
            .with_deadline(
                Stage::Translation,
                self.translator.translate(&text, target_language),
            )
            .await?
            .map_err(PipelineError::TranslationFailed)?;
        log::debug!(
            "{} translated to {} ({} chars)",
            job.id,
            target_language,
            translated.chars().count()
        );

        let audio = self
            .with_deadline(Stage::Synthesis, async {
                let client = self.synthesizers.acquire().await;
                log::debug!("{} synthesizing on pool entry {}", job.id, client.index());
                client.synthesize(&translated, target_language).await
            })
            .await?
            .map_err(PipelineError::SynthesisFailed)?;

        Ok(audio)
    }

    async fn with_deadline<F, T>(&self, stage: Stage, fut: F) -> Result<T, PipelineError>
    where
        F: Future<Output = T>,
    {
        let after = self.config.stage_timeout;
        tokio::time::timeout(after, fut)
            .await
            .map_err(|_| PipelineError::Timeout { stage, after })
    }
}

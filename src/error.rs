//! Error types for the speech relay
//!
//! Adapters report a [`ServiceError`] for a single remote call. The pipeline
//! tags it with the stage that produced it, yielding a [`PipelineError`] that
//! the HTTP layer maps to a status code and a `{"error": ...}` body.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use std::fmt;
use std::time::Duration;

/// Failure of one call to a remote speech or translation service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("no speech recognized ({0})")]
    NoMatch(String),

    #[error("service rejected the request: {0}")]
    Rejected(String),

    #[error("service returned no audio data")]
    EmptyAudio,
}

/// Pipeline step a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Admission,
    Recognition,
    Translation,
    Synthesis,
    Internal,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::Admission => "admission",
            Stage::Recognition => "recognition",
            Stage::Translation => "translation",
            Stage::Synthesis => "synthesis",
            Stage::Internal => "internal",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("speech recognition failed: {0}")]
    RecognitionFailed(#[source] ServiceError),

    #[error("translation failed: {0}")]
    TranslationFailed(#[source] ServiceError),

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(#[source] ServiceError),

    #[error("{stage} timed out after {}s", .after.as_secs_f64())]
    Timeout { stage: Stage, after: Duration },

    #[error("server is busy: {waiting} requests already waiting")]
    QueueFull { waiting: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Validation(_) => Stage::Validation,
            PipelineError::RecognitionFailed(_) => Stage::Recognition,
            PipelineError::TranslationFailed(_) => Stage::Translation,
            PipelineError::SynthesisFailed(_) => Stage::Synthesis,
            PipelineError::Timeout { stage, .. } => *stage,
            PipelineError::QueueFull { .. } => Stage::Admission,
            PipelineError::Internal(_) => Stage::Internal,
        }
    }
}

impl ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::RecognitionFailed(_)
            | PipelineError::TranslationFailed(_)
            | PipelineError::SynthesisFailed(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::QueueFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

use crate::client_pool::PoolPolicy;
use crate::error::{ConfigError, ConfigResult};
use crate::language::VoiceMap;
use crate::services::translation::DEFAULT_TRANSLATOR_ENDPOINT;
use clap::Parser;
use reqwest::Url;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "speech-relay")]
#[command(about = "Speech relay - transcribe, translate and re-voice uploaded audio clips")]
#[command(long_about = r#"
Speech relay - transcribe, translate and re-voice uploaded audio clips

Every option can also be supplied through the environment variable shown
in its help text. Configuration is read once at startup.

Examples:
  SPEECH_KEY=... SPEECH_REGION=westeurope \
  TRANSLATOR_KEY=... TRANSLATOR_REGION=westeurope \
  speech-relay --port 8080 --queue-concurrency 8 --synthesis-pool-size 4
"#)]
pub struct ServiceConfig {
    /// Host address to bind the server
    #[arg(long, env = "SPEECH_RELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Subscription key for speech recognition and synthesis
    #[arg(long, env = "SPEECH_KEY", hide_env_values = true)]
    pub speech_key: String,

    /// Region of the speech resource, used to derive the service hosts
    #[arg(long, env = "SPEECH_REGION")]
    pub speech_region: String,

    /// Override for both speech hosts (recognition and synthesis)
    #[arg(long, env = "SPEECH_ENDPOINT")]
    pub speech_endpoint: Option<String>,

    /// Subscription key for the translator
    #[arg(long, env = "TRANSLATOR_KEY", hide_env_values = true)]
    pub translator_key: String,

    /// Region of the translator resource
    #[arg(long, env = "TRANSLATOR_REGION")]
    pub translator_region: String,

    /// Translator endpoint
    #[arg(long, env = "TRANSLATOR_ENDPOINT", default_value = DEFAULT_TRANSLATOR_ENDPOINT)]
    pub translator_endpoint: String,

    /// Locale passed to the recognizer, e.g. en-US. "auto" is forwarded as is and
    /// only works with a SPEECH_ENDPOINT that detects the language itself; the
    /// regional short-audio endpoint needs a concrete locale.
    #[arg(long, env = "RECOGNITION_LANGUAGE", default_value = "auto")]
    pub recognition_language: String,

    /// Target language when a request does not name one
    #[arg(long, env = "DEFAULT_TARGET_LANGUAGE", default_value = "en-US")]
    pub default_target_language: String,

    /// Fallback voice for target locales missing from the voice map (use a multilingual voice)
    #[arg(long, env = "SYNTHESIS_VOICE", default_value = "en-US-JennyMultilingualNeural")]
    pub synthesis_voice: String,

    /// Per-locale voices, e.g. "de-DE=de-DE-KatjaNeural,fr-FR=fr-FR-DeniseNeural"
    #[arg(long, env = "SYNTHESIS_VOICE_MAP", default_value = "")]
    pub synthesis_voice_map: String,

    /// Maximum number of pipelines executing at once
    #[arg(long, env = "QUEUE_CONCURRENCY", default_value_t = 4)]
    pub queue_concurrency: usize,

    /// Maximum number of requests waiting for admission (unbounded if unset)
    #[arg(long, env = "MAX_QUEUE_DEPTH")]
    pub max_queue_depth: Option<usize>,

    /// Number of synthesis clients created at startup
    #[arg(long, env = "SYNTHESIS_POOL_SIZE", default_value_t = 4)]
    pub synthesis_pool_size: usize,

    /// How pool entries are handed out
    #[arg(long, env = "SYNTHESIS_POOL_POLICY", default_value = "exclusive", value_parser = ["shared", "random", "exclusive"])]
    pub synthesis_pool_policy: String,

    /// Deadline in seconds for each remote call
    #[arg(long, env = "STAGE_TIMEOUT_SECS", default_value_t = 60)]
    pub stage_timeout_secs: u64,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 26214400)] // 25MB
    pub max_upload_bytes: usize,

    /// Interval in seconds between load reports (0 disables them)
    #[arg(long, env = "LOG_INTERVAL_SECS", default_value_t = 30)]
    pub log_interval: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,
}

impl ServiceConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        require_non_empty("speech_key", &self.speech_key)?;
        require_non_empty("speech_region", &self.speech_region)?;
        require_non_empty("translator_key", &self.translator_key)?;
        require_non_empty("translator_region", &self.translator_region)?;
        require_non_empty("recognition_language", &self.recognition_language)?;
        require_non_empty("default_target_language", &self.default_target_language)?;

        if let Some(endpoint) = &self.speech_endpoint {
            validate_endpoint("speech_endpoint", endpoint)?;
        }
        validate_endpoint("translator_endpoint", &self.translator_endpoint)?;

        require_positive("queue_concurrency", self.queue_concurrency as u64)?;
        require_positive("synthesis_pool_size", self.synthesis_pool_size as u64)?;
        require_positive("stage_timeout_secs", self.stage_timeout_secs)?;
        require_positive("max_upload_bytes", self.max_upload_bytes as u64)?;
        if let Some(depth) = self.max_queue_depth {
            require_positive("max_queue_depth", depth as u64)?;
        }

        self.pool_policy()?;
        self.voice_map()?;
        Ok(())
    }

    pub fn pool_policy(&self) -> ConfigResult<PoolPolicy> {
        PoolPolicy::parse(&self.synthesis_pool_policy).ok_or_else(|| ConfigError::InvalidValue {
            field: "synthesis_pool_policy".to_string(),
            value: self.synthesis_pool_policy.clone(),
            reason: "expected shared or exclusive".to_string(),
        })
    }

    pub fn voice_map(&self) -> ConfigResult<VoiceMap> {
        VoiceMap::parse(&self.synthesis_voice_map)
    }

    /// True when the recognizer is asked to detect the language against the
    /// regional endpoint, which does not support detection
    pub fn recognition_language_unsupported(&self) -> bool {
        self.speech_endpoint.is_none() && self.recognition_language.eq_ignore_ascii_case("auto")
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn recognition_endpoint(&self) -> String {
        self.speech_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.stt.speech.microsoft.com", self.speech_region))
    }

    pub fn synthesis_endpoint(&self) -> String {
        self.speech_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.tts.speech.microsoft.com", self.speech_region))
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

fn require_non_empty(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingRequired {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn require_positive(field: &str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

fn validate_endpoint(field: &str, endpoint: &str) -> ConfigResult<()> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: field.to_string(),
        value: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}

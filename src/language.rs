//! Locale handling for the translator and the synthesis voice

use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;

/// Locales the translator addresses by something other than the bare
/// primary subtag. Keys are lowercase.
const TRANSLATOR_EXCEPTIONS: &[(&str, &str)] = &[
    ("zh-cn", "zh-Hans"),
    ("zh-sg", "zh-Hans"),
    ("zh-hans", "zh-Hans"),
    ("zh-tw", "zh-Hant"),
    ("zh-hk", "zh-Hant"),
    ("zh-mo", "zh-Hant"),
    ("zh-hant", "zh-Hant"),
    ("fr-ca", "fr-CA"),
    ("pt-pt", "pt-PT"),
    ("sr-cyrl", "sr-Cyrl"),
    ("sr-latn", "sr-Latn"),
    ("sr-rs", "sr-Cyrl"),
    ("mn-cyrl", "mn-Cyrl"),
    ("mn-mong", "mn-Mong"),
];

/// Maps a request locale such as `de-DE` to the translator's `to` code (`de`)
pub fn translator_language(locale: &str) -> String {
    let locale = locale.trim().replace('_', "-");
    let lower = locale.to_ascii_lowercase();
    if let Some((_, code)) = TRANSLATOR_EXCEPTIONS.iter().find(|(key, _)| *key == lower) {
        return code.to_string();
    }
    match lower.split('-').next() {
        Some("zh") => "zh-Hans".to_string(),
        Some(primary) if !primary.is_empty() => primary.to_string(),
        _ => locale,
    }
}

/// Voice selection per target locale, with a fallback voice for locales
/// that have no entry. The fallback should be a multilingual voice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceMap {
    voices: HashMap<String, String>,
}

impl VoiceMap {
    /// Parses `de-DE=de-DE-KatjaNeural,fr-FR=fr-FR-DeniseNeural`
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        let mut voices = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = || ConfigError::InvalidValue {
                field: "synthesis_voice_map".to_string(),
                value: entry.to_string(),
                reason: "expected locale=voice".to_string(),
            };
            let (locale, voice) = entry.split_once('=').ok_or_else(invalid)?;
            let (locale, voice) = (locale.trim(), voice.trim());
            if locale.is_empty() || voice.is_empty() {
                return Err(invalid());
            }
            voices.insert(locale.to_ascii_lowercase(), voice.to_string());
        }
        Ok(Self { voices })
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Exact locale first, then the bare language, then `fallback`
    pub fn voice_for<'a>(&'a self, locale: &str, fallback: &'a str) -> &'a str {
        let lower = locale.trim().to_ascii_lowercase();
        let primary = lower.split('-').next().unwrap_or_default();
        self.voices
            .get(&lower)
            .or_else(|| self.voices.get(primary))
            .map(String::as_str)
            .unwrap_or(fallback)
    }
}

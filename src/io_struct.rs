use serde::{Deserialize, Serialize};

/// Outcome code reported by the recognition service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    Recognized,
    NoMatch,
    Error(String),
}

impl RecognitionOutcome {
    pub fn from_status(status: &str) -> Self {
        match status {
            "Success" => RecognitionOutcome::Recognized,
            "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => RecognitionOutcome::NoMatch,
            other => RecognitionOutcome::Error(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecognitionResponse {
    pub recognition_status: String,
    #[serde(default)]
    pub display_text: Option<String>,
}

impl RecognitionResponse {
    pub fn outcome(&self) -> RecognitionOutcome {
        RecognitionOutcome::from_status(&self.recognition_status)
    }
}

/// One element of the single-element batch sent to the translator
#[derive(Debug, Deserialize, Serialize)]
pub struct TranslateInput {
    #[serde(rename = "Text")]
    pub text: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TranslateOutput {
    #[serde(default)]
    pub translations: Vec<Translation>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Translation {
    pub text: String,
    #[serde(default)]
    pub to: Option<String>,
}

/// Takes the first translation of the first batch element
pub fn first_translation(outputs: Vec<TranslateOutput>) -> Option<String> {
    outputs
        .into_iter()
        .next()
        .and_then(|output| output.translations.into_iter().next())
        .map(|translation| translation.text)
}

/// Builds the SSML document for one synthesis call
pub fn build_ssml(text: &str, language: &str, voice: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{}'><voice xml:lang='{}' name='{}'>{}</voice></speak>",
        escape_xml(language),
        escape_xml(language),
        escape_xml(voice),
        escape_xml(text)
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

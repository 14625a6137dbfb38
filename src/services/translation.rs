use super::{
    SUBSCRIPTION_KEY_HEADER, SUBSCRIPTION_REGION_HEADER, Translator, api_url, build_client,
    check_status,
};
use crate::error::ServiceError;
use crate::io_struct::{TranslateInput, TranslateOutput, first_translation};
use crate::language::translator_language;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_TRANSLATOR_ENDPOINT: &str = "https://api.cognitive.microsofttranslator.com";
const API_VERSION: &str = "3.0";

#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: Client,
    endpoint: String,
    key: String,
    region: String,
}

impl HttpTranslator {
    pub fn new(
        endpoint: String,
        key: String,
        region: String,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
            key,
            region,
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ServiceError> {
        let batch = [TranslateInput {
            text: text.to_string(),
        }];
        let to = translator_language(target_language);
        let resp = self
            .client
            .post(api_url(&self.endpoint, "/translate"))
            .query(&[("api-version", API_VERSION), ("to", to.as_str())])
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(SUBSCRIPTION_REGION_HEADER, &self.region)
            .json(&batch)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;
        let outputs: Vec<TranslateOutput> = serde_json::from_slice(&body)
            .map_err(|e| ServiceError::Malformed(format!("translation response: {}", e)))?;

        first_translation(outputs)
            .ok_or_else(|| ServiceError::Malformed("response contained no translations".to_string()))
    }
}

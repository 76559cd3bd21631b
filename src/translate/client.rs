//! DeepSeek chat-completion client.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::config::DeepSeekConfig;
use crate::schema::TableSchema;

use super::parser::parse_completion;
use super::prompt::{build_system_prompt, build_user_prompt};
use super::{TranslateError, Translation};

/// Environment variable consulted when the config carries no API key.
pub const DEEPSEEK_API_KEY_VAR: &str = "DEEPSEEK_API_KEY";

/// Sampling temperature for the completion request.
///
/// Kept low to favour reproducible SQL for identical inputs; completions
/// are still not guaranteed to be literally deterministic.
const TEMPERATURE: f64 = 0.1;

/// Completion length cap.
const MAX_TOKENS: u32 = 1000;

/// Natural-language-to-SQL translator backed by the DeepSeek API.
pub struct Translator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl Translator {
    /// Creates a translator from the DeepSeek configuration section.
    ///
    /// The API key is taken from the config, falling back to the
    /// `DEEPSEEK_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::MissingApiKey`] if neither source provides
    /// a key, or [`TranslateError::Network`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &DeepSeekConfig) -> Result<Self, TranslateError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| {
                std::env::var(DEEPSEEK_API_KEY_VAR)
                    .ok()
                    .filter(|key| !key.is_empty())
            })
            .ok_or(TranslateError::MissingApiKey)?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| TranslateError::Network {
                detail: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            api_url: config.api_url.clone(),
        })
    }

    /// Translates a natural-language query into SQL, grounding the request
    /// in the supplied schema when one is available.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::Api`] on a non-success HTTP status,
    /// [`TranslateError::Network`] on a connection failure, and
    /// [`TranslateError::Shape`] when the body carries no completion. An
    /// unparseable completion is not an error: it comes back as an empty
    /// SQL field with the raw completion as the explanation.
    pub async fn translate(
        &self,
        natural_language: &str,
        schema: Option<&[TableSchema]>,
    ) -> Result<Translation, TranslateError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": build_system_prompt(schema)},
                {"role": "user", "content": build_user_prompt(natural_language)},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        debug!(model = %self.model, grounded = schema.is_some(), "completion request");

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::Network {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(TranslateError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: serde_json::Value =
            response.json().await.map_err(|e| TranslateError::Shape {
                detail: e.to_string(),
            })?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| TranslateError::Shape {
                detail: "missing choices[0].message.content".to_string(),
            })?;

        Ok(parse_completion(content))
    }
}

//! Natural-language questions about a single table

use crate::config::AssistantConfig;
use crate::preview::render_markdown;
use crate::table::Record;

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API key not set: environment variable {0} is empty or missing")]
    MissingApiKey(String),
    #[error("model returned no answer")]
    EmptyResponse,
    #[error("assistant support is not compiled in")]
    Disabled,
}

/// Anything that turns a prompt into a completion
pub trait Answerer {
    fn complete(&self, prompt: &str) -> Result<String, AssistantError>;
}

/// Fill the analyst prompt with a markdown preview of the table
pub fn build_prompt(records: &[Record], question: &str, preview_rows: usize) -> String {
    let table = render_markdown(records, preview_rows);
    format!(
        "You are a helpful data analyst assistant. Analyze the following table and answer the question.\n\
         \n\
         Table (first {preview_rows} rows):\n\
         {table}\n\
         \n\
         Question: {question}\n\
         \n\
         Please provide a clear and concise answer based on the table data. \
         If the question cannot be answered with the given data, say so.\n\
         \n\
         Answer:"
    )
}

/// Ask a question about one table. Errors are folded into the returned text.
pub fn analyze_table(
    answerer: &dyn Answerer,
    records: &[Record],
    question: &str,
    preview_rows: usize,
) -> String {
    let prompt = build_prompt(records, question, preview_rows);
    match answerer.complete(&prompt) {
        Ok(answer) => answer.trim().to_string(),
        Err(e) => {
            log::warn!("Answer generation failed: {}", e);
            format!("Error generating response: {}", e)
        }
    }
}

/// The configured answerer, or `Disabled` when built without the `assistant` feature
pub fn answerer_from_config(config: &AssistantConfig) -> Result<Box<dyn Answerer>, AssistantError> {
    #[cfg(feature = "assistant")]
    {
        Ok(Box::new(client::ChatCompletionsClient::from_config(config)?))
    }
    #[cfg(not(feature = "assistant"))]
    {
        let _ = config;
        Err(AssistantError::Disabled)
    }
}

#[cfg(feature = "assistant")]
pub use client::ChatCompletionsClient;

#[cfg(feature = "assistant")]
mod client {
    use super::{Answerer, AssistantError};
    use crate::config::AssistantConfig;
    use reqwest::blocking::Client;
    use serde::Deserialize;
    use std::time::Duration;

    /// OpenAI-compatible `/chat/completions` client
    #[derive(Debug, Clone)]
    pub struct ChatCompletionsClient {
        client: Client,
        endpoint: String,
        model: String,
        temperature: f64,
        api_key: String,
    }

    #[derive(Deserialize)]
    struct ChatResponse {
        #[serde(default)]
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: Message,
    }

    #[derive(Deserialize)]
    struct Message {
        content: Option<String>,
    }

    impl ChatCompletionsClient {
        /// Build a client reading the API key from `config.api_key_env`
        pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
            let api_key = std::env::var(&config.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| AssistantError::MissingApiKey(config.api_key_env.clone()))?;
            Self::new(config, api_key)
        }

        pub fn new(config: &AssistantConfig, api_key: String) -> Result<Self, AssistantError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| AssistantError::Http(e.to_string()))?;
            Ok(Self {
                client,
                endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
                model: config.model.clone(),
                temperature: config.temperature,
                api_key,
            })
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    impl Answerer for ChatCompletionsClient {
        fn complete(&self, prompt: &str) -> Result<String, AssistantError> {
            let body = serde_json::json!({
                "model": self.model,
                "temperature": self.temperature,
                "messages": [{ "role": "user", "content": prompt }],
            });
            log::debug!("POST {} (model {})", self.endpoint, self.model);

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .map_err(|e| AssistantError::Http(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(AssistantError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let parsed: ChatResponse = response
                .json()
                .map_err(|e| AssistantError::Http(e.to_string()))?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or(AssistantError::EmptyResponse)
        }
    }

}

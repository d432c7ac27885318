//! AI refine service — clarifies card text without changing its meaning.
//!
//! DESIGN
//! ======
//! A small trait seam so the WS handlers never touch HTTP directly and tests
//! can install a scripted refiner. The production implementation posts to an
//! OpenAI-compatible `/chat/completions` endpoint. Configuration is optional:
//! when the env vars are absent the server runs with refine disabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_REFINE_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_REFINE_MODEL: &str = "openai/gpt-oss-20b";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const REFINE_TEMPERATURE: f64 = 0.3;

#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    #[error("REFINE_API_KEY not set")]
    MissingApiKey,
    #[error("failed to build HTTP client: {0}")]
    HttpClientBuild(String),
    #[error("refine request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("refine service returned status {0}")]
    Status(u16),
    #[error("refine response missing content")]
    EmptyResponse,
}

/// Text-refinement seam. Implementations must be cheap to share.
#[async_trait]
pub trait Refine: Send + Sync {
    /// Return a clarified rewrite of `text` in the same detected language.
    async fn refine(&self, text: &str) -> Result<String, RefineError>;

    /// Model label for startup logging.
    fn model(&self) -> &str;
}

/// Prompt ported from the production refine endpoint: restructure and
/// clarify without changing meaning, answer in the input's language.
fn build_prompt(text: &str) -> String {
    [
        "Detect the language of the input text. Respond ONLY in that same language.",
        "Restructure and clarify the idea without changing its original meaning.",
        "Make it clearer and easier to read. You can use:",
        "- Short paragraphs",
        "- Bullet points (use • character)",
        "- Key phrases highlighted",
        "Choose the best format for the content. Be concise. Output only the refined text. \
         The final output should be to the point and concise. response in markdown format.",
        "",
        &format!("Input: \"{text}\""),
        "",
        "Refined:",
    ]
    .join("\n")
}

// =============================================================================
// HTTP IMPLEMENTATION
// =============================================================================

pub struct HttpRefiner {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl HttpRefiner {
    /// Build a refiner from environment variables.
    ///
    /// Required: `REFINE_API_KEY`.
    /// Optional: `REFINE_BASE_URL` (Groq's OpenAI-compatible endpoint by
    /// default), `REFINE_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` when unset, `HttpClientBuild` if reqwest
    /// cannot construct a client.
    pub fn from_env() -> Result<Self, RefineError> {
        let api_key = std::env::var("REFINE_API_KEY").map_err(|_| RefineError::MissingApiKey)?;
        let base_url = std::env::var("REFINE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_REFINE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let model = std::env::var("REFINE_MODEL").unwrap_or_else(|_| DEFAULT_REFINE_MODEL.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| RefineError::HttpClientBuild(e.to_string()))?;

        Ok(Self { http, api_key, base_url, model })
    }
}

#[async_trait]
impl Refine for HttpRefiner {
    async fn refine(&self, text: &str) -> Result<String, RefineError> {
        let body = json!({
            "model": self.model,
            "temperature": REFINE_TEMPERATURE,
            "messages": [{ "role": "user", "content": build_prompt(text) }],
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefineError::Status(status.as_u16()));
        }

        let parsed: ChatCompletionsResponse = response.json().await?;
        let refined = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(RefineError::EmptyResponse)?;

        Ok(refined)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Refiner that returns a fixed rewrite, recording nothing.
    pub struct FixedRefiner(pub &'static str);

    #[async_trait]
    impl Refine for FixedRefiner {
        async fn refine(&self, _text: &str) -> Result<String, RefineError> {
            Ok(self.0.to_string())
        }

        fn model(&self) -> &str {
            "fixed-test-model"
        }
    }

    /// Refiner that always fails with a service error.
    pub struct FailingRefiner;

    #[async_trait]
    impl Refine for FailingRefiner {
        async fn refine(&self, _text: &str) -> Result<String, RefineError> {
            Err(RefineError::Status(503))
        }

        fn model(&self) -> &str {
            "failing-test-model"
        }
    }
}

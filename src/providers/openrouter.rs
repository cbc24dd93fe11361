//! OpenRouter provider implementation for Formcraft
//!
//! This module implements the Provider trait against OpenRouter's
//! OpenAI-compatible `/chat/completions` endpoint. Any other service that
//! speaks the same wire format can be used by overriding `api_base`.

use crate::config::ProviderConfig;
use crate::error::{FormcraftError, Result};
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenRouter API provider
///
/// # Examples
///
/// ```no_run
/// use formcraft::config::ProviderConfig;
/// use formcraft::providers::{Message, OpenRouterProvider, Provider};
///
/// # async fn example() -> formcraft::error::Result<()> {
/// let config = ProviderConfig {
///     api_key: Some("sk-or-...".to_string()),
///     ..Default::default()
/// };
/// let provider = OpenRouterProvider::new(config)?;
/// let completion = provider.complete(&[Message::user("Hello!")]).await?;
/// println!("{:?}", completion.content);
/// # Ok(())
/// # }
/// ```
pub struct OpenRouterProvider {
    client: Client,
    config: ProviderConfig,
}

/// Request structure for the chat completions API
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

/// Response structure from the chat completions API
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

/// Choice in a chat completions response
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Assistant message in a chat completions response
#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Token usage reported by the API
#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider instance
    ///
    /// A missing API key is accepted here and reported by `complete`, so a
    /// server can still start and serve history without a credential.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("formcraft/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FormcraftError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenRouter provider: api_base={}, model={}, credential={}",
            config.api_base,
            config.model,
            if config.api_key.is_some() { "set" } else { "missing" }
        );

        Ok(Self { client, config })
    }

    /// Whether an API key is configured
    pub fn has_credentials(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Build an API endpoint URL from the configured base
    fn api_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                tracing::error!("OpenRouter API key is not configured");
                return Err(FormcraftError::MissingCredentials("openrouter".to_string()).into());
            }
        };

        let url = self.api_endpoint("chat/completions");
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        tracing::debug!(
            "Sending completion request: url={}, model={}, messages={}",
            url,
            request.model,
            messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("OpenRouter request failed: {}", e);
                FormcraftError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("OpenRouter returned error {}: {}", status, error_text);
            return Err(FormcraftError::Upstream {
                status: status.as_u16(),
                message: if error_text.is_empty() {
                    status.canonical_reason().unwrap_or("unknown").to_string()
                } else {
                    error_text
                },
            }
            .into());
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse OpenRouter response: {}", e);
            FormcraftError::Http(e)
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);

        tracing::debug!(
            "OpenRouter response: content_len={}",
            content.as_ref().map(|c| c.len()).unwrap_or(0)
        );

        Ok(match chat_response.usage {
            Some(usage) => CompletionResponse::with_usage(
                content,
                TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            ),
            None => CompletionResponse::new(content),
        })
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}

//! Base provider trait and common types for Formcraft
//!
//! This module defines the Provider trait that the upstream completion
//! client implements, along with the multimodal message types and the
//! completion response structure.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for conversation
///
/// Content is either plain text or a list of multimodal parts, matching the
/// OpenAI-compatible chat completions wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: MessageContent,
}

/// Message content: plain text or multimodal parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Ordered multimodal parts
    Parts(Vec<ContentPart>),
}

/// A single part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part
    Text {
        /// The text
        text: String,
    },
    /// Image part, referenced by URL (usually a data URI)
    ImageUrl {
        /// Image reference
        image_url: ImageUrl,
    },
}

/// Image reference inside an `image_url` part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// HTTP(S) URL or `data:` URI
    pub url: String,
}

impl Message {
    /// Creates a new system message
    ///
    /// # Examples
    ///
    /// ```
    /// use formcraft::providers::Message;
    ///
    /// let msg = Message::system("You are a form designer");
    /// assert_eq!(msg.role, "system");
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Creates a new plain-text user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Creates a user message carrying an image followed by text
    ///
    /// # Examples
    ///
    /// ```
    /// use formcraft::providers::{Message, MessageContent};
    ///
    /// let msg = Message::user_with_image("data:image/png;base64,AAAA", "Describe it");
    /// assert!(matches!(msg.content, MessageContent::Parts(ref parts) if parts.len() == 2));
    /// ```
    pub fn user_with_image(image_url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
                ContentPart::Text { text: text.into() },
            ]),
        }
    }

    /// Concatenated text of the message, ignoring image parts
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total number of tokens
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionResponse {
    /// Text content of the first choice, if any
    pub content: Option<String>,
    /// Token usage, when reported
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a response without usage information
    pub fn new(content: Option<String>) -> Self {
        Self {
            content,
            usage: None,
        }
    }

    /// Create a response with usage information
    pub fn with_usage(content: Option<String>, usage: TokenUsage) -> Self {
        Self {
            content,
            usage: Some(usage),
        }
    }
}

/// Upstream completion provider
///
/// Implementations perform exactly one outbound request per `complete`
/// call and never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Request a completion for the given messages
    ///
    /// # Errors
    ///
    /// Returns `FormcraftError::MissingCredentials` when no credential is
    /// configured (before any network activity), `FormcraftError::Upstream`
    /// for non-success statuses, or `FormcraftError::Http` for transport
    /// failures.
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse>;

    /// Model identifier used for requests
    fn model(&self) -> String;
}

//! Provider module for Formcraft
//!
//! This module contains the upstream completion provider abstraction and
//! the OpenRouter implementation.

pub mod base;
pub mod openrouter;

pub use base::{
    CompletionResponse, ContentPart, ImageUrl, Message, MessageContent, Provider, TokenUsage,
};
pub use openrouter::OpenRouterProvider;

#[cfg(test)]
pub use base::MockProvider;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the configured provider instance
///
/// # Errors
///
/// Returns error if provider initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(OpenRouterProvider::new(config.clone())?))
}

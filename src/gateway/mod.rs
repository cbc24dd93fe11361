//! Schema generation gateway
//!
//! Accepts an image plus a description, sends both to the upstream
//! completion API together with the fixed Formily instruction prompt, and
//! turns the free-text answer into a [`SchemaDocument`].
//!
//! Nothing is cached: identical requests are always sent upstream again.

pub mod extract;

use crate::error::{FormcraftError, Result};
use crate::prompts;
use crate::providers::{Message, Provider};
use crate::schema::SchemaDocument;
use base64::Engine;
use bytes::Bytes;
use std::sync::Arc;

/// Whether the calling entry point requires a description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPolicy {
    /// Both image and description must be present
    Required,
    /// The description may be empty
    Optional,
}

/// A single generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Raw image bytes
    pub image: Bytes,
    /// Description of the form, possibly empty
    pub prompt: String,
}

impl GenerationRequest {
    /// Create a request from raw image bytes
    pub fn new(image: impl Into<Bytes>, prompt: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            prompt: prompt.into(),
        }
    }

    /// Create a request from base64 image text
    ///
    /// Accepts plain base64 or a `data:<mime>;base64,` URI.
    ///
    /// # Errors
    ///
    /// Returns `FormcraftError::Validation` if the text is not valid base64
    ///
    /// # Examples
    ///
    /// ```
    /// use formcraft::gateway::GenerationRequest;
    ///
    /// let request = GenerationRequest::from_base64("data:image/png;base64,AQID", "form").unwrap();
    /// assert_eq!(request.image.as_ref(), &[1, 2, 3]);
    /// ```
    pub fn from_base64(
        image: &str,
        prompt: impl Into<String>,
    ) -> std::result::Result<Self, FormcraftError> {
        let encoded = strip_data_uri_prefix(image.trim());
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| FormcraftError::Validation(format!("Image is not valid base64: {}", e)))?;
        Ok(Self::new(bytes, prompt))
    }

    /// Base64 text of the image
    pub fn image_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.image)
    }
}

fn strip_data_uri_prefix(value: &str) -> &str {
    if value.starts_with("data:") {
        if let Some((_, payload)) = value.split_once(";base64,") {
            return payload;
        }
    }
    value
}

/// Sniff the MIME type of an image, defaulting to PNG
///
/// # Examples
///
/// ```
/// use formcraft::gateway::image_mime_type;
///
/// let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
/// assert_eq!(image_mime_type(&jpeg), "image/jpeg");
/// assert_eq!(image_mime_type(b"unknown"), "image/png");
/// ```
pub fn image_mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png")
}

/// Encode an image as a `data:` URI
pub fn image_data_uri(bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        image_mime_type(bytes),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Gateway between callers and the upstream completion API
pub struct SchemaGateway {
    provider: Arc<dyn Provider>,
    system_prompt: String,
}

impl SchemaGateway {
    /// Create a gateway over the given provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            system_prompt: prompts::build_system_prompt(),
        }
    }

    /// Model used for generation
    pub fn model(&self) -> String {
        self.provider.model()
    }

    /// Check request inputs against the entry point's policy
    ///
    /// # Errors
    ///
    /// Returns `FormcraftError::Validation` when the image is empty, or the
    /// description is blank under [`PromptPolicy::Required`]
    pub fn validate(
        request: &GenerationRequest,
        policy: PromptPolicy,
    ) -> std::result::Result<(), FormcraftError> {
        let missing_prompt = policy == PromptPolicy::Required && request.prompt.trim().is_empty();
        match (request.image.is_empty(), missing_prompt) {
            (true, true) => Err(FormcraftError::Validation(
                "Both an image and a prompt are required".to_string(),
            )),
            (true, false) => Err(FormcraftError::Validation("An image is required".to_string())),
            (false, true) => Err(FormcraftError::Validation("A prompt is required".to_string())),
            (false, false) => Ok(()),
        }
    }

    /// Build the system and user messages for a request
    pub fn build_messages(&self, request: &GenerationRequest) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.clone()),
            Message::user_with_image(
                image_data_uri(&request.image),
                prompts::build_user_text(&request.prompt),
            ),
        ]
    }

    /// Generate a schema document
    ///
    /// Performs one upstream call; never retries.
    ///
    /// # Errors
    ///
    /// * `Validation` - missing image or required prompt (no upstream call)
    /// * `MissingCredentials` - no API key configured (no upstream call)
    /// * `Upstream` - non-success HTTP status from the API
    /// * `UpstreamEmpty` - completion without content
    /// * `MalformedSchema` - extracted text is not a JSON object
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        policy: PromptPolicy,
    ) -> Result<SchemaDocument> {
        Self::validate(request, policy)?;

        tracing::info!(
            "Generating schema: image_bytes={}, prompt_chars={}, model={}",
            request.image.len(),
            request.prompt.chars().count(),
            self.provider.model()
        );

        let messages = self.build_messages(request);
        let completion = self.provider.complete(&messages).await?;

        if let Some(usage) = completion.usage {
            tracing::debug!(
                "Completion usage: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        let content = completion
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or(FormcraftError::UpstreamEmpty)?;

        let schema = extract::extract_schema(&content)?;
        tracing::info!(
            "Schema generated with {} top-level fields",
            schema.field_names().len()
        );
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionResponse, MessageContent, MockProvider};
    use serde_json::json;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn gateway_returning(content: Option<&str>) -> SchemaGateway {
        let content = content.map(str::to_string);
        let mut mock = MockProvider::new();
        mock.expect_model().return_const("test-model".to_string());
        mock.expect_complete()
            .times(1)
            .returning(move |_| Ok(CompletionResponse::new(content.clone())));
        SchemaGateway::new(Arc::new(mock))
    }

    fn gateway_never_called() -> SchemaGateway {
        let mut mock = MockProvider::new();
        mock.expect_model().return_const("test-model".to_string());
        mock.expect_complete().times(0);
        SchemaGateway::new(Arc::new(mock))
    }

    fn kind(err: &anyhow::Error) -> Option<&FormcraftError> {
        err.downcast_ref::<FormcraftError>()
    }

    #[test]
    fn test_from_base64_plain_and_data_uri() {
        let plain = GenerationRequest::from_base64("AQID", "p").unwrap();
        let uri = GenerationRequest::from_base64("data:image/jpeg;base64,AQID", "p").unwrap();
        assert_eq!(plain.image, uri.image);
        assert_eq!(plain.image_base64(), "AQID");
    }

    #[test]
    fn test_from_base64_rejects_garbage() {
        let err = GenerationRequest::from_base64("***", "p").unwrap_err();
        assert!(matches!(err, FormcraftError::Validation(_)));
    }

    #[test]
    fn test_image_data_uri_uses_sniffed_type() {
        assert!(image_data_uri(PNG_HEADER).starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_validate_policies() {
        let empty_prompt = GenerationRequest::new(PNG_HEADER.to_vec(), " ");
        assert!(SchemaGateway::validate(&empty_prompt, PromptPolicy::Optional).is_ok());
        assert!(SchemaGateway::validate(&empty_prompt, PromptPolicy::Required).is_err());

        let no_image = GenerationRequest::new(Vec::new(), "name");
        let err = SchemaGateway::validate(&no_image, PromptPolicy::Optional).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: An image is required");
    }

    #[test]
    fn test_build_messages_shape() {
        let gateway = gateway_never_called();
        let request = GenerationRequest::new(PNG_HEADER.to_vec(), "login form");
        let messages = gateway.build_messages(&request);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].text().contains("Formily"));
        match &messages[1].content {
            MessageContent::Parts(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected parts, got {:?}", other),
        }
        assert!(messages[1].text().contains("login form"));
    }

    #[tokio::test]
    async fn test_generate_extracts_fenced_schema() {
        let gateway = gateway_returning(Some(
            "Here:\n```json\n{\"type\":\"object\",\"properties\":{\"name\":{\"type\":\"string\"}}}\n```",
        ));
        let request = GenerationRequest::new(PNG_HEADER.to_vec(), "姓名, 年龄");
        let schema = gateway
            .generate(&request, PromptPolicy::Required)
            .await
            .unwrap();
        assert_eq!(
            schema.into_value(),
            json!({"type":"object","properties":{"name":{"type":"string"}}})
        );
    }

    #[tokio::test]
    async fn test_generate_missing_image_skips_upstream() {
        let gateway = gateway_never_called();
        let request = GenerationRequest::new(Vec::new(), "name");
        let err = gateway
            .generate(&request, PromptPolicy::Required)
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), Some(FormcraftError::Validation(_))));
    }

    #[tokio::test]
    async fn test_generate_empty_content_is_upstream_empty() {
        for content in [None, Some("   ")] {
            let gateway = gateway_returning(content);
            let request = GenerationRequest::new(PNG_HEADER.to_vec(), "x");
            let err = gateway
                .generate(&request, PromptPolicy::Optional)
                .await
                .unwrap_err();
            assert!(matches!(kind(&err), Some(FormcraftError::UpstreamEmpty)));
        }
    }

    #[tokio::test]
    async fn test_generate_prose_only_is_malformed() {
        let gateway = gateway_returning(Some("I cannot help with that."));
        let request = GenerationRequest::new(PNG_HEADER.to_vec(), "x");
        let err = gateway
            .generate(&request, PromptPolicy::Optional)
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), Some(FormcraftError::MalformedSchema(_))));
    }

    #[tokio::test]
    async fn test_generate_propagates_provider_errors() {
        let mut mock = MockProvider::new();
        mock.expect_model().return_const("test-model".to_string());
        mock.expect_complete().times(1).returning(|_| {
            Err(FormcraftError::Upstream {
                status: 502,
                message: "bad gateway".to_string(),
            }
            .into())
        });
        let gateway = SchemaGateway::new(Arc::new(mock));
        let request = GenerationRequest::new(PNG_HEADER.to_vec(), "x");
        let err = gateway
            .generate(&request, PromptPolicy::Optional)
            .await
            .unwrap_err();
        assert!(matches!(
            kind(&err),
            Some(FormcraftError::Upstream { status: 502, .. })
        ));
    }
}

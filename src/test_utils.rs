//! Test utilities for Formcraft
//!
//! Shared fixtures for unit tests: temporary data directories, a minimal
//! PNG header, schema documents and gateways over a mocked provider.

use crate::config::Config;
use crate::gateway::SchemaGateway;
use crate::providers::{CompletionResponse, MockProvider};
use crate::schema::SchemaDocument;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

/// Bytes that `image::guess_format` recognizes as PNG
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 1, 2, 3];

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Default configuration whose data directory is `dir`
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = Some(dir.path().to_path_buf());
    config
}

/// Build a schema document from a JSON object literal
///
/// # Panics
///
/// Panics if `value` is not a JSON object
pub fn schema(value: Value) -> SchemaDocument {
    SchemaDocument::try_from(value).expect("schema fixture must be an object")
}

/// Gateway whose provider answers every call with `reply`
pub fn mock_gateway(reply: Option<&'static str>) -> Arc<SchemaGateway> {
    let mut mock = MockProvider::new();
    mock.expect_model().return_const("test-model".to_string());
    mock.expect_complete()
        .returning(move |_| Ok(CompletionResponse::new(reply.map(str::to_string))));
    Arc::new(SchemaGateway::new(Arc::new(mock)))
}

/// Gateway whose provider must never be called
pub fn silent_gateway() -> Arc<SchemaGateway> {
    let mut mock = MockProvider::new();
    mock.expect_model().return_const("test-model".to_string());
    mock.expect_complete().times(0);
    Arc::new(SchemaGateway::new(Arc::new(mock)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_png_fixture_is_sniffed() {
        assert_eq!(crate::gateway::image_mime_type(PNG_BYTES), "image/png");
    }

    #[test]
    fn test_config_points_at_temp_dir() {
        let dir = temp_dir();
        let config = test_config(&dir);
        assert_eq!(
            config.storage.resolve_data_dir().unwrap(),
            dir.path().to_path_buf()
        );
    }

    #[test]
    fn test_schema_fixture() {
        assert_eq!(schema(json!({"type": "object"})).field_names().len(), 0);
    }
}

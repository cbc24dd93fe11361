use formcraft::config::{Config, ProviderConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Bytes recognized as PNG by format sniffing
#[allow(dead_code)]
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

#[allow(dead_code)]
pub const MULTIPART_BOUNDARY: &str = "formcraft-test-boundary";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Provider settings pointing at a mock upstream
#[allow(dead_code)]
pub fn provider_config(base_uri: &str, api_key: Option<&str>) -> ProviderConfig {
    ProviderConfig {
        api_key: api_key.map(str::to_string),
        api_base: format!("{}/api/v1", base_uri),
        model: "test/vision-model".to_string(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

/// Configuration with its data directory inside a fresh temp dir
#[allow(dead_code)]
pub fn test_config(provider: ProviderConfig) -> (TempDir, Config) {
    let dir = TempDir::new().expect("failed to create tempdir");
    let mut config = Config {
        provider,
        ..Default::default()
    };
    config.storage.data_dir = Some(dir.path().to_path_buf());
    config.server.public_base_url = "http://formcraft.test".to_string();
    (dir, config)
}

/// Upstream completion body whose single choice carries `content`
#[allow(dead_code)]
pub fn completion_body(content: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "id": "gen-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content}
        }],
        "usage": {"prompt_tokens": 1200, "completion_tokens": 80, "total_tokens": 1280}
    })
}

/// A part of a hand-built multipart body
#[allow(dead_code)]
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Encode parts as `multipart/form-data` using [`MULTIPART_BOUNDARY`]
#[allow(dead_code)]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

//! Formcraft - form mock-up to Formily schema generator
//!
//! This library turns an image of a form plus a short description into a
//! Formily JSON schema by asking a multimodal completion API, and keeps a
//! history of past generations.
//!
//! # Architecture
//!
//! - `gateway`: request validation, upstream call and schema extraction
//! - `providers`: upstream completion API abstraction (OpenRouter)
//! - `prompts`: the fixed Formily instruction prompt
//! - `history`: local (client-side, capped) and remote (persistent) history
//! - `orchestrator`: runs a generation and records it into history
//! - `server`: HTTP API built on axum
//! - `config`, `error`, `cli`, `commands`, `metrics`: ambient plumbing
//!
//! # Example
//!
//! ```no_run
//! use formcraft::gateway::{GenerationRequest, PromptPolicy, SchemaGateway};
//! use formcraft::providers::create_provider;
//! use formcraft::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let gateway = SchemaGateway::new(create_provider(&config.provider)?);
//!     let image = std::fs::read("login.png")?;
//!     let schema = gateway
//!         .generate(&GenerationRequest::new(image, "用户名, 密码"), PromptPolicy::Required)
//!         .await?;
//!     println!("{}", schema.to_pretty_string());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod metrics;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod schema;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use error::{FormcraftError, Result};
pub use gateway::{GenerationRequest, PromptPolicy, SchemaGateway};
pub use schema::SchemaDocument;

#[cfg(test)]
pub mod test_utils;

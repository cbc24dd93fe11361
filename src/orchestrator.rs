//! Generation orchestration
//!
//! Wires a [`GenerationRequest`] through the [`SchemaGateway`], times it, and
//! records the outcome: every attempt into the local history when one is
//! attached, and successful attempts into the remote history when the entry
//! point asks for it.

use crate::error::{error_kind, Result};
use crate::gateway::{GenerationRequest, PromptPolicy, SchemaGateway};
use crate::history::{LocalHistoryStore, NewHistoryEntry, RemoteHistoryStore};
use crate::metrics::GenerationMetrics;
use crate::schema::SchemaDocument;
use std::sync::Arc;

/// Where a generation request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// JSON body on `POST /generate-schema`
    Json,
    /// Multipart upload on `POST /generate-schema`
    Upload,
    /// `formcraft generate`
    Cli,
}

impl EntryPoint {
    /// Prompt requirement of this entry point
    pub fn policy(self) -> PromptPolicy {
        match self {
            EntryPoint::Json => PromptPolicy::Required,
            EntryPoint::Upload | EntryPoint::Cli => PromptPolicy::Optional,
        }
    }

    /// Metrics label
    pub fn label(self) -> &'static str {
        match self {
            EntryPoint::Json => "json",
            EntryPoint::Upload => "upload",
            EntryPoint::Cli => "cli",
        }
    }
}

/// Per-call options
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub entry: EntryPoint,
    /// Persist a successful result into the remote history
    pub save_remote: bool,
    /// Filename of the uploaded image, used for the stored blob
    pub filename: Option<String>,
}

impl GenerationOptions {
    pub fn new(entry: EntryPoint) -> Self {
        Self {
            entry,
            save_remote: false,
            filename: None,
        }
    }

    pub fn with_remote_save(mut self, filename: impl Into<String>) -> Self {
        self.save_remote = true;
        self.filename = Some(filename.into());
        self
    }
}

/// Result of a successful generation
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub schema: SchemaDocument,
    /// Wall time of the gateway call in milliseconds
    pub processing_time_ms: u64,
    /// Id of the remote history record, when one was saved
    pub history_id: Option<String>,
    /// Id of the local history item, when local history is attached
    pub local_id: Option<String>,
}

/// Runs generations and records them into history
pub struct GenerationOrchestrator {
    gateway: Arc<SchemaGateway>,
    local: Option<LocalHistoryStore>,
    remote: Option<Arc<RemoteHistoryStore>>,
}

impl GenerationOrchestrator {
    pub fn new(gateway: Arc<SchemaGateway>) -> Self {
        Self {
            gateway,
            local: None,
            remote: None,
        }
    }

    /// Record every attempt into `local`
    pub fn with_local(mut self, local: LocalHistoryStore) -> Self {
        self.local = Some(local);
        self
    }

    /// Allow successful attempts to be saved into `remote`
    pub fn with_remote(mut self, remote: Arc<RemoteHistoryStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn gateway(&self) -> &SchemaGateway {
        &self.gateway
    }

    /// Generate a schema and record the attempt
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged. A failed remote save is logged
    /// and reported as a missing `history_id`, never as an error.
    pub async fn run(
        &self,
        request: GenerationRequest,
        options: GenerationOptions,
    ) -> Result<GenerationOutcome> {
        let metrics = GenerationMetrics::new(options.entry.label());
        let result = self
            .gateway
            .generate(&request, options.entry.policy())
            .await;

        let schema = match result {
            Ok(schema) => schema,
            Err(e) => {
                let kind = error_kind(&e);
                let elapsed = metrics.record_failure(kind);
                tracing::warn!(
                    "Generation failed after {} ms ({}): {}",
                    elapsed.as_millis(),
                    kind,
                    e
                );
                self.record_local(&request, None, false);
                return Err(e);
            }
        };

        let processing_time_ms = metrics.record_success().as_millis() as u64;
        tracing::info!("Generation succeeded in {} ms", processing_time_ms);

        let local_id = self.record_local(&request, Some(schema.clone()), true);
        let history_id = if options.save_remote {
            self.save_remote(&request, &schema, processing_time_ms, options.filename)
                .await
        } else {
            None
        };

        Ok(GenerationOutcome {
            schema,
            processing_time_ms,
            history_id,
            local_id,
        })
    }

    fn record_local(
        &self,
        request: &GenerationRequest,
        schema: Option<SchemaDocument>,
        success: bool,
    ) -> Option<String> {
        let local = self.local.as_ref()?;
        let item = local.add(
            request.prompt.clone(),
            request.image_base64(),
            schema,
            success,
        );
        Some(item.id)
    }

    async fn save_remote(
        &self,
        request: &GenerationRequest,
        schema: &SchemaDocument,
        processing_time_ms: u64,
        filename: Option<String>,
    ) -> Option<String> {
        let Some(remote) = &self.remote else {
            tracing::warn!("Remote history requested but no remote store is configured");
            return None;
        };

        let entry = NewHistoryEntry {
            prompt: request.prompt.clone(),
            image: request.image.clone(),
            filename: filename.unwrap_or_else(|| "image.png".to_string()),
            schema: schema.clone(),
            processing_time_ms: Some(processing_time_ms),
        };

        match remote.create(entry).await {
            Ok(item) => Some(item.id),
            Err(e) => {
                tracing::error!("Failed to save generation to remote history: {}", e);
                None
            }
        }
    }
}

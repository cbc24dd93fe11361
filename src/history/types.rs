use crate::schema::SchemaDocument;
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters in a list preview of a prompt
pub const PROMPT_PREVIEW_CHARS: usize = 100;

/// A generation attempt kept in client-side storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalHistoryItem {
    /// Unique identifier (ULID)
    pub id: String,
    /// When the attempt was made
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Description entered by the user
    pub prompt: String,
    /// Base64 image payload
    pub image: String,
    /// Generated schema, absent when the attempt failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaDocument>,
    /// Whether generation succeeded
    pub success: bool,
}

/// A successful generation persisted server-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteHistoryItem {
    /// Unique identifier (ULID)
    pub id: String,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Description entered by the user
    pub prompt: String,
    /// URL of the uploaded input image
    pub input_image_url: String,
    /// Generated schema
    pub generated_schema: SchemaDocument,
    /// Optional bookkeeping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HistoryMetadata>,
}

impl RemoteHistoryItem {
    /// Success flag, defaulting to true when no metadata was recorded
    pub fn success(&self) -> bool {
        self.metadata.as_ref().map(|m| m.success).unwrap_or(true)
    }

    /// Lightweight projection used in list responses
    pub fn to_list_item(&self) -> HistoryListItem {
        HistoryListItem {
            id: self.id.clone(),
            timestamp: self.timestamp,
            prompt: self.prompt.clone(),
            input_image_url: self.input_image_url.clone(),
            prompt_preview: prompt_preview(&self.prompt),
            success: self.success(),
        }
    }
}

/// Bookkeeping attached to a remote history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMetadata {
    /// Size of the uploaded image in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<u64>,
    /// Generation time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
    /// Whether generation succeeded
    #[serde(default = "default_success")]
    pub success: bool,
    /// Filename of the uploaded image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
}

fn default_success() -> bool {
    true
}

/// List projection of a remote history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryListItem {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub input_image_url: String,
    pub prompt_preview: String,
    pub success: bool,
}

/// One page of remote history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub items: Vec<HistoryListItem>,
    /// Number of records matching the filters
    pub total: usize,
    /// 1-based page number
    pub page: usize,
    /// Page size
    pub limit: usize,
    /// True when `offset + limit < total`
    pub has_more: bool,
}

/// Pagination and filter parameters for listing remote history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// 1-based page number; 0 is treated as 1
    pub page: usize,
    /// Page size; 0 is treated as 1
    pub limit: usize,
    /// Case-insensitive substring the prompt must contain
    pub search: Option<String>,
    /// Required success flag
    pub success: Option<bool>,
}

impl HistoryQuery {
    /// Unfiltered query for a page
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit,
            search: None,
            success: None,
        }
    }

    /// Add a prompt search term; blank terms are ignored
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }

    /// Add a success filter
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Whether any filter requires loading candidate records
    pub fn has_filters(&self) -> bool {
        self.search.is_some() || self.success.is_some()
    }

    /// Effective page number (at least 1)
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Effective page size (at least 1)
    pub fn limit(&self) -> usize {
        self.limit.max(1)
    }

    /// Number of records skipped before this page
    pub fn offset(&self) -> usize {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Whether a record passes the filters
    pub fn matches(&self, item: &RemoteHistoryItem) -> bool {
        if let Some(success) = self.success {
            if item.success() != success {
                return false;
            }
        }
        match &self.search {
            Some(search) => contains_ignore_case(&item.prompt, search),
            None => true,
        }
    }
}

/// Record counts over the whole remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Input for creating a remote history record
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    /// Description entered by the user
    pub prompt: String,
    /// Raw image bytes
    pub image: Bytes,
    /// Original filename of the upload
    pub filename: String,
    /// Generated schema
    pub schema: SchemaDocument,
    /// Generation time in milliseconds
    pub processing_time_ms: Option<u64>,
}

/// Current time at the millisecond precision records are stored with
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Truncate a prompt to [`PROMPT_PREVIEW_CHARS`] characters, adding `...`
///
/// # Examples
///
/// ```
/// use formcraft::history::prompt_preview;
///
/// assert_eq!(prompt_preview("short"), "short");
/// assert_eq!(prompt_preview(&"x".repeat(120)).chars().count(), 103);
/// ```
pub fn prompt_preview(prompt: &str) -> String {
    if prompt.chars().count() <= PROMPT_PREVIEW_CHARS {
        return prompt.to_string();
    }
    let truncated: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
    format!("{}...", truncated)
}

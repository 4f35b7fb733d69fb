//! Document identity and metadata.
//!
//! A document is identified by the sha256 of its filename; its content is
//! fingerprinted separately so re-indexing can tell "same file, new content"
//! from "same content under another name".

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// sha256 hex digest of the document text.
pub fn fingerprint(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn is_url(path_or_url: &str) -> bool {
    path_or_url.starts_with("http://") || path_or_url.starts_with("https://")
}

/// Filename for a local path or the last path component for a URL.
pub fn filename_for(path_or_url: &str) -> String {
    let trimmed = path_or_url.trim_end_matches('/');
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    without_query
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
        .to_string()
}

/// Stable document ID plus filename for a file path or URL.
pub fn document_id_for(path_or_url: &str) -> (String, String) {
    let filename = filename_for(path_or_url);
    let document_id = format!("{:x}", Sha256::digest(filename.as_bytes()));
    (document_id, filename)
}

/// Per-document metadata stored alongside every chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub document_id: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl DocumentMetadata {
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Prepare metadata for a document about to be indexed.
pub fn prepare_document_metadata(
    path_or_url: &str,
    text: &str,
    mime_type: &str,
) -> DocumentMetadata {
    let (document_id, filename) = document_id_for(path_or_url);
    DocumentMetadata {
        document_id,
        filename,
        timestamp: Utc::now(),
        mime_type: mime_type.to_string(),
        source_url: is_url(path_or_url).then(|| path_or_url.to_string()),
        fingerprint: fingerprint(text),
        summary: None,
    }
}

/// Relationship of a document to what the index already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Not in the index at all.
    New,
    /// Same filename, same content fingerprint.
    Unchanged,
    /// Same filename, different content.
    Changed,
    /// Same content already indexed under another filename.
    Duplicate,
}

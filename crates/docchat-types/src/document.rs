//! Uploaded documents and their links to chat sessions.
//!
//! A document belongs to the user who uploaded it. It only takes part in a
//! chat once it is linked to a session; replies in that session draw on the
//! linked documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::timestamp;

/// Processing state the backend reports while indexing an upload.
pub const STATUS_PROCESSING: &str = "processing";

/// A document owned by the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, alias = "uploaded_at", with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Whether the backend is still indexing this document.
    pub fn is_processing(&self) -> bool {
        self.status.as_deref() == Some(STATUS_PROCESSING)
    }
}

/// Link between a session and one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: Uuid,
    pub session_id: Uuid,
    pub document_id: Uuid,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for linking a document to a session.
#[derive(Debug, Clone, Serialize)]
pub struct AttachDocument {
    pub session_id: Uuid,
    pub document_id: Uuid,
}

/// A file the backend accepted and queued for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedFile {
    pub file: String,
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Outcome of an upload: queued files plus the names the backend skipped
/// (unsupported format or a processing error).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReport {
    #[serde(default)]
    pub processed_files: Vec<QueuedFile>,
    #[serde(default)]
    pub skipped_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<String>,
}

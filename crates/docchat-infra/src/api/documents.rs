//! Document upload and session-document links.

use std::path::{Path, PathBuf};

use docchat_types::document::{AttachDocument, Document, SessionDocument, UploadReport};
use docchat_types::envelope::{ApiEnvelope, Wrapped};
use docchat_types::error::ClientError;
use reqwest::multipart::{Form, Part};
use uuid::Uuid;

use super::{ApiClient, read_json, success_data};

/// Documents fetched per listing request.
pub const DOCUMENT_PAGE_LIMIT: u32 = 50;

/// A file read into memory, ready to be sent as a multipart part.
struct UploadFile {
    name: String,
    bytes: Vec<u8>,
}

impl ApiClient {
    /// Upload files for indexing. The backend queues each accepted file and
    /// reports the ones it skipped; a duplicate filename fails the request.
    pub async fn upload_documents(&self, paths: &[PathBuf]) -> Result<UploadReport, ClientError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(read_upload(path).await?);
        }

        let url = self.http.url("/documents/");
        let response = self
            .http
            .send(|c| {
                let form = files.iter().fold(Form::new(), |form, file| {
                    let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
                    form.part("files", part)
                });
                c.post(&url).multipart(form)
            })
            .await?;
        let status = response.status();
        let envelope: ApiEnvelope<UploadReport> = read_json(response).await?;
        let report = success_data(status, envelope, "Upload failed")?;
        tracing::info!(
            queued = report.processed_files.len(),
            skipped = report.skipped_files.len(),
            "documents uploaded"
        );
        Ok(report)
    }

    /// The signed-in user's documents, newest first as the backend orders them.
    pub async fn list_documents(&self) -> Result<Vec<Document>, ClientError> {
        let url = self.http.url("/documents/");
        let response = self
            .http
            .send(|c| c.get(&url).query(&[("skip", 0), ("limit", DOCUMENT_PAGE_LIMIT)]))
            .await?;
        Ok(into_list(read_json(response).await?))
    }

    /// Link one document to a session.
    pub async fn attach_document(
        &self,
        session_id: &Uuid,
        document_id: &Uuid,
    ) -> Result<SessionDocument, ClientError> {
        let url = self.http.url("/sessions/add_documents");
        let body = AttachDocument {
            session_id: *session_id,
            document_id: *document_id,
        };
        let response = self.http.send(|c| c.post(&url).json(&body)).await?;
        let link = read_json::<ApiEnvelope<Wrapped<SessionDocument>>>(response)
            .await?
            .data
            .into_inner();
        tracing::info!(%session_id, %document_id, "document attached");
        Ok(link)
    }

    pub async fn session_documents(&self, session_id: &Uuid) -> Result<Vec<SessionDocument>, ClientError> {
        let url = self.http.url(&format!("/sessions/{session_id}/documents"));
        let response = self.http.send(|c| c.get(&url)).await?;
        Ok(into_list(read_json(response).await?))
    }

    /// Unlink a document from a session. The document itself is kept.
    pub async fn detach_document(&self, session_id: &Uuid, document_id: &Uuid) -> Result<(), ClientError> {
        let url = self
            .http
            .url(&format!("/sessions/{session_id}/documents/{document_id}"));
        self.http.send(|c| c.delete(&url)).await?;
        tracing::info!(%session_id, %document_id, "document detached");
        Ok(())
    }
}

fn into_list<T>(envelope: ApiEnvelope<Wrapped<Option<Vec<T>>>>) -> Vec<T> {
    envelope.data.into_inner().unwrap_or_default()
}

async fn read_upload(path: &Path) -> Result<UploadFile, ClientError> {
    let local_error = |reason: String| ClientError::LocalFile {
        path: path.display().to_string(),
        reason,
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| local_error("not a file".to_string()))?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| local_error(e.to_string()))?;
    Ok(UploadFile { name, bytes })
}

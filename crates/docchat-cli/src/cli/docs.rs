//! Document CLI commands: upload, list, attach, detach.
//!
//! Replies in a session draw on the documents attached to it. Documents are
//! addressed by id or filename, sessions by id or name.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use docchat_types::document::{Document, SessionDocument};

use crate::state::AppState;

use super::session::resolve_session;
use super::ui::{format_timestamp, plural, spinner, truncate};

/// Find a document by id, exact filename, or unique filename prefix
/// (case-insensitive).
pub fn find_document<'a>(documents: &'a [Document], query: &str) -> Result<&'a Document> {
    let query = query.trim();
    if let Ok(id) = Uuid::parse_str(query) {
        return documents
            .iter()
            .find(|d| d.id == id)
            .with_context(|| format!("Document '{query}' not found"));
    }

    let lowered = query.to_lowercase();
    if let Some(exact) = documents.iter().find(|d| d.filename.to_lowercase() == lowered) {
        return Ok(exact);
    }

    let matches: Vec<&Document> = documents
        .iter()
        .filter(|d| d.filename.to_lowercase().starts_with(&lowered))
        .collect();
    match matches.as_slice() {
        [] => anyhow::bail!("Document '{query}' not found"),
        [only] => Ok(only),
        many => anyhow::bail!(
            "'{query}' matches {} documents; use the document id instead",
            many.len()
        ),
    }
}

/// Upload files and report what was queued and what was skipped.
///
/// # Examples
///
/// ```bash
/// docchat docs upload report.pdf notes.md
/// ```
pub async fn upload(state: &AppState, files: &[PathBuf], json: bool, quiet: bool) -> Result<()> {
    let progress = spinner(
        &format!("Uploading {}...", plural(files.len(), "file")),
        json || quiet,
    );
    let result = state.api.upload_documents(files).await;
    progress.finish_and_clear();
    let report = result.context("Upload failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    for queued in &report.processed_files {
        println!(
            "  {} {} {}",
            style("✓").green().bold(),
            style(&queued.file).cyan(),
            style("queued for indexing").dim()
        );
    }
    for skipped in &report.skipped_files {
        println!(
            "  {} {} {}",
            style("!").yellow().bold(),
            skipped,
            style("skipped").dim()
        );
    }
    println!();
    if !report.processed_files.is_empty() {
        println!(
            "  Attach to a session with: {}",
            style("docchat docs attach <session> <file>").yellow()
        );
        println!();
    }
    Ok(())
}

/// One row of a session's document listing.
#[derive(Debug, PartialEq)]
struct AttachedRow<'a> {
    filename: &'a str,
    status: &'a str,
    link: &'a SessionDocument,
}

/// Pair each link with the user's document it points at. Links to documents
/// missing from the user's list keep an empty filename.
fn attached_rows<'a>(links: &'a [SessionDocument], documents: &'a [Document]) -> Vec<AttachedRow<'a>> {
    links
        .iter()
        .map(|link| {
            let doc = documents.iter().find(|d| d.id == link.document_id);
            AttachedRow {
                filename: doc.map(|d| d.filename.as_str()).unwrap_or(""),
                status: doc.and_then(|d| d.status.as_deref()).unwrap_or(""),
                link,
            }
        })
        .collect()
}

/// List the user's documents, or with `session` the ones attached to it.
pub async fn list(state: &AppState, session: Option<&str>, json: bool) -> Result<()> {
    let documents = state.api.list_documents().await?;

    let Some(query) = session else {
        return print_documents(&documents, json);
    };

    let found = resolve_session(state, query).await?;
    let links = state.api.session_documents(&found.id).await?;
    let rows = attached_rows(&links, &documents);

    if json {
        let out: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "document_id": row.link.document_id,
                    "filename": row.filename,
                    "attached_at": row.link.created_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!(
            "  {} No documents attached to '{}'. Attach one with: {}",
            style("i").blue().bold(),
            found.name,
            style(format!("docchat docs attach {} <file>", found.id)).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = document_table(&["File", "Status", "Attached", "ID"]);
    for row in &rows {
        let filename = if row.filename.is_empty() {
            style("(not in your documents)").dim().to_string()
        } else {
            truncate(row.filename, 40)
        };
        table.add_row(vec![
            Cell::new(filename).fg(Color::Cyan),
            Cell::new(row.status).fg(Color::White),
            Cell::new(format_timestamp(row.link.created_at)).fg(Color::White),
            Cell::new(row.link.document_id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("  {}", style(&found.name).cyan().bold());
    println!("{table}");
    println!();
    println!("  {}", style(plural(rows.len(), "document")).bold());
    println!();
    Ok(())
}

fn print_documents(documents: &[Document], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(documents)?);
        return Ok(());
    }

    if documents.is_empty() {
        println!();
        println!(
            "  {} No documents yet. Upload some with: {}",
            style("i").blue().bold(),
            style("docchat docs upload <file>...").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = document_table(&["File", "Status", "Uploaded", "ID"]);
    for doc in documents {
        let status_color = if doc.is_processing() {
            Color::Yellow
        } else {
            Color::White
        };
        table.add_row(vec![
            Cell::new(truncate(&doc.filename, 40)).fg(Color::Cyan),
            Cell::new(doc.status.as_deref().unwrap_or("")).fg(status_color),
            Cell::new(format_timestamp(doc.created_at)).fg(Color::White),
            Cell::new(doc.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {}", style(plural(documents.len(), "document")).bold());
    println!();
    Ok(())
}

fn document_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::White))
            .collect::<Vec<_>>(),
    );
    table
}

/// Attach documents to a session, one request per document.
pub async fn attach(
    state: &AppState,
    session: &str,
    queries: &[String],
    json: bool,
    quiet: bool,
) -> Result<()> {
    let found = resolve_session(state, session).await?;
    let documents = state.api.list_documents().await?;
    let targets = queries
        .iter()
        .map(|q| find_document(&documents, q))
        .collect::<Result<Vec<_>>>()?;

    let mut links = Vec::with_capacity(targets.len());
    for doc in targets {
        let link = state
            .api
            .attach_document(&found.id, &doc.id)
            .await
            .with_context(|| format!("Failed to attach '{}'", doc.filename))?;
        if !json && !quiet {
            println!(
                "  {} Attached {} to '{}'",
                style("✓").green().bold(),
                style(&doc.filename).cyan(),
                found.name
            );
            if doc.is_processing() {
                println!("    {}", style("still indexing; answers may not use it yet").dim());
            }
        }
        links.push(link);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&links)?);
    }
    Ok(())
}

/// Detach one document from a session.
pub async fn detach(
    state: &AppState,
    session: &str,
    query: &str,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let found = resolve_session(state, session).await?;
    let documents = state.api.list_documents().await?;
    // An id that is no longer in the user's list can still be unlinked.
    let (document_id, label) = match find_document(&documents, query) {
        Ok(doc) => (doc.id, doc.filename.clone()),
        Err(e) => match Uuid::parse_str(query.trim()) {
            Ok(id) => (id, id.to_string()),
            Err(_) => return Err(e),
        },
    };

    state.api.detach_document(&found.id, &document_id).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "session_id": found.id, "document_id": document_id, "detached": true })
        );
    } else if !quiet {
        println!(
            "  {} Detached {} from '{}'",
            style("✓").green().bold(),
            style(label).cyan(),
            found.name
        );
    }
    Ok(())
}

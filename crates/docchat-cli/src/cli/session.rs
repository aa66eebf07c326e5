//! Session management CLI commands: list, show, create, rename, delete.
//!
//! Sessions are addressed by id or by name; [`resolve_session`] does the
//! lookup so every command accepts either.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use docchat_core::backend::ChatBackend;
use docchat_types::chat::ChatSession;

use crate::state::AppState;

use super::ui::{format_timestamp, plural, spinner, truncate};

/// Find a session by id, exact name, or unique name prefix (case-insensitive).
pub fn find_session<'a>(sessions: &'a [ChatSession], query: &str) -> Result<&'a ChatSession> {
    let query = query.trim();
    if let Ok(id) = Uuid::parse_str(query) {
        return sessions
            .iter()
            .find(|s| s.id == id)
            .with_context(|| format!("Session '{query}' not found"));
    }

    let lowered = query.to_lowercase();
    if let Some(exact) = sessions.iter().find(|s| s.name.to_lowercase() == lowered) {
        return Ok(exact);
    }

    let matches: Vec<&ChatSession> = sessions
        .iter()
        .filter(|s| s.name.to_lowercase().starts_with(&lowered))
        .collect();
    match matches.as_slice() {
        [] => anyhow::bail!("Session '{query}' not found"),
        [only] => Ok(only),
        many => anyhow::bail!(
            "'{query}' matches {} sessions; use the session id instead",
            many.len()
        ),
    }
}

/// Look a session up on the server. Refreshes the chat store's session list.
pub async fn resolve_session(state: &AppState, query: &str) -> Result<ChatSession> {
    let sessions = state.api.list_sessions().await?;
    state.chat.set_sessions(sessions.clone());
    find_session(&sessions, query).cloned()
}

/// List the signed-in user's sessions.
///
/// # Examples
///
/// ```bash
/// docchat sessions list
/// docchat sessions ls --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    state.chat.load_sessions(state.api.as_ref()).await?;
    let mut sessions = state.chat.sessions();
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions yet. Create one with: {}",
            style("i").blue().bold(),
            style("docchat sessions create \"My documents\"").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(truncate(&session.name, 40)).fg(Color::Cyan),
            Cell::new(format_timestamp(session.updated_at)).fg(Color::White),
            Cell::new(session.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {}", style(plural(sessions.len(), "session")).bold());
    println!();

    Ok(())
}

/// Show one session with its message count.
pub async fn show_session(state: &AppState, query: &str, json: bool) -> Result<()> {
    let found = resolve_session(state, query).await?;
    let session = state.api.get_session(&found.id).await?;
    let first_page = state.api.list_messages(&session.id, 1, 1).await?;

    if json {
        let out = serde_json::json!({
            "session": session,
            "message_count": first_page.meta.total,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {}     {}", style("Name:").bold(), style(&session.name).cyan().bold());
    println!("  {}       {}", style("ID:").bold(), style(session.id).dim());
    println!("  {}  {}", style("Updated:").bold(), format_timestamp(session.updated_at));
    println!("  {} {}", style("Messages:").bold(), first_page.meta.total);
    println!();
    Ok(())
}

/// Create a session.
pub async fn create_session(state: &AppState, name: &str, json: bool, quiet: bool) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Session name cannot be empty");
    }

    let progress = spinner("Creating session...", json || quiet);
    let result = state.api.create_session(name).await;
    progress.finish_and_clear();
    let session = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else if !quiet {
        println!();
        println!(
            "  {} Session '{}' created",
            style("✓").green().bold(),
            style(&session.name).cyan()
        );
        println!("  {}  {}", style("ID:").bold(), style(session.id).dim());
        println!();
        println!(
            "  Start chatting with: {}",
            style(format!("docchat chat {}", session.id)).yellow()
        );
        println!();
    }
    Ok(())
}

/// Rename a session.
pub async fn rename_session(
    state: &AppState,
    query: &str,
    new_name: &str,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        anyhow::bail!("Session name cannot be empty");
    }
    let found = resolve_session(state, query).await?;
    let session = state.api.rename_session(&found.id, new_name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else if !quiet {
        println!(
            "  {} Renamed '{}' to '{}'",
            style("✓").green().bold(),
            style(&found.name).dim(),
            style(&session.name).cyan()
        );
    }
    Ok(())
}

/// Delete a session with confirmation.
///
/// # Examples
///
/// ```bash
/// docchat sessions delete "Quarterly report"
/// docchat sessions rm 9a7d3c1e-2b4f-4e6a-8c0d-1e2f3a4b5c6d --force
/// ```
pub async fn delete_session(
    state: &AppState,
    query: &str,
    force: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let session = resolve_session(state, query).await?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session '{}' and all its messages? This cannot be undone",
                session.name
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.api.delete_session(&session.id).await?;
    let remaining: Vec<ChatSession> = state
        .chat
        .sessions()
        .into_iter()
        .filter(|s| s.id != session.id)
        .collect();
    state.chat.set_sessions(remaining);

    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": true, "id": session.id, "name": session.name })
        );
    } else if !quiet {
        println!(
            "  {} Session '{}' deleted",
            style("✓").green().bold(),
            style(&session.name).cyan()
        );
    }
    Ok(())
}

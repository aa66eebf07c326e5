//! `docchat history`: print one page of a session's messages.

use anyhow::Result;
use console::style;

use docchat_core::backend::ChatBackend;
use docchat_types::chat::{Message, MessageRole};

use crate::state::AppState;

use super::chat::renderer::ChatRenderer;
use super::session::resolve_session;
use super::ui::plural;

/// Print page `page` (1 = newest) of a session in chronological order.
///
/// # Examples
///
/// ```bash
/// docchat history "Quarterly report"
/// docchat history "Quarterly report" --page 2 --json
/// ```
pub async fn show_history(state: &AppState, query: &str, page: u32, json: bool) -> Result<()> {
    let page = page.max(1);
    let session = resolve_session(state, query).await?;
    let messages = state
        .api
        .list_messages(&session.id, page, state.config.effective_page_size())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.data.is_empty() {
        println!();
        println!(
            "  {} No messages on page {page} of '{}'",
            style("i").blue().bold(),
            style(&session.name).cyan()
        );
        println!();
        return Ok(());
    }

    let renderer = ChatRenderer::new(None);
    println!();
    println!(
        "  {} {}",
        style(&session.name).cyan().bold(),
        style(format!("page {page}, {} total", plural(messages.meta.total as usize, "message"))).dim()
    );
    println!();
    for message in &messages.data {
        print!("{}", format_message(&renderer, message));
    }
    if messages.meta.has_next_page {
        println!(
            "  {}",
            style(format!("Older messages: docchat history {} --page {}", session.id, page + 1)).dim()
        );
        println!();
    }
    Ok(())
}

/// A message as printed in history and in the chat transcript.
pub fn format_message(renderer: &ChatRenderer, message: &Message) -> String {
    let time = message.created_at.with_timezone(&chrono::Local).format("%H:%M");
    let label = match message.role {
        MessageRole::User => style("You").green().bold().to_string(),
        MessageRole::Assistant => style("Assistant").cyan().bold().to_string(),
        MessageRole::System => style("System").yellow().bold().to_string(),
    };
    let body = match message.role {
        MessageRole::Assistant => renderer.render_final(&message.content),
        _ => message.content.clone(),
    };

    let mut out = format!("  {label} {}\n", style(time).dim());
    for line in body.trim_end().lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

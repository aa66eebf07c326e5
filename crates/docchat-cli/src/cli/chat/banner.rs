//! Welcome banner printed when a chat opens.

use std::io::Write;

use console::style;

use docchat_types::chat::ChatSession;
use docchat_types::user::User;

use crate::cli::ui::plural;

/// Write the banner: who is chatting, in which session, and how much
/// history is loaded.
pub fn write_welcome_banner(
    out: &mut impl Write,
    user: &User,
    session: &ChatSession,
    loaded: usize,
    has_more: bool,
) -> std::io::Result<()> {
    let id = session.id.to_string();

    writeln!(out)?;
    writeln!(out, "  {}", style(&session.name).cyan().bold())?;
    writeln!(
        out,
        "  {}",
        style(format!("Signed in as {}", user.display_name())).dim()
    )?;
    writeln!(out)?;
    writeln!(out, "  {}  {}", style("Session:").bold(), style(&id[..8]).dim())?;
    let history = if has_more {
        format!("{} loaded, older available with /older", plural(loaded, "message"))
    } else {
        plural(loaded, "message")
    };
    writeln!(out, "  {}  {}", style("History:").bold(), style(history).dim())?;
    writeln!(out)?;
    writeln!(
        out,
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    )?;
    writeln!(out, "  {}", style("---").dim())?;
    writeln!(out)?;
    Ok(())
}

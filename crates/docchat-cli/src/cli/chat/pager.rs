//! Full-screen transcript pager.
//!
//! Opens the loaded transcript on the alternate screen and scrolls it through
//! the [`Transcript`] viewport. Reaching the top loads the next older page
//! with the view anchored on the same lines. While a reply streams the pager
//! keeps redrawing; it stays at the bottom only while the reader is following.
//!
//! Keybindings: j/k or arrows scroll, PgUp/PgDn page, g/Home top,
//! G/End latest, q/Esc close, Ctrl+C close and stop the reply.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use docchat_core::backend::ChatBackend;
use docchat_core::transcript::Transcript;
use docchat_types::chat::{Message, MessageRole};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Rows taken by the border and the status bar.
const CHROME_ROWS: u16 = 3;

/// Transcript rows visible in a terminal `height` rows tall.
pub fn body_rows(height: u16) -> u32 {
    u32::from(height.saturating_sub(CHROME_ROWS).max(1))
}

/// Render `messages` as transcript lines `width` columns wide.
///
/// Each message yields a header, its wrapped body and a blank separator, the
/// same count `renderer::message_lines` reports for it, so the viewport and
/// the drawn lines agree.
pub fn transcript_lines(messages: &[Message], width: u16) -> Vec<Line<'static>> {
    let wrap = usize::from(width.max(20)) - 2;
    let mut lines = Vec::new();
    for message in messages {
        let (label, color) = match message.role {
            MessageRole::User => ("You", Color::Green),
            MessageRole::Assistant => ("Assistant", Color::Cyan),
            MessageRole::System => ("System", Color::Yellow),
        };
        let time = message.created_at.with_timezone(&chrono::Local).format("%H:%M");
        lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(color).bold()),
            Span::raw(" "),
            Span::styled(time.to_string(), Style::default().fg(Color::DarkGray)),
        ]));

        let before = lines.len();
        for line in message.content.lines() {
            let chars: Vec<char> = line.chars().collect();
            if chars.is_empty() {
                lines.push(Line::raw(""));
                continue;
            }
            for chunk in chars.chunks(wrap) {
                lines.push(Line::raw(chunk.iter().collect::<String>()));
            }
        }
        if lines.len() == before {
            lines.push(Line::raw(""));
        }
        lines.push(Line::raw(""));
    }
    lines
}

// ---------------------------------------------------------------------------
// Key handling
// ---------------------------------------------------------------------------

/// What a key press asks of the pager.
#[derive(Debug, PartialEq, Eq)]
pub enum PagerAction {
    ScrollTo(u32),
    Latest,
    Close,
    Interrupt,
}

/// Map a key to an action given the current `top`, the visible `rows` and
/// the highest scroll offset `max`.
pub fn key_action(code: KeyCode, modifiers: KeyModifiers, top: u32, rows: u32, max: u32) -> Option<PagerAction> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Some(PagerAction::Interrupt);
    }
    let action = match code {
        KeyCode::Char('q') | KeyCode::Esc => PagerAction::Close,
        KeyCode::Up | KeyCode::Char('k') => PagerAction::ScrollTo(top.saturating_sub(1)),
        KeyCode::Down | KeyCode::Char('j') => PagerAction::ScrollTo((top + 1).min(max)),
        KeyCode::PageUp | KeyCode::Char('b') => PagerAction::ScrollTo(top.saturating_sub(rows)),
        KeyCode::PageDown | KeyCode::Char(' ') => PagerAction::ScrollTo((top + rows).min(max)),
        KeyCode::Home | KeyCode::Char('g') => PagerAction::ScrollTo(0),
        KeyCode::End | KeyCode::Char('G') => PagerAction::Latest,
        _ => return None,
    };
    Some(action)
}

/// How the pager was left.
#[derive(Debug, PartialEq, Eq)]
pub enum PagerExit {
    Closed,
    /// Ctrl+C: the caller should stop the streaming reply.
    Interrupted,
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

/// Show the transcript until the reader closes the pager.
///
/// The line editor already holds the terminal in raw mode, so only the
/// alternate screen is entered and left here.
pub async fn run_pager<B: ChatBackend>(
    transcript: &mut Transcript,
    backend: &B,
    width: u16,
) -> Result<PagerExit> {
    io::stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let result = pager_loop(&mut terminal, transcript, backend, width).await;
    io::stdout().execute(LeaveAlternateScreen)?;
    result
}

async fn pager_loop<B: ChatBackend>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    transcript: &mut Transcript,
    backend: &B,
    width: u16,
) -> Result<PagerExit> {
    loop {
        let rows = body_rows(terminal.size()?.height);
        transcript.on_resize(rows);
        // Picks up streamed text; stays put unless following.
        transcript.content_changed();

        let messages = transcript.store().messages();
        let lines = transcript_lines(&messages, width);
        let status = status_line(transcript);
        let top = transcript.viewport().scroll_top as usize;
        terminal.draw(|frame| draw(frame, &lines, top, &status))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let viewport = transcript.viewport();
        match key_action(key.code, key.modifiers, viewport.scroll_top, rows, viewport.max_scroll_top()) {
            Some(PagerAction::Close) => return Ok(PagerExit::Closed),
            Some(PagerAction::Interrupt) => return Ok(PagerExit::Interrupted),
            Some(PagerAction::Latest) => transcript.jump_to_latest(),
            Some(PagerAction::ScrollTo(top)) => {
                if transcript.on_scroll(top) {
                    match transcript.load_older(backend).await {
                        Ok(_) => {}
                        Err(e) if e.is_auth_failure() => return Err(e.into()),
                        // The transcript already published a notice.
                        Err(_) => {}
                    }
                }
            }
            None => {}
        }
    }
}

/// Status bar text for the pager's current state.
pub fn status_line(transcript: &Transcript) -> String {
    let state = if transcript.is_loading_older() {
        "loading older messages..."
    } else if !transcript.is_following() && transcript.store().is_streaming() {
        "new reply below, G to follow"
    } else if transcript.viewport().scroll_top == 0 && !transcript.has_more() {
        "beginning of conversation"
    } else if transcript.is_following() {
        "latest"
    } else {
        ""
    };
    format!(" j/k scroll  PgUp/PgDn page  g top  G latest  q close   {state}")
}

fn draw(frame: &mut Frame, lines: &[Line<'static>], top: usize, status: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let rows = usize::from(chunks[0].height.saturating_sub(2));
    let start = top.min(lines.len());
    let end = (start + rows).min(lines.len());
    let visible = Text::from(lines[start..end].to_vec());

    let body = Paragraph::new(visible).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Transcript ")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(body, chunks[0]);

    let bar = Paragraph::new(status.to_string()).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(bar, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::chat::renderer::message_lines;
    use chrono::Utc;
    use docchat_core::event::EventBus;
    use docchat_core::store::ChatStore;
    use docchat_types::chat::MessageId;

    fn message(role: MessageRole, content: &str) -> Message {
        Message {
            id: MessageId::from("m1"),
            session_id: None,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_lines_match_the_measure() {
        let messages = vec![
            message(MessageRole::User, "short question"),
            message(MessageRole::Assistant, &"x".repeat(95)),
            message(MessageRole::Assistant, "a\n\nb"),
            message(MessageRole::Assistant, ""),
        ];
        for width in [20u16, 42, 80] {
            for m in &messages {
                let drawn = transcript_lines(std::slice::from_ref(m), width).len() as u32;
                assert_eq!(drawn, message_lines(m, width), "width {width}: {:?}", m.content);
            }
        }
    }

    #[test]
    fn test_lines_wrap_at_width() {
        let lines = transcript_lines(&[message(MessageRole::Assistant, &"y".repeat(45))], 42);
        assert!(text(&lines[0]).starts_with("Assistant "));
        assert_eq!(text(&lines[1]).len(), 40);
        assert_eq!(text(&lines[2]).len(), 5);
        assert_eq!(text(&lines[3]), "");
    }

    #[test]
    fn test_key_actions() {
        let none = KeyModifiers::NONE;
        assert_eq!(key_action(KeyCode::Char('k'), none, 0, 20, 100), Some(PagerAction::ScrollTo(0)));
        assert_eq!(key_action(KeyCode::Down, none, 99, 20, 100), Some(PagerAction::ScrollTo(100)));
        assert_eq!(key_action(KeyCode::Down, none, 100, 20, 100), Some(PagerAction::ScrollTo(100)));
        assert_eq!(key_action(KeyCode::PageUp, none, 50, 20, 100), Some(PagerAction::ScrollTo(30)));
        assert_eq!(key_action(KeyCode::PageDown, none, 90, 20, 100), Some(PagerAction::ScrollTo(100)));
        assert_eq!(key_action(KeyCode::Char('G'), none, 0, 20, 100), Some(PagerAction::Latest));
        assert_eq!(key_action(KeyCode::Esc, none, 0, 20, 100), Some(PagerAction::Close));
        assert_eq!(
            key_action(KeyCode::Char('c'), KeyModifiers::CONTROL, 0, 20, 100),
            Some(PagerAction::Interrupt)
        );
        assert_eq!(key_action(KeyCode::Char('x'), none, 0, 20, 100), None);
    }

    #[test]
    fn test_body_rows_leave_room_for_chrome() {
        assert_eq!(body_rows(24), 21);
        assert_eq!(body_rows(2), 1);
    }

    #[test]
    fn test_status_hints_at_reply_below_when_not_following() {
        let store = ChatStore::new(EventBus::default());
        let long = "line\n".repeat(400);
        store.set_messages(vec![message(MessageRole::Assistant, &long)]);
        let mut transcript = Transcript::new(store.clone(), 20, 20);
        transcript.jump_to_latest();
        assert!(status_line(&transcript).ends_with("latest"));

        transcript.on_scroll(0);
        store.set_streaming(true);
        assert!(status_line(&transcript).contains("new reply below"));
    }
}

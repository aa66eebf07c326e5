//! Main chat loop orchestration.
//!
//! Opens a session's transcript, prints the newest page, then alternates
//! between reading input and running turns. While a reply streams the loop
//! keeps reading input so Ctrl+C or `/stop` can cancel it, and reveals the
//! reply through a [`Typewriter`]. Older history is browsed in the pager.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use crossterm::style::Color;
use rustyline_async::SharedWriter;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use docchat_core::transcript::Transcript;
use docchat_core::turn::{FAILED_TEXT, STOPPED_TEXT, TurnController, TurnOutcome};
use docchat_core::typewriter::Typewriter;
use docchat_types::chat::{ChatSession, Message};
use docchat_types::error::ClientError;

use crate::cli::history::format_message;
use crate::cli::notice::spawn_notice_printer;
use crate::cli::session::resolve_session;
use crate::cli::ui::spinner;
use crate::state::AppState;

use super::banner::write_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::pager::{PagerExit, run_pager};
use super::renderer::{ChatRenderer, message_lines};

/// Whether the loop keeps going after a command or turn.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Run the interactive chat loop in the session matching `query`.
pub async fn run_chat_loop(state: &AppState, query: &str) -> Result<()> {
    let user = state.restore_session().await?;
    let found = resolve_session(state, query).await?;

    let (rows, cols) = terminal_size();
    let mut transcript = Transcript::new(
        state.chat.clone(),
        state.config.effective_page_size(),
        u32::from(rows),
    )
    .with_measure(move |m| message_lines(m, cols));

    let progress = spinner("Loading messages...", false);
    let opened = transcript.open(state.api.as_ref(), found.id).await;
    progress.finish_and_clear();
    opened.context("Failed to open session")?;
    let session = state.chat.current_session().unwrap_or(found);

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut input, out) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    let notices = spawn_notice_printer(&state.bus, out.clone());

    let mut chat = ChatLoop {
        state,
        session_id: session.id,
        transcript,
        turns: TurnController::new(state.chat.clone()),
        renderer: ChatRenderer::new(Some(Color::Cyan)),
        out,
        cols,
    };

    let messages = state.chat.messages();
    write_welcome_banner(
        &mut chat.out,
        &user,
        &session,
        messages.len(),
        chat.transcript.has_more(),
    )?;
    chat.write_messages(&messages)?;
    tracing::info!(session_id = %session.id, loaded = messages.len(), "chat opened");

    let result = chat.run(&mut input).await;

    let _ = writeln!(chat.out, "\n  {}", style("Session ended.").dim());
    let _ = chat.out.flush();
    input.finish();
    notices.abort();
    result
}

struct ChatLoop<'a> {
    state: &'a AppState,
    session_id: Uuid,
    transcript: Transcript,
    turns: TurnController,
    renderer: ChatRenderer,
    out: SharedWriter,
    /// Width the transcript is measured at.
    cols: u16,
}

impl ChatLoop<'_> {
    async fn run(&mut self, input: &mut ChatInput) -> Result<()> {
        loop {
            self.transcript.on_resize(u32::from(terminal_size().0));
            match input.read_line().await {
                InputEvent::Eof => return Ok(()),
                InputEvent::Interrupted => {
                    writeln!(
                        self.out,
                        "  {}",
                        style("Press Ctrl+D to exit, or keep chatting.").dim()
                    )?;
                }
                InputEvent::Message(text) if text.is_empty() => {}
                InputEvent::Message(text) => {
                    let flow = match commands::parse(&text) {
                        Some(cmd) => self.handle_command(cmd, input).await?,
                        None => self.run_turn(input, text).await?,
                    };
                    if flow == Flow::Exit {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: ChatCommand, input: &mut ChatInput) -> Result<Flow> {
        match cmd {
            ChatCommand::Help => commands::write_help(&mut self.out)?,
            ChatCommand::Older => self.show_older().await?,
            ChatCommand::Scroll => {
                self.open_pager().await?;
            }
            ChatCommand::Latest => {
                self.transcript.jump_to_latest();
                let messages = self.state.chat.messages();
                let start = tail_start(messages.len(), self.state.config.effective_page_size());
                writeln!(self.out, "  {}", style("--- latest ---").dim())?;
                self.write_messages(&messages[start..])?;
            }
            ChatCommand::Stop => {
                writeln!(self.out, "  {}", style("Nothing to stop.").dim())?;
            }
            ChatCommand::Sessions => {
                if let Err(e) = self.state.chat.load_sessions(self.state.api.as_ref()).await {
                    if e.is_auth_failure() {
                        return Err(e.into());
                    }
                    return Ok(Flow::Continue);
                }
                writeln!(self.out)?;
                for line in session_lines(&self.state.chat.sessions(), self.session_id) {
                    writeln!(self.out, "{line}")?;
                }
                writeln!(self.out)?;
            }
            ChatCommand::Clear => input.clear(),
            ChatCommand::Exit => return Ok(Flow::Exit),
            ChatCommand::Unknown(name) => {
                writeln!(
                    self.out,
                    "  {} Unknown command: {}. Type /help for available commands.",
                    style("?").yellow().bold(),
                    style(name).dim()
                )?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Load the next older page and open the pager at the top of the transcript.
    async fn show_older(&mut self) -> Result<()> {
        match self.transcript.scroll_to_top(self.state.api.as_ref()).await {
            Ok(_) => {}
            Err(e) if e.is_auth_failure() => return Err(e.into()),
            // The transcript already published a notice.
            Err(_) => {}
        }
        self.open_pager().await?;
        Ok(())
    }

    async fn open_pager(&mut self) -> Result<PagerExit> {
        let exit = run_pager(&mut self.transcript, self.state.api.as_ref(), self.cols).await?;
        tracing::debug!(following = self.transcript.is_following(), "pager closed");
        Ok(exit)
    }

    /// Send `text` and stream the reply until it completes, fails or is stopped.
    ///
    /// The reply is only revealed inline while the transcript is following;
    /// scrolled away in the pager it keeps streaming into the store and a hint
    /// points at `/latest`.
    async fn run_turn(&mut self, input: &mut ChatInput, text: String) -> Result<Flow> {
        self.transcript.jump_to_latest();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let turns = self.turns.clone();
        let api = self.state.api.clone();
        let session_id = self.session_id;
        // Spawned so the reply keeps streaming while the pager holds the screen.
        let mut turn = tokio::spawn(async move {
            turns
                .send(api.as_ref(), session_id, &text, |chunk| {
                    let _ = tx.send(chunk.to_string());
                })
                .await
        });

        let mut typewriter = Typewriter::from_millis(self.state.config.typing_interval_ms);
        let mut ticker = tokio::time::interval(typewriter.interval().max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let thinking = spinner("thinking...", false);
        let mut view = ReplyView::default();
        let mut outcome = None;
        let mut chunks_done = false;
        let mut flow = Flow::Continue;

        while outcome.is_none() || !chunks_done {
            tokio::select! {
                result = &mut turn, if outcome.is_none() => {
                    outcome = Some(result.unwrap_or_else(|e| {
                        Ok(TurnOutcome::Failed(ClientError::Stream(e.to_string())))
                    }));
                }
                chunk = rx.recv(), if !chunks_done => match chunk {
                    Some(chunk) => {
                        thinking.finish_and_clear();
                        typewriter.push(&chunk);
                        self.transcript.content_changed();
                        if typewriter.is_instant() {
                            typewriter.flush();
                            self.show_reply(&typewriter, &mut view)?;
                        }
                    }
                    None => chunks_done = true,
                },
                _ = ticker.tick(), if !typewriter.is_caught_up() => {
                    typewriter.step();
                    self.show_reply(&typewriter, &mut view)?;
                }
                event = input.read_line(), if outcome.is_none() => match event {
                    InputEvent::Interrupted => {
                        self.turns.stop();
                    }
                    InputEvent::Eof => {
                        self.turns.stop();
                        flow = Flow::Exit;
                    }
                    InputEvent::Message(line) => match commands::parse(&line) {
                        Some(ChatCommand::Stop) => {
                            self.turns.stop();
                        }
                        Some(ChatCommand::Exit) => {
                            self.turns.stop();
                            flow = Flow::Exit;
                        }
                        Some(ChatCommand::Latest) => {
                            self.transcript.jump_to_latest();
                            self.show_reply(&typewriter, &mut view)?;
                        }
                        Some(ChatCommand::Older | ChatCommand::Scroll) => {
                            thinking.finish_and_clear();
                            if self.open_pager().await? == PagerExit::Interrupted {
                                self.turns.stop();
                            }
                            self.show_reply(&typewriter, &mut view)?;
                        }
                        _ if line.is_empty() => {}
                        _ => {
                            writeln!(
                                self.out,
                                "\n  {}",
                                style("A reply is in progress. Use /stop or Ctrl+C to stop it, /scroll to browse.").dim()
                            )?;
                        }
                    },
                },
            }
        }
        thinking.finish_and_clear();

        let outcome = match outcome {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => {
                writeln!(self.out, "  {} {e}", style("!").yellow().bold())?;
                return Ok(flow);
            }
            None => return Ok(flow),
        };

        self.transcript.content_changed();
        if !self.transcript.is_following() {
            typewriter.flush();
            writeln!(
                self.out,
                "\n  {}\n",
                style("Reply finished below. /latest to show it.").dim()
            )?;
            return match outcome {
                TurnOutcome::Failed(e) if e.is_auth_failure() => Err(e.into()),
                _ => Ok(flow),
            };
        }

        self.show_reply(&typewriter, &mut view)?;
        if !view.header_written {
            self.write_reply_header()?;
            view.header_written = true;
        }
        match outcome {
            TurnOutcome::Completed { .. } => {
                if self.finish_reveal(input, &mut typewriter).await? == Flow::Exit {
                    flow = Flow::Exit;
                }
                writeln!(self.out, "\n")?;
            }
            TurnOutcome::Stopped => {
                writeln!(self.out, "\n  {}\n", style(STOPPED_TEXT).dim().italic())?;
            }
            TurnOutcome::Failed(e) => {
                writeln!(self.out, "\n  {}\n", style(FAILED_TEXT).red())?;
                if e.is_auth_failure() {
                    return Err(e.into());
                }
            }
        }
        Ok(flow)
    }

    /// Reveal the rest of a completed reply. Ctrl+C or `/stop` skips ahead and
    /// shows the remainder at once.
    async fn finish_reveal(&mut self, input: &mut ChatInput, typewriter: &mut Typewriter) -> Result<Flow> {
        let mut flow = Flow::Continue;
        let skip = async {
            loop {
                match input.read_line().await {
                    InputEvent::Interrupted => return,
                    InputEvent::Eof => {
                        flow = Flow::Exit;
                        return;
                    }
                    InputEvent::Message(line) => match commands::parse(&line) {
                        Some(ChatCommand::Stop) => return,
                        Some(ChatCommand::Exit) => {
                            flow = Flow::Exit;
                            return;
                        }
                        _ => {}
                    },
                }
            }
        };

        let mut out = self.out.clone();
        let skipped = play_or_skip(typewriter, skip, |s| {
            let _ = write!(out, "{s}");
            let _ = out.flush();
        })
        .await;
        if skipped {
            tracing::debug!("reply reveal skipped");
        }
        Ok(flow)
    }

    /// Write whatever of the reply the reader should see now.
    fn show_reply(&mut self, typewriter: &Typewriter, view: &mut ReplyView) -> std::io::Result<()> {
        match view.update(self.transcript.is_following(), typewriter.revealed()) {
            ReplyUpdate::Write { header, text } => {
                if header {
                    self.write_reply_header()?;
                }
                write!(self.out, "{text}")?;
                self.out.flush()
            }
            ReplyUpdate::Hint => {
                writeln!(
                    self.out,
                    "\n  {}",
                    style("New reply below. /latest to follow it.").dim()
                )
            }
            ReplyUpdate::Idle => Ok(()),
        }
    }

    fn write_reply_header(&mut self) -> std::io::Result<()> {
        write!(self.out, "\n  {} ", style("Assistant").cyan().bold())?;
        self.out.flush()
    }

    fn write_messages(&mut self, messages: &[Message]) -> std::io::Result<()> {
        for message in messages {
            write!(self.out, "{}", format_message(&self.renderer, message))?;
        }
        self.out.flush()
    }
}

/// What of the streaming reply has been written inline.
#[derive(Debug, Default)]
struct ReplyView {
    header_written: bool,
    /// Bytes of the revealed text already written.
    printed: usize,
    hint_shown: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum ReplyUpdate<'a> {
    Write { header: bool, text: &'a str },
    Hint,
    Idle,
}

impl ReplyView {
    /// Decide what to write for `revealed`. Text is held back while the
    /// reader is not following; one hint is shown instead, and writing
    /// resumes under a fresh header once they follow again.
    fn update<'a>(&mut self, following: bool, revealed: &'a str) -> ReplyUpdate<'a> {
        let printed = self.printed.min(revealed.len());
        if !following {
            if self.hint_shown || printed == revealed.len() {
                return ReplyUpdate::Idle;
            }
            self.hint_shown = true;
            self.header_written = false;
            return ReplyUpdate::Hint;
        }
        self.hint_shown = false;
        let text = &revealed[printed..];
        if text.is_empty() {
            return ReplyUpdate::Idle;
        }
        let header = !self.header_written;
        self.header_written = true;
        self.printed = revealed.len();
        ReplyUpdate::Write { header, text }
    }
}

/// Play the rest of `typewriter` through `emit` until it catches up or
/// `skip` resolves. A skip shows whatever is left at once. Returns whether
/// the reveal was skipped.
async fn play_or_skip(
    typewriter: &mut Typewriter,
    skip: impl Future<Output = ()>,
    mut emit: impl FnMut(&str),
) -> bool {
    let cancel = CancellationToken::new();
    let finished = {
        let play = typewriter.play(&cancel, &mut emit);
        tokio::pin!(play);
        tokio::pin!(skip);
        tokio::select! {
            done = &mut play => done,
            _ = &mut skip => {
                cancel.cancel();
                play.await
            }
        }
    };
    if !finished {
        let rest = typewriter.flush();
        if !rest.is_empty() {
            emit(rest);
        }
    }
    !finished
}

/// Terminal `(rows, cols)`, with a conventional fallback off a TTY.
fn terminal_size() -> (u16, u16) {
    console::Term::stdout().size_checked().unwrap_or((24, 80))
}

/// Index where the last `page_size` of `len` messages begin.
fn tail_start(len: usize, page_size: u32) -> usize {
    len.saturating_sub(page_size as usize)
}

/// One line per session, the current one marked with `*`.
fn session_lines(sessions: &[ChatSession], current: Uuid) -> Vec<String> {
    if sessions.is_empty() {
        return vec![format!("  {}", style("No sessions.").dim())];
    }
    sessions
        .iter()
        .map(|s| {
            if s.id == current {
                format!("  {} {}", style("*").green().bold(), style(&s.name).cyan().bold())
            } else {
                format!("    {} {}", s.name, style(&s.id.to_string()[..8]).dim())
            }
        })
        .collect()
}

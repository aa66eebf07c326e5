//! Async readline input for the chat loop.
//!
//! Wraps `rustyline_async::Readline`. The terminal stays in raw mode for the
//! whole chat, so Ctrl+C arrives here as [`InputEvent::Interrupted`] rather
//! than as a signal; the loop keeps reading while a reply streams so it can
//! stop it.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

/// Events produced by the input handler.
#[derive(Debug, PartialEq)]
pub enum InputEvent {
    /// User submitted a line (trimmed).
    Message(String),
    /// End of file (Ctrl+D).
    Eof,
    /// Interrupt (Ctrl+C).
    Interrupted,
}

impl From<ReadlineEvent> for InputEvent {
    fn from(event: ReadlineEvent) -> Self {
        match event {
            ReadlineEvent::Line(line) => InputEvent::Message(line.trim().to_string()),
            ReadlineEvent::Eof => InputEvent::Eof,
            ReadlineEvent::Interrupted => InputEvent::Interrupted,
        }
    }
}

pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// Returns the input handler and a `SharedWriter` for printing without
    /// disturbing the prompt.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt)?;
        Ok((Self { rl }, stdout))
    }

    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(event) => {
                if let ReadlineEvent::Line(line) = &event {
                    if !line.trim().is_empty() {
                        let _ = self.rl.add_history_entry(line.clone());
                    }
                }
                event.into()
            }
            Err(e) => {
                tracing::debug!(error = %e, "readline failed, treating as end of input");
                InputEvent::Eof
            }
        }
    }

    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }

    /// Restore the terminal and print anything still buffered.
    pub fn finish(mut self) {
        let _ = self.rl.flush();
    }
}

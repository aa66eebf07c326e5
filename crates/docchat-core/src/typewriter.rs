//! Character-by-character reveal of streamed text.
//!
//! Chunks arrive in bursts; the typewriter spreads them out one character
//! per interval. The target can grow while the reveal is running. An
//! interval of zero turns the effect off and text is shown as it arrives.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default delay between revealed characters.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone)]
pub struct Typewriter {
    target: String,
    /// Byte offset of the reveal; always on a char boundary.
    shown: usize,
    interval: Duration,
}

impl Typewriter {
    pub fn new(interval: Duration) -> Self {
        Self {
            target: String::new(),
            shown: 0,
            interval,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// No per-character delay.
    pub fn is_instant(&self) -> bool {
        self.interval.is_zero()
    }

    /// Extend the target with newly arrived text.
    pub fn push(&mut self, text: &str) {
        self.target.push_str(text);
    }

    /// Replace the target. Whatever the old and new targets share as a
    /// prefix stays revealed.
    pub fn set_target(&mut self, text: impl Into<String>) {
        let text = text.into();
        let common = self.target[..self.shown]
            .char_indices()
            .zip(text.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, c), _)| i + c.len_utf8())
            .unwrap_or(0);
        self.target = text;
        self.shown = common;
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn revealed(&self) -> &str {
        &self.target[..self.shown]
    }

    pub fn pending(&self) -> &str {
        &self.target[self.shown..]
    }

    pub fn is_caught_up(&self) -> bool {
        self.shown == self.target.len()
    }

    /// Reveal one more character and return it.
    pub fn step(&mut self) -> Option<&str> {
        let c = self.pending().chars().next()?;
        let start = self.shown;
        self.shown += c.len_utf8();
        Some(&self.target[start..self.shown])
    }

    /// Reveal everything pending and return it.
    pub fn flush(&mut self) -> &str {
        let start = self.shown;
        self.shown = self.target.len();
        &self.target[start..]
    }

    /// Reveal pending text through `emit`, pausing between characters.
    ///
    /// Returns `false` if `cancel` fired before the reveal caught up; the
    /// remainder stays pending.
    pub async fn play(&mut self, cancel: &CancellationToken, mut emit: impl FnMut(&str)) -> bool {
        if self.is_instant() {
            let rest = self.flush();
            if !rest.is_empty() {
                emit(rest);
            }
            return true;
        }
        while let Some(c) = self.step() {
            emit(c);
            if self.is_caught_up() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        true
    }
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

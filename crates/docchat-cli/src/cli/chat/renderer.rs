//! Terminal markdown rendering for assistant replies.
//!
//! `ChatRenderer` renders prose through `termimad` and fenced code blocks
//! through `syntect`. Replies stream in raw; stored replies (history, older
//! pages) are shown fully rendered.

use crossterm::style::Color;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::as_24_bit_terminal_escaped;
use termimad::MadSkin;

use docchat_types::chat::Message;

const CODE_THEME: &str = "base16-ocean.dark";

pub struct ChatRenderer {
    skin: MadSkin,
    syntax_set: SyntaxSet,
    theme: Option<Theme>,
}

impl ChatRenderer {
    /// Create a renderer, optionally tinting headers and bold text.
    pub fn new(accent_color: Option<Color>) -> Self {
        let mut skin = MadSkin::default_dark();
        if let Some(color) = accent_color {
            let tc = to_termimad_color(color);
            skin.bold.set_fg(tc);
            skin.headers[0].set_fg(tc);
            skin.headers[1].set_fg(tc);
        }
        skin.inline_code.set_fg(termimad::crossterm::style::Color::Yellow);

        let theme = ThemeSet::load_defaults().themes.remove(CODE_THEME);
        Self {
            skin,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    /// Render a complete markdown reply. Code fences are highlighted by
    /// language tag; an unclosed fence runs to the end of the text.
    pub fn render_final(&self, markdown: &str) -> String {
        let mut output = String::new();
        let mut fence: Option<String> = None;
        let mut code_buf = String::new();

        for line in markdown.lines() {
            let is_fence = line.trim_start().starts_with("```");
            match (&fence, is_fence) {
                (None, true) => {
                    fence = Some(line.trim().trim_start_matches('`').trim().to_string());
                    code_buf.clear();
                }
                (Some(lang), true) => {
                    output.push_str(&self.highlight_code(&code_buf, lang));
                    fence = None;
                }
                (Some(_), false) => {
                    code_buf.push_str(line);
                    code_buf.push('\n');
                }
                (None, false) => {
                    output.push_str(&self.skin.term_text(line).to_string());
                }
            }
        }

        if let Some(lang) = fence {
            if !code_buf.is_empty() {
                output.push_str(&self.highlight_code(&code_buf, &lang));
            }
        }
        output
    }

    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let mut output = format!("{}\n", console::style(format!("--- {lang} ---")).dim());
        let Some(theme) = &self.theme else {
            output.push_str(code);
            return output;
        };

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, theme);

        for line in code.lines() {
            let ranges: Vec<(Style, &str)> = highlighter
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_default();
            output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
            output.push_str("\x1b[0m\n");
        }
        output
    }
}

/// Terminal lines `message` takes in the transcript at `width` columns:
/// a header line, the wrapped body, and a blank separator.
pub fn message_lines(message: &Message, width: u16) -> u32 {
    let width = usize::from(width.max(20)) - 2;
    let body: usize = message
        .content
        .lines()
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum();
    (body.max(1) + 2) as u32
}

fn to_termimad_color(color: Color) -> termimad::crossterm::style::Color {
    use termimad::crossterm::style::Color as Tc;
    match color {
        Color::Cyan => Tc::Cyan,
        Color::Green => Tc::Green,
        Color::Yellow => Tc::Yellow,
        Color::Magenta => Tc::Magenta,
        Color::Blue => Tc::Blue,
        Color::Red => Tc::Red,
        Color::Rgb { r, g, b } => Tc::Rgb { r, g, b },
        _ => Tc::Cyan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docchat_types::chat::{MessageId, MessageRole};

    fn message(content: &str) -> Message {
        Message {
            id: MessageId::from("m1"),
            session_id: None,
            role: MessageRole::Assistant,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_code_block_is_highlighted_separately() {
        let renderer = ChatRenderer::new(None);
        let out = renderer.render_final("Here:\n```rust\nfn main() {}\n```\nDone.");
        assert!(out.contains("--- rust ---"));
        assert!(out.contains("main"));
        assert!(out.contains("Done."));
    }

    #[test]
    fn test_unclosed_fence_still_renders_code() {
        let renderer = ChatRenderer::new(Some(Color::Green));
        let out = renderer.render_final("```python\nprint('hi')");
        assert!(out.contains("--- python ---"));
        assert!(out.contains("print"));
    }

    #[test]
    fn test_message_lines_wraps_long_lines() {
        // 42 columns leave 40 for text.
        assert_eq!(message_lines(&message("short"), 42), 3);
        assert_eq!(message_lines(&message(&"x".repeat(81)), 42), 5);
        assert_eq!(message_lines(&message("a\nb\nc"), 42), 5);
    }

    #[test]
    fn test_empty_message_still_takes_a_line() {
        assert_eq!(message_lines(&message(""), 80), 3);
    }
}

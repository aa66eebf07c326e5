//! Interactive terminal chat.
//!
//! Streams replies with a typewriter reveal, browses and pages history in a
//! full-screen pager, and handles slash commands. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod pager;
pub mod renderer;

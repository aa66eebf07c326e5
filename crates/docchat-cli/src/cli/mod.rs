//! CLI command definitions for the `docchat` binary.
//!
//! Uses clap derive macros for argument parsing. Session and document
//! management follow a noun-verb pattern (`docchat sessions list`,
//! `docchat docs upload`), everything else is a single verb
//! (`docchat login`, `docchat chat <session>`).

pub mod auth;
pub mod chat;
pub mod docs;
pub mod history;
pub mod notice;
pub mod session;
pub mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use console::style;

use docchat_types::error::ClientError;

/// Chat with your documents from the terminal.
#[derive(Parser)]
#[command(name = "docchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// API base URL, overriding config.toml.
    #[arg(long, env = "DOCCHAT_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Keep tokens in memory only; nothing is written to disk or the keychain.
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Export tracing spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account. Sign in afterwards with `docchat login`.
    Register {
        /// Account email. Prompted for when omitted.
        #[arg(short, long)]
        email: Option<String>,

        /// First name. Prompted for when omitted.
        #[arg(long)]
        first_name: Option<String>,

        /// Last name.
        #[arg(long)]
        last_name: Option<String>,

        /// Read the password from DOCCHAT_PASSWORD instead of prompting.
        #[arg(long)]
        password_env: bool,
    },

    /// Sign in and store the tokens.
    Login {
        /// Account email. Prompted for when omitted.
        #[arg(short, long)]
        username: Option<String>,

        /// Read the password from DOCCHAT_PASSWORD instead of prompting.
        #[arg(long)]
        password_env: bool,
    },

    /// Sign out and forget the stored tokens.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Manage chat sessions.
    #[command(alias = "session")]
    Sessions {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Upload documents and choose which ones a session chats over.
    #[command(alias = "doc")]
    Docs {
        #[command(subcommand)]
        action: DocsCommand,
    },

    /// Print one page of a session's message history.
    History {
        /// Session id or name.
        session: String,

        /// Page to print; 1 is the newest.
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Chat interactively in a session.
    Chat {
        /// Session id or name.
        session: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum DocsCommand {
    /// Upload files for indexing.
    Upload {
        /// Files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List your documents, or the ones attached to a session.
    #[command(alias = "ls")]
    List {
        /// Session id or name.
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Attach documents to a session.
    Attach {
        /// Session id or name.
        session: String,

        /// Document ids or filenames.
        #[arg(required = true)]
        documents: Vec<String>,
    },

    /// Detach a document from a session. The document itself is kept.
    #[command(alias = "rm")]
    Detach {
        /// Session id or name.
        session: String,

        /// Document id or filename.
        document: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List your sessions, most recently updated first.
    #[command(alias = "ls")]
    List,

    /// Show one session.
    Show {
        /// Session id or name.
        session: String,
    },

    /// Create a new session.
    #[command(alias = "new")]
    Create {
        /// Name of the new session.
        name: String,
    },

    /// Rename a session.
    Rename {
        /// Session id or name.
        session: String,

        /// New name.
        name: String,
    },

    /// Delete a session.
    #[command(alias = "rm")]
    Delete {
        /// Session id or name.
        session: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        force: bool,
    },
}

/// Tracing directives for the requested verbosity.
pub fn filter_directives(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,docchat=debug",
        _ => "trace",
    }
}

/// If `err` means the stored login is no longer usable, print a hint and
/// return `true`.
pub fn report_auth_failure(err: &anyhow::Error) -> bool {
    let Some(client_err) = err.downcast_ref::<ClientError>() else {
        return false;
    };
    let hint = match client_err {
        ClientError::SessionExpired => "Your session has expired.",
        ClientError::NotLoggedIn => "You are not logged in.",
        ClientError::Unauthorized => "The server rejected your credentials.",
        _ => return false,
    };
    eprintln!();
    eprintln!(
        "  {} {hint} Log in again with: {}",
        style("!").red().bold(),
        style("docchat login").yellow()
    );
    eprintln!();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_history_with_page() {
        let cli = Cli::try_parse_from(["docchat", "history", "Quarterly", "--page", "3"]).unwrap();
        match cli.command {
            Commands::History { session, page } => {
                assert_eq!(session, "Quarterly");
                assert_eq!(page, 3);
            }
            _ => panic!("expected history"),
        }
    }

    #[test]
    fn test_parse_sessions_delete_alias() {
        let cli = Cli::try_parse_from(["docchat", "sessions", "rm", "abc", "--force"]).unwrap();
        match cli.command {
            Commands::Sessions {
                action: SessionCommand::Delete { session, force },
            } => {
                assert_eq!(session, "abc");
                assert!(force);
            }
            _ => panic!("expected sessions delete"),
        }
    }

    #[test]
    fn test_parse_docs_attach_many() {
        let cli = Cli::try_parse_from(["docchat", "docs", "attach", "Quarterly", "a.pdf", "b.md"]).unwrap();
        match cli.command {
            Commands::Docs {
                action: DocsCommand::Attach { session, documents },
            } => {
                assert_eq!(session, "Quarterly");
                assert_eq!(documents, vec!["a.pdf", "b.md"]);
            }
            _ => panic!("expected docs attach"),
        }
    }

    #[test]
    fn test_docs_upload_requires_a_file() {
        assert!(Cli::try_parse_from(["docchat", "docs", "upload"]).is_err());
        let cli = Cli::try_parse_from(["docchat", "doc", "ls", "-s", "Handbook"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Docs {
                action: DocsCommand::List { session: Some(_) }
            }
        ));
    }

    #[test]
    fn test_parse_register_flags() {
        let cli = Cli::try_parse_from([
            "docchat",
            "register",
            "-e",
            "grace@example.com",
            "--first-name",
            "Grace",
            "--password-env",
        ])
        .unwrap();
        match cli.command {
            Commands::Register {
                email,
                first_name,
                last_name,
                password_env,
            } => {
                assert_eq!(email.as_deref(), Some("grace@example.com"));
                assert_eq!(first_name.as_deref(), Some("Grace"));
                assert!(last_name.is_none());
                assert!(password_env);
            }
            _ => panic!("expected register"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["docchat", "whoami", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directives(0, true), "error");
        assert_eq!(filter_directives(0, false), "warn");
        assert_eq!(filter_directives(1, false), "info,docchat=debug");
        assert_eq!(filter_directives(3, true), "trace");
    }

    #[test]
    fn test_report_auth_failure_only_for_auth_errors() {
        let expired = anyhow::Error::new(ClientError::SessionExpired);
        assert!(report_auth_failure(&expired));

        let wrapped = anyhow::Error::new(ClientError::NotLoggedIn).context("loading sessions");
        assert!(report_auth_failure(&wrapped));

        let other = anyhow::Error::new(ClientError::Stream("reset".to_string()));
        assert!(!report_auth_failure(&other));
        assert!(!report_auth_failure(&anyhow::anyhow!("plain")));
    }
}

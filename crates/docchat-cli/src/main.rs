//! docchat command-line entry point.
//!
//! Binary name: `docchat`
//!
//! Parses CLI arguments, sets up tracing, wires the stores and API client,
//! then dispatches to the command handler.

mod cli;
mod state;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;
use console::style;

use cli::{Cli, Commands, DocsCommand, SessionCommand};
use state::{AppState, Overrides};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = docchat_observe::init_tracing(cli::filter_directives(cli.verbose, cli.quiet), cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "docchat", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    let result = run(cli).await;
    docchat_observe::shutdown_tracing();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli::report_auth_failure(&e) {
                eprintln!("  {} {e:#}", style("error:").red().bold());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(Overrides {
        base_url: cli.base_url.clone(),
        no_persist: cli.no_persist,
    })
    .await?;

    let notices = (!cli.json && !cli.quiet && !matches!(cli.command, Commands::Chat { .. }))
        .then(|| cli::notice::spawn_notice_printer(&state.bus, std::io::stderr()));

    let result = dispatch(&state, cli).await;

    // Closing the bus lets the printer write what is queued, then stop.
    drop(state);
    if let Some(printer) = notices {
        cli::notice::finish_notice_printer(printer).await;
    }
    result
}

async fn dispatch(state: &AppState, cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Register {
            email,
            first_name,
            last_name,
            password_env,
        } => {
            cli::auth::register(state, email, first_name, last_name, password_env, cli.json, cli.quiet)
                .await?;
        }

        Commands::Login {
            username,
            password_env,
        } => {
            cli::auth::login(state, username, password_env, cli.json, cli.quiet).await?;
        }

        Commands::Logout => {
            cli::auth::logout(state, cli.json, cli.quiet).await?;
        }

        Commands::Whoami => {
            cli::auth::whoami(state, cli.json).await?;
        }

        Commands::Sessions { action } => {
            state.require_user().await?;
            match action {
                SessionCommand::List => {
                    cli::session::list_sessions(state, cli.json).await?;
                }
                SessionCommand::Show { session } => {
                    cli::session::show_session(state, &session, cli.json).await?;
                }
                SessionCommand::Create { name } => {
                    cli::session::create_session(state, &name, cli.json, cli.quiet).await?;
                }
                SessionCommand::Rename { session, name } => {
                    cli::session::rename_session(state, &session, &name, cli.json, cli.quiet).await?;
                }
                SessionCommand::Delete { session, force } => {
                    cli::session::delete_session(state, &session, force, cli.json, cli.quiet).await?;
                }
            }
        }

        Commands::Docs { action } => {
            state.require_user().await?;
            match action {
                DocsCommand::Upload { files } => {
                    cli::docs::upload(state, &files, cli.json, cli.quiet).await?;
                }
                DocsCommand::List { session } => {
                    cli::docs::list(state, session.as_deref(), cli.json).await?;
                }
                DocsCommand::Attach { session, documents } => {
                    cli::docs::attach(state, &session, &documents, cli.json, cli.quiet).await?;
                }
                DocsCommand::Detach { session, document } => {
                    cli::docs::detach(state, &session, &document, cli.json, cli.quiet).await?;
                }
            }
        }

        Commands::History { session, page } => {
            state.require_user().await?;
            cli::history::show_history(state, &session, page, cli.json).await?;
        }

        Commands::Chat { session } => {
            cli::chat::loop_runner::run_chat_loop(state, &session).await?;
        }

        Commands::Completions { .. } => unreachable!("handled in main"),
    }

    Ok(())
}

//! Account commands: register, login, logout, whoami.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Password};

use docchat_types::error::ClientError;
use docchat_types::user::{NewAccount, User};

use crate::state::AppState;

use super::ui::spinner;

/// Environment variable read by `docchat login --password-env`.
pub const PASSWORD_ENV: &str = "DOCCHAT_PASSWORD";

/// Create an account. Prompts for whatever was not passed as a flag; the
/// password is asked for twice.
pub async fn register(
    state: &AppState,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    password_env: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => Input::<String>::new().with_prompt("Email").interact_text()?,
    };
    let first_name = match first_name {
        Some(n) => n,
        None => Input::<String>::new().with_prompt("First name").interact_text()?,
    };
    let password = if password_env {
        std::env::var(PASSWORD_ENV).with_context(|| format!("{PASSWORD_ENV} is not set"))?
    } else {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()?
    };

    let account = NewAccount {
        email: email.trim(),
        password: &password,
        first_name: first_name.trim(),
        last_name: last_name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
    };

    let progress = spinner("Creating account...", json || quiet);
    let result = state.api.register(&account).await;
    progress.finish_and_clear();
    let registered = result.context("Registration failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registered)?);
    } else if !quiet {
        println!();
        println!(
            "  {} Account created for {}",
            style("✓").green().bold(),
            style(&registered.email).cyan().bold()
        );
        println!("  Sign in with: {}", style("docchat login").yellow());
        println!();
    }
    Ok(())
}

/// Sign in with email and password.
///
/// # Examples
///
/// ```bash
/// # Interactive prompts
/// docchat login
///
/// # Script/automation mode
/// DOCCHAT_PASSWORD=... docchat login -u ada@example.com --password-env
/// ```
pub async fn login(
    state: &AppState,
    username: Option<String>,
    password_env: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => Input::<String>::new().with_prompt("Email").interact_text()?,
    };

    let password = if password_env {
        std::env::var(PASSWORD_ENV).with_context(|| format!("{PASSWORD_ENV} is not set"))?
    } else {
        Password::new()
            .with_prompt(format!("Password for {}", style(&username).bold()))
            .interact()?
    };

    let progress = spinner("Signing in...", json || quiet);
    let result = state.api.login(username.trim(), &password).await;
    progress.finish_and_clear();

    let user = match result {
        Ok(user) => user,
        Err(ClientError::UserNotFound) => {
            anyhow::bail!(
                "No account found for '{}'. Create one with: docchat register",
                username.trim()
            )
        }
        Err(ClientError::InvalidCredentials) => anyhow::bail!("Invalid email or password"),
        Err(e) => return Err(e).context("Login failed"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else if !quiet {
        println!();
        println!(
            "  {} Logged in as {}",
            style("✓").green().bold(),
            style(user.display_name()).cyan().bold()
        );
        println!();
    }

    Ok(())
}

/// Sign out. Safe to run when already signed out.
pub async fn logout(state: &AppState, json: bool, quiet: bool) -> Result<()> {
    let was_authenticated = state.auth.is_authenticated();
    if was_authenticated {
        state.api.logout().await;
    }

    if json {
        println!("{}", serde_json::json!({ "logged_out": was_authenticated }));
    } else if !quiet {
        if was_authenticated {
            println!("  {} Logged out", style("✓").green().bold());
        } else {
            println!("  {} Not logged in", style("i").blue().bold());
        }
    }
    Ok(())
}

/// Print the signed-in user.
pub async fn whoami(state: &AppState, json: bool) -> Result<()> {
    let user = state.require_user().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!();
    println!("  {}  {}", style("Name:").bold(), style(full_name(&user)).cyan());
    println!("  {} {}", style("Email:").bold(), user.email);
    println!("  {}    {}", style("ID:").bold(), style(&user.id).dim());
    println!();
    Ok(())
}

/// First and last name joined, or the email when neither is known.
pub fn full_name(user: &User) -> String {
    let parts: Vec<&str> = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        user.email.clone()
    } else {
        parts.join(" ")
    }
}

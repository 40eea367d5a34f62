//! Auth commands - sign up, log in, log out, whoami

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Password};
use wealthtrack_core::{LoggingService, SignUpOutcome};

use super::get_context;
use crate::output;

fn prompt_email(email: Option<String>) -> Result<String> {
    match email {
        Some(email) => Ok(email),
        None => Ok(Input::<String>::new().with_prompt("Email").interact_text()?),
    }
}

pub async fn signup(
    logger: &Option<Arc<LoggingService>>,
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let ctx = get_context(logger).await?;
    let email = prompt_email(email)?;
    let username = match username {
        Some(username) => username,
        None => Input::<String>::new().with_prompt("Username").interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    match ctx.sign_up(&email, &password, &username).await? {
        SignUpOutcome::SignedIn { session } => {
            output::success(&format!("Welcome, {}!", session.user.display_name()));
        }
        SignUpOutcome::ConfirmationPending { email } => {
            output::info(&format!(
                "Check your email ({}) for a confirmation link, then run 'wt login'.",
                email
            ));
        }
    }
    Ok(())
}

pub async fn login(
    logger: &Option<Arc<LoggingService>>,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let ctx = get_context(logger).await?;
    if ctx.is_demo() {
        output::warning("Demo mode is on; you are already signed in as the demo user.");
        return Ok(());
    }

    let email = prompt_email(email)?;
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let session = ctx.sign_in(&email, &password).await?;
    output::success(&format!("Signed in as {}", session.user.display_name()));
    Ok(())
}

pub async fn logout(logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger).await?;
    if ctx.current_user().is_none() {
        println!("Not signed in.");
        return Ok(());
    }

    let result = ctx.sign_out().await;
    output::success("Signed out");
    if let Err(e) = result {
        output::warning(&format!("The backend did not confirm sign-out: {}", e.message()));
    }
    Ok(())
}

pub async fn whoami(logger: &Option<Arc<LoggingService>>, json: bool) -> Result<()> {
    let ctx = get_context(logger).await?;
    let user = ctx.current_user();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "user": user,
                "backend": ctx.backend_name(),
                "demo_mode": ctx.is_demo(),
            }))?
        );
        return Ok(());
    }

    match user {
        Some(user) => {
            println!("{}", "Signed in".bold());
            println!("  Email: {}", user.email);
            if let Some(username) = &user.username {
                println!("  Username: {}", username);
            }
            println!("  Backend: {}", ctx.backend_name());
            if ctx.is_demo() {
                println!("  Mode: {}", "demo".yellow());
            }
        }
        None => println!("Not signed in. Run 'wt login' or 'wt signup'."),
    }
    Ok(())
}

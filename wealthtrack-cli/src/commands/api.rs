//! Auxiliary auth API commands
//!
//! Talks to the standalone REST auth service. Its token is kept apart from
//! the main session, so these commands work without a configured backend.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Input, Password};
use wealthtrack_core::adapters::auth_api::{AuthApiClient, LoginData, SignupData, TokenStore};
use wealthtrack_core::config::Config;

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ApiCommands {
    /// Register with the auth API
    Signup {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log in to the auth API
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch the dashboard payload
    Dashboard,
    /// Forget the stored auth API token
    Logout,
}

fn client() -> Result<AuthApiClient> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let config = Config::load(&data_dir)?;
    Ok(AuthApiClient::new(&config.auth_api_url, TokenStore::new(&data_dir))?)
}

fn text_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

fn password_or_prompt(value: Option<String>) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Password::new().with_prompt("Password").interact()?),
    }
}

pub async fn run(command: ApiCommands) -> Result<()> {
    let client = client()?;

    match command {
        ApiCommands::Signup {
            email,
            username,
            password,
            json,
        } => {
            let data = SignupData {
                email: text_or_prompt(email, "Email")?,
                username: text_or_prompt(username, "Username")?,
                password: password_or_prompt(password)?,
            };
            let auth = client.signup(&data).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&auth.user)?);
            } else {
                output::success(&format!(
                    "Registered {} (user #{})",
                    auth.user.username, auth.user.id
                ));
            }
        }
        ApiCommands::Login {
            email,
            password,
            json,
        } => {
            let data = LoginData {
                email: text_or_prompt(email, "Email")?,
                password: password_or_prompt(password)?,
            };
            let auth = client.login(&data).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&auth.user)?);
            } else {
                output::success(&format!("Logged in to the auth API as {}", auth.user.email));
            }
        }
        ApiCommands::Dashboard => {
            if !client.has_token() {
                output::warning("No auth API token stored; the request is sent without one.");
            }
            let dashboard = client.dashboard().await?;
            println!("{}", serde_json::to_string_pretty(&dashboard)?);
        }
        ApiCommands::Logout => {
            client.logout()?;
            println!("{}", "Auth API token removed".yellow());
        }
    }

    Ok(())
}

//! Wealthtrack CLI - expense tracking in your terminal

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use wealthtrack_core::{LogEvent, LoggingService};

mod commands;
mod output;

use commands::{api, auth, demo, expenses, logs, summary};

/// Wealthtrack - expense tracking in your terminal
#[derive(Parser)]
#[command(name = "wt", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List expenses, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add an expense (prompts for missing fields)
    Add {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON (never prompts)
        #[arg(long)]
        json: bool,
    },

    /// Delete an expense
    Remove {
        /// Expense ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Dashboard totals, category breakdown and monthly trend
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List accepted categories
    Categories,

    /// Auxiliary auth API
    Api {
        #[command(subcommand)]
        command: api::ApiCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },
}

impl Commands {
    /// Command name for the event log
    fn name(&self) -> &'static str {
        match self {
            Commands::Signup { .. } => "signup",
            Commands::Login { .. } => "login",
            Commands::Logout => "logout",
            Commands::Whoami { .. } => "whoami",
            Commands::List { .. } => "list",
            Commands::Add { .. } => "add",
            Commands::Remove { .. } => "remove",
            Commands::Summary { .. } => "summary",
            Commands::Categories => "categories",
            Commands::Api { .. } => "api",
            Commands::Logs { .. } => "logs",
            Commands::Demo { .. } => "demo",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = commands::get_logger();
    let name = cli.command.name();

    commands::log_event(&logger, LogEvent::new("command_executed").with_command(name));

    match run(cli, &logger).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(name)
                    .with_error(e.to_string()),
            );
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    match cli.command {
        Commands::Signup {
            email,
            username,
            password,
        } => auth::signup(logger, email, username, password).await,
        Commands::Login { email, password } => auth::login(logger, email, password).await,
        Commands::Logout => auth::logout(logger).await,
        Commands::Whoami { json } => auth::whoami(logger, json).await,
        Commands::List { json } => expenses::list(logger, json).await,
        Commands::Add {
            title,
            amount,
            category,
            date,
            description,
            json,
        } => {
            let args = expenses::AddArgs {
                title,
                amount,
                category,
                date,
                description,
                json,
            };
            expenses::add(logger, args).await
        }
        Commands::Remove { id, force } => expenses::remove(logger, &id, force).await,
        Commands::Summary { json } => summary::run(logger, json).await,
        Commands::Categories => expenses::categories(),
        Commands::Api { command } => api::run(command).await,
        Commands::Logs { command } => logs::run(logger, command),
        Commands::Demo { command } => demo::run(command),
    }
}

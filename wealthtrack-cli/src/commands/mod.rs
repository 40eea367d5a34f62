//! CLI command implementations

pub mod api;
pub mod auth;
pub mod demo;
pub mod expenses;
pub mod logs;
pub mod summary;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use wealthtrack_core::{EntryPoint, LogEvent, LoggingService, User, WealthtrackContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from WEALTHTRACK_DIR or ~/.wealthtrack
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WEALTHTRACK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".wealthtrack"))
        .ok_or_else(|| anyhow!("Could not find home directory; set WEALTHTRACK_DIR"))
}

/// Build the context for this invocation
pub async fn get_context(logger: &Option<Arc<LoggingService>>) -> Result<WealthtrackContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    WealthtrackContext::new(&data_dir, logger.clone())
        .await
        .context("Failed to initialize wealthtrack context")
}

/// The signed-in user, or an error telling how to sign in
pub fn require_user(ctx: &WealthtrackContext) -> Result<User> {
    ctx.current_user()
        .ok_or_else(|| anyhow!("Not signed in. Run 'wt login' first."))
}

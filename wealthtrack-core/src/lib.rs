//! Wealthtrack Core - client layer for personal expense tracking
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Core entities (Expense, Category, Session, etc.)
//! - **ports**: Trait definitions for the backend (ExpenseBackend, IdentityProvider)
//! - **services**: Session, expense store, aggregation views, form intake, logging
//! - **adapters**: Concrete implementations (hosted backend, in-memory, auth API)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

mod log_migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use adapters::hosted::HostedClient;
use adapters::memory::{MemoryBackend, DEMO_EMAIL, DEMO_PASSWORD};
use config::Config;
use ports::{ExpenseBackend, IdentityProvider};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{Category, Expense, NewExpense, Session, SignUpOutcome, User};
pub use services::{EntryPoint, LogEvent, LoggingService};

const SESSION_FILE: &str = "session.json";

/// Main context for Wealthtrack operations
///
/// Built once on start and torn down by [`WealthtrackContext::sign_out`]. It
/// wires the identity session into the expense store and owns everything
/// that would otherwise be process-global state.
pub struct WealthtrackContext {
    pub config: Config,
    data_dir: PathBuf,
    backend_name: String,
    pub sessions: SessionService,
    pub store: ExpenseStore,
    logger: Option<Arc<LoggingService>>,
}

impl WealthtrackContext {
    /// Create a context from the settings in `data_dir`.
    ///
    /// Demo mode runs against an in-memory backend seeded with sample data
    /// and signs the demo user in. Otherwise the hosted backend is used and a
    /// persisted session, if any, is restored.
    pub async fn new(data_dir: &Path, logger: Option<Arc<LoggingService>>) -> anyhow::Result<Self> {
        let config = Config::load(data_dir)?;

        if config.demo_mode {
            let backend = Arc::new(MemoryBackend::demo().await);
            let context = Self::with_backend(config, data_dir, backend, logger);
            context.sessions.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await?;
            return Ok(context);
        }

        let (url, key) = config.backend().ok_or_else(|| {
            Error::Config(
                "Backend not configured. Set backendUrl and apiKey in settings.json, \
                 or WEALTHTRACK_BACKEND_URL and WEALTHTRACK_API_KEY"
                    .to_string(),
            )
        })?;
        let backend = Arc::new(HostedClient::new(url, key)?);
        let context = Self::with_backend(config, data_dir, backend, logger);

        if let Some(session) = load_session(data_dir) {
            if !context.sessions.restore(session) {
                clear_session(data_dir)?;
            }
        }

        Ok(context)
    }

    /// Create a context over an explicit backend
    pub fn with_backend<B>(
        config: Config,
        data_dir: &Path,
        backend: Arc<B>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self
    where
        B: ExpenseBackend + IdentityProvider + 'static,
    {
        let backend_name = backend.name().to_string();
        let provider: Arc<dyn IdentityProvider> = backend.clone();
        let sessions = SessionService::new(provider);

        let mut store = ExpenseStore::new(backend, sessions.subscribe());
        if let Some(logger) = &logger {
            store = store.with_logger(Arc::clone(logger));
        }

        Self {
            config,
            data_dir: data_dir.to_path_buf(),
            backend_name,
            sessions,
            store,
            logger,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn is_demo(&self) -> bool {
        self.config.demo_mode
    }

    pub fn current_user(&self) -> Option<User> {
        self.sessions.current_user()
    }

    fn record(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event.with_backend(self.backend_name.as_str()));
        }
    }

    /// Save the session for later invocations. A failure is logged and the
    /// session stays active for this one.
    fn persist(&self, session: &Session) {
        if self.is_demo() {
            return;
        }
        if let Err(e) = save_session(&self.data_dir, session) {
            self.record(LogEvent::new("session_save_failed").with_error(e.message()));
        }
    }

    /// Sign in, persist the session and load the user's expenses. A failed
    /// save is logged and a failed load is surfaced on the store snapshot;
    /// neither is returned.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = match self.sessions.sign_in(email, password).await {
            Ok(session) => session,
            Err(e) => {
                self.record(LogEvent::new("sign_in_failed").with_error(e.message()));
                return Err(e);
            }
        };
        self.persist(&session);
        self.record(LogEvent::new("signed_in"));
        let _ = self.store.fetch_all().await;
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignUpOutcome> {
        let outcome = match self.sessions.sign_up(email, password, username).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record(LogEvent::new("sign_up_failed").with_error(e.message()));
                return Err(e);
            }
        };
        self.record(LogEvent::new("signed_up"));
        if let SignUpOutcome::SignedIn { session } = &outcome {
            self.persist(session);
            let _ = self.store.fetch_all().await;
        }
        Ok(outcome)
    }

    /// Teardown: end the session, drop cached expenses and forget the
    /// persisted session. Local state is cleared even if the backend call
    /// fails.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.sessions.sign_out().await;
        self.store.clear();
        clear_session(&self.data_dir)?;
        self.record(LogEvent::new("signed_out"));
        result
    }

    /// Categories new expenses may use
    pub fn accepted_categories(&self) -> AcceptedCategories {
        AcceptedCategories::with_extras(&self.config.extra_categories)
    }

    /// A blank expense form
    pub fn form(&self) -> FormIntake {
        FormIntake::new(self.accepted_categories())
    }

    /// Aggregation views of the current list
    pub fn views(&self, today: NaiveDate) -> AggregationViews {
        AggregationViews::compute(&self.store.snapshot(), today)
    }

    /// Views that follow the store
    pub fn live_views(&self, today: NaiveDate) -> LiveViews {
        LiveViews::new(self.store.subscribe(), today)
    }
}

/// Persisted session in the data directory, if readable
pub fn load_session(data_dir: &Path) -> Option<Session> {
    let content = std::fs::read_to_string(data_dir.join(SESSION_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn save_session(data_dir: &Path, session: &Session) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(session)?;
    std::fs::write(data_dir.join(SESSION_FILE), content)?;
    Ok(())
}

pub fn clear_session(data_dir: &Path) -> Result<()> {
    let path = data_dir.join(SESSION_FILE);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

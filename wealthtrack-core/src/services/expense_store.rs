//! Expense store - the single source of truth for the current user's expenses
//!
//! Holds the in-memory list (newest date first) and publishes every change as
//! a [`StoreSnapshot`] over a watch channel. Only successful backend round
//! trips mutate the list; failures are returned as values and leave the list
//! as it was.

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::result::{Error, Result};
use crate::domain::{Expense, ExpenseInsert, NewExpense, Session};
use crate::ports::ExpenseBackend;
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::session::SessionState;

const NOT_AUTHENTICATED: &str = "User not authenticated";

/// Published state of the store
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub expenses: Arc<Vec<Expense>>,
    /// True while a fetch is in flight
    pub loading: bool,
    /// Message of the last failed fetch, cleared by the next successful one
    pub error: Option<String>,
    /// Incremented exactly when the expense list changes
    pub revision: u64,
}

pub struct ExpenseStore {
    backend: Arc<dyn ExpenseBackend>,
    session: watch::Receiver<SessionState>,
    state: watch::Sender<StoreSnapshot>,
    logger: Option<Arc<LoggingService>>,
}

impl ExpenseStore {
    pub fn new(backend: Arc<dyn ExpenseBackend>, session: watch::Receiver<SessionState>) -> Self {
        let (state, _) = watch::channel(StoreSnapshot::default());
        Self {
            backend,
            session,
            state,
            logger: None,
        }
    }

    /// Record store events in the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.borrow().clone()
    }

    pub fn expenses(&self) -> Arc<Vec<Expense>> {
        self.state.borrow().expenses.clone()
    }

    fn current_session(&self) -> Option<Session> {
        self.session
            .borrow()
            .session
            .clone()
            .filter(|s| !s.is_expired())
    }

    fn record(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event.with_backend(self.backend.name()));
        }
    }

    fn record_failure(&self, event: &str, error: &Error) {
        self.record(LogEvent::new(event).with_error(error.message()));
    }

    /// Replace the list with the backend's current rows for the signed-in
    /// user. Without a session this returns immediately.
    pub async fn fetch_all(&self) -> Result<()> {
        let Some(session) = self.current_session() else {
            return Ok(());
        };

        self.state.send_modify(|s| s.loading = true);

        match self.backend.select_all(&session).await {
            Ok(rows) => {
                self.state.send_modify(|s| {
                    s.expenses = Arc::new(rows);
                    s.loading = false;
                    s.error = None;
                    s.revision += 1;
                });
                self.record(LogEvent::new("expenses_fetched"));
                Ok(())
            }
            Err(e) => {
                let e = match e {
                    Error::Fetch(_) => e,
                    other => Error::fetch(other.message()),
                };
                let message = e.message();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                });
                self.record_failure("fetch_failed", &e);
                Err(e)
            }
        }
    }

    /// Persist a new expense owned by the signed-in user and put the stored
    /// record at the head of the list
    pub async fn add(&self, expense: NewExpense) -> Result<Expense> {
        let Some(session) = self.current_session() else {
            return Err(Error::write(NOT_AUTHENTICATED));
        };

        let row = ExpenseInsert {
            expense,
            user_id: session.user.id.clone(),
        };

        match self.backend.insert(&session, &row).await {
            Ok(stored) => {
                let head = stored.clone();
                self.state.send_modify(|s| {
                    let mut expenses = Vec::with_capacity(s.expenses.len() + 1);
                    expenses.push(head);
                    expenses.extend(s.expenses.iter().cloned());
                    s.expenses = Arc::new(expenses);
                    s.revision += 1;
                });
                self.record(LogEvent::new("expense_added"));
                Ok(stored)
            }
            Err(e) => {
                let e = into_write(e);
                self.record_failure("add_failed", &e);
                Err(e)
            }
        }
    }

    /// Delete by id. The backend delete is always issued; an id that is not
    /// in the list leaves the list unchanged and is not an error.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let Some(session) = self.current_session() else {
            return Err(Error::write(NOT_AUTHENTICATED));
        };

        match self.backend.delete(&session, id).await {
            Ok(()) => {
                let removed = self.state.send_if_modified(|s| {
                    if !s.expenses.iter().any(|e| e.id == id) {
                        return false;
                    }
                    let kept: Vec<Expense> =
                        s.expenses.iter().filter(|e| e.id != id).cloned().collect();
                    s.expenses = Arc::new(kept);
                    s.revision += 1;
                    true
                });
                if removed {
                    self.record(LogEvent::new("expense_removed"));
                } else {
                    self.record(LogEvent::new("expense_not_found"));
                }
                Ok(())
            }
            Err(e) => {
                let e = into_write(e);
                self.record_failure("remove_failed", &e);
                Err(e)
            }
        }
    }

    /// Drop every cached record (sign-out teardown)
    pub fn clear(&self) {
        self.state.send_modify(|s| {
            let had_rows = !s.expenses.is_empty();
            s.expenses = Arc::new(Vec::new());
            s.loading = false;
            s.error = None;
            if had_rows {
                s.revision += 1;
            }
        });
    }
}

fn into_write(error: Error) -> Error {
    match error {
        Error::Write(_) => error,
        other => Error::write(other.message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryBackend;
    use crate::domain::Category;
    use crate::services::session::SessionService;
    use crate::domain::User;
    use chrono::{Duration, NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn new_expense(title: &str, cents: i64, day: u32) -> NewExpense {
        NewExpense {
            title: title.to_string(),
            amount: Decimal::new(cents, 2),
            category: Category::FoodAndDining,
            description: None,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        }
    }

    async fn signed_in() -> (ExpenseStore, SessionService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("ann@example.com", "secret1", None).await;
        let sessions = SessionService::new(backend.clone());
        sessions.sign_in("ann@example.com", "secret1").await.unwrap();
        let store = ExpenseStore::new(backend.clone(), sessions.subscribe());
        (store, sessions, backend)
    }

    #[tokio::test]
    async fn test_fetch_without_session_is_noop() {
        let backend = Arc::new(MemoryBackend::new());
        let sessions = SessionService::new(backend.clone());
        let store = ExpenseStore::new(backend, sessions.subscribe());

        store.fetch_all().await.unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.revision, 0);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_expired_session_counts_as_signed_out() {
        let backend = Arc::new(MemoryBackend::new());
        let expired = Session::new(User::new("user-1", "ann@example.com"), "stale-token")
            .expiring_in(Utc::now() - Duration::hours(2), 60);
        let (_tx, rx) = watch::channel(SessionState {
            session: Some(expired),
            loading: false,
        });
        let store = ExpenseStore::new(backend.clone(), rx);
        // Any backend read would fail, so Ok means no request was made
        backend.set_fail_reads(true);

        store.fetch_all().await.unwrap();
        assert_eq!(store.snapshot().revision, 0);
        assert!(store.snapshot().error.is_none());

        let err = store.add(new_expense("Coffee", 450, 2)).await.unwrap_err();
        assert!(matches!(err, Error::Write(_)));
        assert_eq!(err.message(), "User not authenticated");
        assert_eq!(backend.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_prepends_and_bumps_revision() {
        let (store, _sessions, _) = signed_in().await;

        store.add(new_expense("Coffee", 450, 2)).await.unwrap();
        let lunch = store.add(new_expense("Lunch", 1250, 1)).await.unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.expenses[0].id, lunch.id);
        assert_eq!(snapshot.expenses.len(), 2);
        assert_eq!(snapshot.revision, 2);
    }

    #[tokio::test]
    async fn test_add_without_session_fails() {
        let backend = Arc::new(MemoryBackend::new());
        let sessions = SessionService::new(backend.clone());
        let store = ExpenseStore::new(backend.clone(), sessions.subscribe());

        let err = store.add(new_expense("Coffee", 450, 2)).await.unwrap_err();
        assert!(matches!(err, Error::Write(_)));
        assert_eq!(err.message(), "User not authenticated");
        assert_eq!(backend.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_list_untouched() {
        let (store, _sessions, backend) = signed_in().await;
        store.add(new_expense("Coffee", 450, 2)).await.unwrap();
        let before = store.snapshot();

        backend.set_fail_writes(true);
        assert!(matches!(
            store.add(new_expense("Lunch", 1250, 1)).await,
            Err(Error::Write(_))
        ));
        assert!(matches!(
            store.remove(&before.expenses[0].id).await,
            Err(Error::Write(_))
        ));

        let after = store.snapshot();
        assert_eq!(after.revision, before.revision);
        assert_eq!(after.expenses, before.expenses);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_list_and_sets_error() {
        let (store, _sessions, backend) = signed_in().await;
        store.add(new_expense("Coffee", 450, 2)).await.unwrap();

        backend.set_fail_reads(true);
        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.expenses.len(), 1);
        assert_eq!(snapshot.error.as_deref(), Some("Backend unavailable"));
        assert!(!snapshot.loading);

        backend.set_fail_reads(false);
        store.fetch_all().await.unwrap();
        assert!(store.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_ok_and_silent() {
        let (store, _sessions, _) = signed_in().await;
        store.add(new_expense("Coffee", 450, 2)).await.unwrap();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.remove("does-not-exist").await.unwrap();

        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.snapshot().expenses.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_gates_fetch() {
        let (store, sessions, _) = signed_in().await;
        store.add(new_expense("Coffee", 450, 2)).await.unwrap();

        sessions.sign_out().await.unwrap();
        store.clear();

        store.fetch_all().await.unwrap();
        assert!(store.expenses().is_empty());
    }

    #[tokio::test]
    async fn test_store_events_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            LoggingService::new(dir.path(), crate::services::logging::EntryPoint::Library, "test")
                .unwrap(),
        );
        let (store, _sessions, backend) = signed_in().await;
        let store = store.with_logger(logger.clone());

        store.add(new_expense("Coffee", 450, 2)).await.unwrap();
        backend.set_fail_reads(true);
        let _ = store.fetch_all().await;

        let entries = logger.get_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, "fetch_failed");
        assert_eq!(entries[0].backend.as_deref(), Some("memory"));
        assert_eq!(entries[1].event, "expense_added");
    }

    #[tokio::test]
    async fn test_remove_logs_only_actual_removals() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            LoggingService::new(dir.path(), crate::services::logging::EntryPoint::Library, "test")
                .unwrap(),
        );
        let (store, _sessions, _) = signed_in().await;
        let store = store.with_logger(logger.clone());
        let coffee = store.add(new_expense("Coffee", 450, 2)).await.unwrap();

        store.remove("does-not-exist").await.unwrap();
        store.remove(&coffee.id).await.unwrap();

        let events: Vec<String> = logger
            .get_recent(10)
            .unwrap()
            .into_iter()
            .map(|e| e.event)
            .collect();
        assert_eq!(events, vec!["expense_removed", "expense_not_found", "expense_added"]);
    }
}

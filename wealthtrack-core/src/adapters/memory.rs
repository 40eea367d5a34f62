//! In-process backend for demo mode and tests
//!
//! Implements both backend ports against in-memory state, including the
//! owner-scoped row filtering the hosted table enforces. Failure switches let
//! tests exercise the error paths of the services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Category, Expense, ExpenseInsert, NewExpense, Session, SignUpOutcome, User};
use crate::ports::{ExpenseBackend, IdentityProvider};

/// Email of the seeded demo account
pub const DEMO_EMAIL: &str = "demo@wealthtrack.local";
/// Password of the seeded demo account
pub const DEMO_PASSWORD: &str = "demo-password";

#[derive(Default)]
struct State {
    /// email -> (user, password)
    accounts: HashMap<String, (User, String)>,
    /// access token -> user id
    tokens: HashMap<String, String>,
    rows: Vec<Expense>,
}

/// In-memory backend
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    require_confirmation: bool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign-ups report `ConfirmationPending` instead of signing in
    pub fn requiring_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    /// A backend seeded with the demo account and six months of expenses
    pub async fn demo() -> Self {
        let backend = Self::new();
        let user = backend
            .register(DEMO_EMAIL, DEMO_PASSWORD, Some("demo"))
            .await;
        let today = Utc::now().date_naive();
        {
            let mut state = backend.state.lock().await;
            for expense in generate_demo_expenses(today) {
                let insert = ExpenseInsert {
                    expense,
                    user_id: user.id.clone(),
                };
                state
                    .rows
                    .push(Expense::from_insert(Uuid::new_v4().to_string(), insert, Utc::now()));
            }
        }
        backend
    }

    /// Make every read fail until switched off
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail until switched off
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Create an account directly, bypassing the sign-up flow
    pub async fn register(&self, email: &str, password: &str, username: Option<&str>) -> User {
        let mut state = self.state.lock().await;
        Self::insert_account(&mut state, email, password, username)
    }

    fn insert_account(state: &mut State, email: &str, password: &str, username: Option<&str>) -> User {
        let mut user = User::new(Uuid::new_v4().to_string(), email);
        user.username = username.map(str::to_string);
        state
            .accounts
            .insert(email.to_lowercase(), (user.clone(), password.to_string()));
        user
    }

    /// Number of stored rows across all owners
    pub async fn row_count(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    fn issue_session(state: &mut State, user: &User) -> Session {
        let token = Uuid::new_v4().to_string();
        state.tokens.insert(token.clone(), user.id.clone());
        Session::new(user.clone(), token).expiring_in(Utc::now(), 3600)
    }

    /// Resolve the owner behind a session, like the backend does from the JWT
    fn owner_of(state: &State, session: &Session) -> Option<String> {
        if session.is_expired() {
            return None;
        }
        state.tokens.get(&session.access_token).cloned()
    }
}

#[async_trait]
impl ExpenseBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn select_all(&self, session: &Session) -> Result<Vec<Expense>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::fetch("Backend unavailable"));
        }
        let state = self.state.lock().await;
        let owner = Self::owner_of(&state, session).ok_or_else(|| Error::fetch("JWT expired"))?;

        let mut rows: Vec<Expense> = state
            .rows
            .iter()
            .filter(|e| e.user_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(rows)
    }

    async fn insert(&self, session: &Session, row: &ExpenseInsert) -> Result<Expense> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::write("Backend unavailable"));
        }
        let mut state = self.state.lock().await;
        let owner = Self::owner_of(&state, session).ok_or_else(|| Error::write("JWT expired"))?;

        // Row-level security: the owner column must match the caller
        if row.user_id != owner {
            return Err(Error::write(
                "new row violates row-level security policy for table \"expenses\"",
            ));
        }
        if row.expense.title.trim().is_empty() {
            return Err(Error::write("null value in column \"title\" violates not-null constraint"));
        }

        let stored = Expense::from_insert(Uuid::new_v4().to_string(), row.clone(), Utc::now());
        state.rows.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::write("Backend unavailable"));
        }
        let mut state = self.state.lock().await;
        let owner = Self::owner_of(&state, session).ok_or_else(|| Error::write("JWT expired"))?;
        state.rows.retain(|e| !(e.id == id && e.user_id == owner));
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let mut state = self.state.lock().await;
        let user = match state.accounts.get(&email.to_lowercase()) {
            Some((user, stored)) if stored == password => user.clone(),
            _ => return Err(Error::auth("Invalid login credentials")),
        };
        Ok(Self::issue_session(&mut state, &user))
    }

    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignUpOutcome> {
        if password.len() < 6 {
            return Err(Error::auth("Password should be at least 6 characters"));
        }
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&email.to_lowercase()) {
            return Err(Error::auth("User already registered"));
        }

        let user = Self::insert_account(&mut state, email, password, Some(username));
        if self.require_confirmation {
            return Ok(SignUpOutcome::ConfirmationPending { email: user.email });
        }

        let session = Self::issue_session(&mut state, &user);
        Ok(SignUpOutcome::SignedIn { session })
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        self.state.lock().await.tokens.remove(&session.access_token);
        Ok(())
    }
}

/// Generate demo expenses covering the six months up to `today`
///
/// Deterministic: the same `today` always yields the same list.
pub fn generate_demo_expenses(today: NaiveDate) -> Vec<NewExpense> {
    let mut expenses = Vec::new();

    for days_ago in 0..180 {
        let date = today - Duration::days(days_ago);
        let day = date.day();

        if day == 1 {
            expenses.push(demo_expense("Rent", 145000, Category::BillsAndUtilities, date));
        }
        if day == 10 {
            expenses.push(demo_expense("Electricity", 8640, Category::BillsAndUtilities, date));
        }
        if day % 7 == 3 {
            expenses.push(demo_expense("Groceries", 6000 + (day as i64 * 137) % 4000, Category::FoodAndDining, date));
        }
        if day % 5 == 0 {
            expenses.push(demo_expense("Transit pass top-up", 2500, Category::Transportation, date));
        }
        if day == 18 {
            expenses.push(demo_expense("Streaming subscription", 1599, Category::Entertainment, date));
        }
        if day == 22 && date.month() % 2 == 0 {
            expenses.push(demo_expense("Pharmacy", 3475, Category::Healthcare, date));
        }
    }

    expenses
}

fn demo_expense(title: &str, cents: i64, category: Category, date: NaiveDate) -> NewExpense {
    NewExpense {
        title: title.to_string(),
        amount: Decimal::new(cents, 2),
        category,
        description: None,
        date,
    }
}

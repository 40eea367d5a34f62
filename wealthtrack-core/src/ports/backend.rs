//! Backend ports - persistence and identity abstractions
//!
//! The hosted service is treated as an opaque persistence + identity
//! provider. Row filtering happens on the backend: every table operation is
//! scoped to the owner of the session it is called with.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{Expense, ExpenseInsert, Session, SignUpOutcome};

/// Row-filtered access to the `expenses` table
#[async_trait]
pub trait ExpenseBackend: Send + Sync {
    /// Backend name (e.g., "hosted", "memory")
    fn name(&self) -> &str;

    /// All expenses visible to the session owner, newest date first
    async fn select_all(&self, session: &Session) -> Result<Vec<Expense>>;

    /// Insert one row and return the canonical stored record
    async fn insert(&self, session: &Session, row: &ExpenseInsert) -> Result<Expense>;

    /// Delete by identifier. Deleting an id that does not exist (or is not
    /// visible to the owner) succeeds without effect.
    async fn delete(&self, session: &Session, id: &str) -> Result<()>;
}

/// Credential-based identity service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange email and password for a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Create an account
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignUpOutcome>;

    /// Revoke the session on the backend
    async fn sign_out(&self, session: &Session) -> Result<()>;
}

//! User and session domain models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Represents an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Username if set, otherwise the email
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}

/// An authenticated identity and the tokens that prove it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// None means the token does not expire
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user: User, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Set expiry relative to `now`
    pub fn expiring_in(mut self, now: DateTime<Utc>, seconds: i64) -> Self {
        self.expires_at = Some(now + Duration::seconds(seconds));
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// What a sign-up produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    /// Account created and signed in
    SignedIn { session: Session },
    /// Account created; the backend wants the email confirmed first
    ConfirmationPending { email: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("user-123", "test@example.com");
        assert_eq!(user.id, "user-123");
        assert_eq!(user.display_name(), "test@example.com");

        let user = user.with_username("sam");
        assert_eq!(user.display_name(), "sam");
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session::new(User::new("u", "e@x.io"), "tok").expiring_in(now, 3600);
        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(now + Duration::seconds(3600)));

        let forever = Session::new(User::new("u", "e@x.io"), "tok");
        assert!(!forever.is_expired_at(now + Duration::days(3650)));
    }
}

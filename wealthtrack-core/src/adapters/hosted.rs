//! Hosted backend client
//!
//! Talks to a backend-as-a-service exposing a GoTrue-style auth API under
//! `/auth/v1` and a PostgREST-style table API under `/rest/v1`. The
//! `expenses` table is protected by row-level security, so every table
//! request carries the caller's access token and the backend filters rows to
//! that owner.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{Expense, ExpenseInsert, Session, SignUpOutcome, User};
use crate::ports::{ExpenseBackend, IdentityProvider};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const EXPENSES_TABLE: &str = "expenses";

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

/// User object as returned by the auth API
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: UserMetadata,
}

/// Client for the hosted backend
#[derive(Debug, Clone)]
pub struct HostedClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HostedClient {
    /// Create a client for the project at `base_url` using its public API key
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid backend URL '{}': {}", base_url, e)))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(Error::Config("Backend URL must use http or https".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(Error::Config("Backend API key cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, EXPENSES_TABLE)
    }

    /// Attach the project key and the caller's token
    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
    }

    fn map_token_response(token: TokenResponse) -> Session {
        let now = Utc::now();
        let metadata = token.user.user_metadata.unwrap_or_default();
        let user = User {
            id: token.user.id,
            email: token.user.email.unwrap_or_default(),
            username: metadata.username,
        };
        let expires_at = match (token.expires_at, token.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(now + chrono::Duration::seconds(secs)),
            (None, None) => None,
        };
        Session {
            user,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        }
    }
}

/// Map transport errors to user-friendly messages
fn map_request_error(error: reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Connection timed out after {} seconds", REQUEST_TIMEOUT_SECS)
    } else if error.is_connect() {
        "Unable to connect to the backend".to_string()
    } else {
        format!("Backend request failed: {}", error)
    }
}

/// Pull the human-readable message out of an auth or table error body
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    let from_body = parsed.as_ref().and_then(|v| {
        ["error_description", "msg", "message", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
            .map(str::to_string)
    });

    match (from_body, status) {
        (Some(msg), _) => msg,
        (None, StatusCode::UNAUTHORIZED) => "Session expired. Please sign in again.".to_string(),
        (None, StatusCode::FORBIDDEN) => "Access denied".to_string(),
        (None, StatusCode::TOO_MANY_REQUESTS) => {
            "Rate limit exceeded. Please wait a moment and try again.".to_string()
        }
        (None, status) => format!("Backend error: HTTP {}", status.as_u16()),
    }
}

/// Send a request, turning transport failures and non-2xx statuses into
/// errors built by `kind`
async fn send(request: RequestBuilder, kind: fn(String) -> Error) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| kind(map_request_error(e)))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(kind(error_message(status, &body)))
}

#[async_trait]
impl ExpenseBackend for HostedClient {
    fn name(&self) -> &str {
        "hosted"
    }

    async fn select_all(&self, session: &Session) -> Result<Vec<Expense>> {
        let request = self
            .authorized(self.client.get(self.table_url()), session)
            .query(&[("select", "*"), ("order", "date.desc")]);

        let response = send(request, Error::Fetch).await?;
        response
            .json::<Vec<Expense>>()
            .await
            .map_err(|e| Error::fetch(format!("Failed to parse expenses: {}", e)))
    }

    async fn insert(&self, session: &Session, row: &ExpenseInsert) -> Result<Expense> {
        let request = self
            .authorized(self.client.post(self.table_url()), session)
            .header("Prefer", "return=representation")
            .json(&[row]);

        let response = send(request, Error::Write).await?;
        let mut rows = response
            .json::<Vec<Expense>>()
            .await
            .map_err(|e| Error::write(format!("Failed to parse inserted expense: {}", e)))?;

        match rows.len() {
            1 => Ok(rows.remove(0)),
            n => Err(Error::write(format!("Expected one inserted row, got {}", n))),
        }
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<()> {
        let request = self
            .authorized(self.client.delete(self.table_url()), session)
            .query(&[("id", format!("eq.{}", id))]);

        send(request, Error::Write).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for HostedClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&PasswordGrant { email, password });

        let response = send(request, Error::Auth).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Failed to parse auth response: {}", e)))?;

        Ok(Self::map_token_response(token))
    }

    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignUpOutcome> {
        let request = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.api_key)
            .json(&SignUpRequest {
                email,
                password,
                data: UserMetadata {
                    username: Some(username.to_string()),
                },
            });

        let response = send(request, Error::Auth).await?;
        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Failed to parse sign-up response: {}", e)))?;

        // Without auto-confirm the backend returns the bare user, no tokens
        if body.get("access_token").is_none() {
            let email = body
                .get("email")
                .and_then(|v| v.as_str())
                .unwrap_or(email)
                .to_string();
            return Ok(SignUpOutcome::ConfirmationPending { email });
        }

        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| Error::auth(format!("Failed to parse sign-up response: {}", e)))?;
        Ok(SignUpOutcome::SignedIn {
            session: Self::map_token_response(token),
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let request = self.authorized(self.client.post(self.auth_url("logout")), session);
        send(request, Error::Auth).await?;
        Ok(())
    }
}

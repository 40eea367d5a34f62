//! Auxiliary REST auth API client
//!
//! A small standalone service with `POST /signup`, `POST /login` and
//! `GET /dashboard`. It is independent of the hosted identity flow: the token
//! it hands out is kept in its own file and attached as a bearer token to
//! every request while present.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};

/// Default location of the auxiliary API
pub const DEFAULT_AUTH_API_URL: &str = "http://localhost:5000";

const REQUEST_TIMEOUT_SECS: u64 = 15;
const TOKEN_FILE: &str = "api_token";

#[derive(Debug, Clone, Serialize)]
pub struct SignupData {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

/// User as the auxiliary API reports it (numeric id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
    pub id: i64,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: ApiUser,
}

/// File-backed storage for the auxiliary API token
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(TOKEN_FILE),
        }
    }

    pub fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Client for the auxiliary auth API
pub struct AuthApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl AuthApiClient {
    pub fn new(base_url: &str, tokens: TokenStore) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid auth API URL '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the stored token, if any
    fn with_token(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.load() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn authenticate(&self, path: &str, body: &impl Serialize) -> Result<AuthResponse> {
        let request = self.with_token(self.client.post(self.url(path)).json(body));
        let response = request
            .send()
            .await
            .map_err(|e| Error::auth(transport_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(body_message(&body).unwrap_or_else(|| {
                format!("Auth API error: HTTP {}", status.as_u16())
            })));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Failed to parse auth response: {}", e)))?;
        self.tokens.save(&auth.access_token)?;
        Ok(auth)
    }

    /// Register and keep the returned token
    pub async fn signup(&self, data: &SignupData) -> Result<AuthResponse> {
        self.authenticate("/signup", data).await
    }

    /// Log in and keep the returned token
    pub async fn login(&self, data: &LoginData) -> Result<AuthResponse> {
        self.authenticate("/login", data).await
    }

    /// Fetch the dashboard payload; its shape is owned by the service
    pub async fn dashboard(&self) -> Result<JsonValue> {
        let request = self.with_token(self.client.get(self.url("/dashboard")));
        let response = request
            .send()
            .await
            .map_err(|e| Error::fetch(transport_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::fetch(body_message(&body).unwrap_or_else(|| {
                format!("Auth API error: HTTP {}", status.as_u16())
            })));
        }

        response
            .json()
            .await
            .map_err(|e| Error::fetch(format!("Failed to parse dashboard: {}", e)))
    }

    /// Forget the stored token
    pub fn logout(&self) -> Result<()> {
        self.tokens.clear()
    }

    pub fn has_token(&self) -> bool {
        self.tokens.load().is_some()
    }
}

fn transport_message(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Connection timed out after {} seconds", REQUEST_TIMEOUT_SECS)
    } else if error.is_connect() {
        "Unable to connect to the auth API".to_string()
    } else {
        format!("Auth API request failed: {}", error)
    }
}

fn body_message(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    ["message", "msg", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|m| m.as_str()))
        .map(str::to_string)
}

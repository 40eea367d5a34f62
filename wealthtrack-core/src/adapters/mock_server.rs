//! Mock HTTP server for testing the HTTP adapters
//!
//! Simulates the pieces of the hosted backend and the auxiliary auth API the
//! clients use:
//! - POST /auth/v1/token, POST /auth/v1/signup, POST /auth/v1/logout
//! - GET/POST/DELETE /rest/v1/expenses
//! - POST /signup, POST /login, GET /dashboard
//!
//! Any email signs in with the password "password".

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};

const VALID_PASSWORD: &str = "password";
const ISSUED_TOKEN_PREFIX: &str = "mock-token-";

/// Mock backend server
pub struct MockBackendServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Behaviour switches
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Sign-ups return the bare user instead of a session
    pub require_confirmation: bool,
    /// Table endpoints answer 503
    pub fail_table: bool,
}

struct Shared {
    config: MockConfig,
    rows: Mutex<Vec<JsonValue>>,
    next_id: AtomicU64,
}

struct Request {
    method: String,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: String,
}

impl MockBackendServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let shared = Arc::new(Shared {
            config,
            rows: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        });

        // Non-blocking so the loop can notice shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let shared = shared.clone();
                        thread::spawn(move || handle_connection(stream, &shared));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockBackendServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    // Read until the end of the headers
    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let first_line = lines.next()?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }
    let body = String::from_utf8_lossy(&data[header_end..]).to_string();

    let (path, query_string) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let query = query_string
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.replace("%2C", ",")))
        .collect();

    Some(Request {
        method,
        path: path.to_string(),
        query,
        headers,
        body,
    })
}

fn handle_connection(mut stream: TcpStream, shared: &Shared) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };

    let (status, body) = route(&request, shared);
    send_response(&mut stream, status, body);
}

fn route(request: &Request, shared: &Shared) -> (u16, Option<JsonValue>) {
    let body: JsonValue = serde_json::from_str(&request.body).unwrap_or(JsonValue::Null);

    match (request.method.as_str(), request.path.as_str()) {
        // Hosted auth
        ("POST", "/auth/v1/token") => {
            if !request.headers.contains_key("apikey") {
                return (401, Some(json!({"message": "No API key found in request"})));
            }
            let email = body["email"].as_str().unwrap_or_default();
            if body["password"].as_str() != Some(VALID_PASSWORD) {
                return (
                    400,
                    Some(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
                );
            }
            (200, Some(token_body(email, None)))
        }
        ("POST", "/auth/v1/signup") => {
            let email = body["email"].as_str().unwrap_or_default();
            let username = body["data"]["username"].as_str().map(str::to_string);
            if shared.config.require_confirmation {
                return (
                    200,
                    Some(json!({"id": user_id_for(email), "email": email, "confirmation_sent_at": "2024-01-01T00:00:00Z"})),
                );
            }
            (200, Some(token_body(email, username)))
        }
        ("POST", "/auth/v1/logout") => (204, None),

        // Hosted table
        (method, "/rest/v1/expenses") => {
            let Some(owner) = bearer_owner(request) else {
                return (401, Some(json!({"message": "JWT expired"})));
            };
            if shared.config.fail_table {
                return (503, Some(json!({"message": "Service temporarily unavailable"})));
            }
            table(method, request, &body, &owner, shared)
        }

        // Auxiliary auth API
        ("POST", "/signup") | ("POST", "/login") => {
            let email = body["email"].as_str().unwrap_or_default();
            if request.path == "/login" && body["password"].as_str() != Some(VALID_PASSWORD) {
                return (401, Some(json!({"message": "Invalid credentials"})));
            }
            let username = body["username"].as_str().unwrap_or("someone");
            (
                if request.path == "/signup" { 201 } else { 200 },
                Some(json!({
                    "access_token": format!("{}{}", ISSUED_TOKEN_PREFIX, email),
                    "user": {"id": 7, "email": email, "username": username}
                })),
            )
        }
        ("GET", "/dashboard") => match bearer_owner(request) {
            Some(owner) => (200, Some(json!({"message": format!("Welcome {}", owner), "widgets": []}))),
            None => (401, Some(json!({"msg": "Missing Authorization Header"}))),
        },

        _ => (404, Some(json!({"message": "Endpoint not found"}))),
    }
}

fn table(
    method: &str,
    request: &Request,
    body: &JsonValue,
    owner: &str,
    shared: &Shared,
) -> (u16, Option<JsonValue>) {
    let mut rows = match shared.rows.lock() {
        Ok(rows) => rows,
        Err(_) => return (500, Some(json!({"message": "lock poisoned"}))),
    };

    match method {
        "GET" => {
            let mut visible: Vec<JsonValue> = rows
                .iter()
                .filter(|r| r["user_id"] == owner)
                .cloned()
                .collect();
            if request.query.get("order").map(String::as_str) == Some("date.desc") {
                visible.sort_by(|a, b| b["date"].as_str().cmp(&a["date"].as_str()));
            }
            (200, Some(JsonValue::Array(visible)))
        }
        "POST" => {
            let Some(items) = body.as_array() else {
                return (400, Some(json!({"message": "Expected an array body"})));
            };
            let mut inserted = Vec::new();
            for item in items {
                if item["user_id"] != owner {
                    return (
                        403,
                        Some(json!({"code": "42501", "message": "new row violates row-level security policy for table \"expenses\""})),
                    );
                }
                let mut row = item.clone();
                let id = shared.next_id.fetch_add(1, Ordering::SeqCst);
                row["id"] = json!(format!("00000000-0000-0000-0000-{:012}", id));
                row["created_at"] = json!("2024-01-15T10:00:00+00:00");
                row["updated_at"] = json!("2024-01-15T10:00:00+00:00");
                if row.get("description").is_none() {
                    row["description"] = JsonValue::Null;
                }
                rows.push(row.clone());
                inserted.push(row);
            }
            if request.headers.get("prefer").map(String::as_str) == Some("return=representation") {
                (201, Some(JsonValue::Array(inserted)))
            } else {
                (201, None)
            }
        }
        "DELETE" => {
            let id = request
                .query
                .get("id")
                .and_then(|v| v.strip_prefix("eq."))
                .unwrap_or_default()
                .to_string();
            rows.retain(|r| !(r["id"] == id.as_str() && r["user_id"] == owner));
            (204, None)
        }
        _ => (405, Some(json!({"message": "Method not allowed"}))),
    }
}

fn user_id_for(email: &str) -> String {
    format!("user-{}", email.replace(['@', '.'], "-"))
}

/// Owner id encoded in a token issued by this server
fn bearer_owner(request: &Request) -> Option<String> {
    let token = request
        .headers
        .get("authorization")?
        .strip_prefix("Bearer ")?
        .to_string();
    token
        .strip_prefix(ISSUED_TOKEN_PREFIX)
        .map(user_id_for)
}

fn token_body(email: &str, username: Option<String>) -> JsonValue {
    json!({
        "access_token": format!("{}{}", ISSUED_TOKEN_PREFIX, email),
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "mock-refresh",
        "user": {
            "id": user_id_for(email),
            "email": email,
            "user_metadata": {"username": username}
        }
    })
}

fn send_response(stream: &mut TcpStream, status: u16, body: Option<JsonValue>) {
    let status_text = match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        503 => "Service Unavailable",
        _ => "Internal Server Error",
    };
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_server_starts() {
        let server = MockBackendServer::start(MockConfig::default()).unwrap();
        assert!(server.base_url().starts_with("http://127.0.0.1:"));
    }

    #[test]
    fn test_bearer_owner_round_trip() {
        let mut headers = HashMap::new();
        headers.insert(
            "authorization".to_string(),
            format!("Bearer {}a@b.io", ISSUED_TOKEN_PREFIX),
        );
        let request = Request {
            method: "GET".to_string(),
            path: "/dashboard".to_string(),
            query: HashMap::new(),
            headers,
            body: String::new(),
        };
        assert_eq!(bearer_owner(&request), Some("user-a-b-io".to_string()));
    }
}

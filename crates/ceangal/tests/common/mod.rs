//! Shared integration test fixtures: an in-process fake Google HTTP server
//! and helpers for sessions backed by it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use ceangal::auth::scopes;
use ceangal::config::{Config, Endpoints};
use ceangal::Session;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// A request received by the fake server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<(String, String), Vec<(u16, Value)>>,
    requests: Vec<Recorded>,
}

/// Serves canned JSON per `(method, path)`. Responses registered for the
/// same route are served in order; the last one repeats.
#[derive(Clone)]
pub struct FakeGoogle {
    base: String,
    state: Arc<Mutex<State>>,
}

impl FakeGoogle {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(State::default()));

        let shared = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let shared = shared.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, shared).await;
                });
            }
        });

        Self { base, state }
    }

    pub fn url(&self) -> &str {
        &self.base
    }

    pub fn route(&self, method: &str, path: &str, status: u16, body: Value) {
        self.state
            .lock()
            .unwrap()
            .routes
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push((status, body));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    /// Endpoints pointing every API at this server.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            gmail: format!("{}/gmail/v1", self.base),
            docs: format!("{}/docs/v1", self.base),
            drive: format!("{}/drive/v3", self.base),
            sheets: format!("{}/sheets/v4", self.base),
            search: format!("{}/customsearch/v1", self.base),
            oauth_authorize: format!("{}/o/oauth2/auth", self.base),
            oauth_token: format!("{}/token", self.base),
        }
    }
}

async fn serve(socket: tokio::net::TcpStream, state: Arc<Mutex<State>>) -> std::io::Result<()> {
    let mut reader = BufReader::new(socket);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("authorization") {
                authorization = Some(value.to_string());
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), parse_query(q)),
        None => (target.clone(), HashMap::new()),
    };

    let (status, response) = {
        let mut state = state.lock().unwrap();
        state.requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            query,
            authorization,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        match state.routes.get_mut(&(method, path)) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => (404, json!({"error": {"code": 404, "message": "Requested entity was not found."}})),
        }
    };

    let payload = response.to_string();
    let reply = format!(
        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    let mut socket = reader.into_inner();
    socket.write_all(reply.as_bytes()).await?;
    socket.shutdown().await
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let v = urlencoding::decode(&v.replace('+', " ")).ok()?.into_owned();
            Some((k.to_string(), v))
        })
        .collect()
}

// ── Session fixtures ────────────────────────────────────────────────────────

pub fn config(root: &Path, server: &FakeGoogle) -> Config {
    let mut config = Config::with_root(root);
    config.endpoints = server.endpoints();
    config
}

pub fn write_client_secret(root: &Path, server: &FakeGoogle) {
    let secret = json!({
        "installed": {
            "client_id": "test-client.apps.googleusercontent.com",
            "client_secret": "test-secret",
            "auth_uri": format!("{}/o/oauth2/auth", server.url()),
            "token_uri": format!("{}/token", server.url())
        }
    });
    std::fs::write(root.join("credentials.json"), secret.to_string()).unwrap();
}

/// Persist a token with every tool scope, expiring `expires_in_secs` from now.
pub fn write_token(root: &Path, server: &FakeGoogle, access_token: &str, expires_in_secs: i64, refresh_token: &str) {
    let token = json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "Bearer",
        "scopes": scopes::ALL,
        "expiry": (chrono::Utc::now() + chrono::Duration::seconds(expires_in_secs)).to_rfc3339(),
        "client_id": "test-client.apps.googleusercontent.com",
        "client_secret": "test-secret",
        "token_uri": format!("{}/token", server.url())
    });
    std::fs::write(root.join("token.json"), token.to_string()).unwrap();
}

/// Session with a valid token already on disk.
pub async fn authorized_session() -> (tempfile::TempDir, FakeGoogle, Session) {
    let dir = tempfile::tempdir().unwrap();
    let server = FakeGoogle::start().await;
    write_token(dir.path(), &server, "ya29.valid", 3600, "1//refresh");
    let session = Session::from_config(config(dir.path(), &server)).unwrap();
    (dir, server, session)
}

pub fn success_json(outcome: ceangal::ToolOutcome) -> Value {
    let result = outcome.expect("tool returned a configuration error");
    let value = result.to_json();
    assert_eq!(value["status"], "success", "unexpected result: {}", value);
    value
}

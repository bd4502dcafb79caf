//! Interactive Consent
//!
//! First-run authorization: a loopback listener on an ephemeral port receives
//! the OAuth redirect after the user consents in their browser.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::client_secret::ClientSecret;
use super::provider::google::{generate_code_challenge, generate_code_verifier};
use super::provider::{OAuthProvider, OAuthTokens};
use super::scopes::ScopeSet;
use super::AuthError;

/// Source of fresh tokens when nothing persisted can be used.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn obtain(&self, client: &ClientSecret, scopes: &ScopeSet) -> Result<OAuthTokens, AuthError>;
}

/// Opens the authorization URL for the user.
pub type BrowserLauncher = Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

pub struct LoopbackConsent {
    provider: Arc<dyn OAuthProvider>,
    timeout: Duration,
    launcher: BrowserLauncher,
}

impl LoopbackConsent {
    pub fn new(provider: Arc<dyn OAuthProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            launcher: Arc::new(|url: &str| open::that(url).map_err(|e| e.to_string())),
        }
    }

    pub fn with_launcher(mut self, launcher: BrowserLauncher) -> Self {
        self.launcher = launcher;
        self
    }
}

#[async_trait]
impl ConsentFlow for LoopbackConsent {
    async fn obtain(&self, client: &ClientSecret, scopes: &ScopeSet) -> Result<OAuthTokens, AuthError> {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| AuthError::Consent(format!("Failed to bind local server: {}", e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| AuthError::Consent(format!("Failed to get local address: {}", e)))?;

        let redirect_uri = format!("http://127.0.0.1:{}", local_addr.port());
        info!("OAuth callback server listening on {}", redirect_uri);

        let state = generate_state();
        let auth_url = self
            .provider
            .authorize_url(client, scopes, &state, &code_challenge, &redirect_uri);

        info!("Opening browser for {} authorization", self.provider.name());
        if let Err(e) = (self.launcher)(&auth_url) {
            warn!("Failed to open browser automatically: {}. Please visit: {}", e, auth_url);
        }

        let code = tokio::time::timeout(self.timeout, wait_for_code(&listener, &state))
            .await
            .map_err(|_| {
                AuthError::Consent(format!(
                    "Authorization timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })??;

        self.provider
            .exchange_code(client, &code, &code_verifier, &redirect_uri)
            .await
            .map_err(AuthError::TokenEndpoint)
    }
}

/// Time a callback connection gets to send its request line
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept connections until the OAuth redirect arrives.
///
/// Each connection is served on its own task, so an idle one (a browser
/// preconnect, say) cannot hold up the redirect behind it.
async fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Result<String, AuthError> {
    let (tx, mut rx) = mpsc::channel::<Result<String, AuthError>>(1);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted
                    .map_err(|e| AuthError::Consent(format!("Callback server error: {}", e)))?;
                debug!("Callback connection from {}", peer);

                let tx = tx.clone();
                let expected_state = expected_state.to_string();
                tokio::spawn(async move {
                    if let Some(outcome) = handle_callback(socket, &expected_state).await {
                        let _ = tx.send(outcome).await;
                    }
                });
            }
            Some(outcome) = rx.recv() => return outcome,
        }
    }
}

/// Serve one callback connection. `None` when it was not the OAuth redirect.
async fn handle_callback(mut socket: TcpStream, expected_state: &str) -> Option<Result<String, AuthError>> {
    let mut request_line = String::new();
    let read = {
        let mut reader = BufReader::new(&mut socket);
        tokio::time::timeout(REQUEST_READ_TIMEOUT, reader.read_line(&mut request_line)).await
    };
    match read {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            debug!("Dropping callback connection: {}", e);
            return None;
        }
        Err(_) => {
            debug!("Dropping idle callback connection");
            return None;
        }
    }

    // "GET /path?query HTTP/1.1"
    let target = request_line.split_whitespace().nth(1).unwrap_or("");
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
    let params = parse_query_params(query);

    let (status, html, outcome) = if let (Some(code), Some(state)) = (params.get("code"), params.get("state")) {
        if state != expected_state {
            (
                "400 Bad Request",
                callback_html("Invalid state parameter. Please try again."),
                Some(Err(AuthError::Consent("State mismatch".to_string()))),
            )
        } else {
            (
                "200 OK",
                callback_html("Authorization complete. You can close this tab."),
                Some(Ok(code.clone())),
            )
        }
    } else if let Some(error) = params.get("error") {
        let desc = params
            .get("error_description")
            .map(String::as_str)
            .unwrap_or("Unknown error");
        (
            "400 Bad Request",
            callback_html(&format!("Error: {} - {}", error, desc)),
            Some(Err(AuthError::Consent(format!("{}: {}", error, desc)))),
        )
    } else {
        debug!("Ignoring unrelated request on callback port: {}", target);
        ("404 Not Found", String::new(), None)
    };

    if let Err(e) = send_response(&mut socket, status, html).await {
        warn!("Failed to answer callback request: {}", e);
    }
    outcome
}

/// Random state string for CSRF protection
fn generate_state() -> String {
    use rand::Rng;
    let bytes: [u8; 16] = rand::rngs::OsRng.gen();
    hex::encode(bytes)
}

fn parse_query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            let value = value.replace('+', " ");
            let decoded = urlencoding::decode(&value).ok()?.into_owned();
            Some((key.to_string(), decoded))
        })
        .collect()
}

async fn send_response(socket: &mut TcpStream, status: &str, html: String) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        html.len(),
        html
    );
    socket.write_all(response.as_bytes()).await?;
    socket.flush().await
}

fn callback_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>ceangal</title></head>
<body style="font-family: sans-serif; text-align: center; margin-top: 4rem;">
    <h1>ceangal</h1>
    <p>{}</p>
</body>
</html>"#,
        message
    )
}

//! Password-grant token fetch
//!
//! One POST to the realm's token endpoint per call. The caller decides what
//! to do with a failure; nothing here retries, caches, or tracks expiry.

use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use tracing::debug;

use crate::constants::PASSWORD_GRANT;
use crate::error::{Error, Result};
use crate::secrets::Credentials;

/// Opaque bearer token issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(Secret<String>);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }

    /// The raw bearer string.
    pub fn expose(&self) -> &str {
        self.0.expose()
    }
}

/// Successful token endpoint response.
///
/// Only `access_token` is required; Keycloak also sends refresh and id
/// tokens which are ignored.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Client bound to one token endpoint and one set of credentials.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl TokenClient {
    /// Build a client whose requests give up after `request_timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Credentials,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Request(format!("building HTTP client: {e}")))?;
        Ok(Self::with_http_client(http, endpoint, credentials))
    }

    pub fn with_http_client(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            credentials,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Exchange the stored credentials for a fresh access token.
    pub async fn fetch_token(&self) -> Result<AccessToken> {
        let creds = &self.credentials;
        let response = self
            .http
            .post(&self.endpoint)
            .form(&[
                ("grant_type", PASSWORD_GRANT),
                ("client_id", creds.client.id.as_str()),
                ("client_secret", creds.client.secret.expose().as_str()),
                ("username", creds.user.id.as_str()),
                ("password", creds.user.secret.expose().as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Request(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Request(format!("reading token response failed: {e}")))?;
        let parsed: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Parse(format!("token response is not valid JSON: {e}")))?;

        let token = parsed
            .access_token
            .ok_or_else(|| Error::Parse("token response has no access_token field".into()))?;

        debug!(
            token_type = parsed.token_type.as_deref().unwrap_or("unknown"),
            expires_in = ?parsed.expires_in,
            "token endpoint issued access token"
        );
        Ok(AccessToken::new(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Form, State};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use tokio::net::TcpListener;

    use crate::constants::{DEFAULT_REALM, token_endpoint};
    use crate::secrets::MemoryStore;

    /// Requests seen by the mock identity endpoint
    #[derive(Clone, Default)]
    struct Seen {
        forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
        content_types: Arc<Mutex<Vec<String>>>,
    }

    #[derive(Clone)]
    struct MockState {
        status: StatusCode,
        body: &'static str,
        seen: Seen,
    }

    async fn token_handler(
        State(state): State<MockState>,
        headers: HeaderMap,
        Form(form): Form<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if let Some(ct) = headers.get(header::CONTENT_TYPE) {
            state
                .seen
                .content_types
                .lock()
                .unwrap()
                .push(ct.to_str().unwrap_or_default().to_owned());
        }
        state.seen.forms.lock().unwrap().push(form);
        (
            state.status,
            [(header::CONTENT_TYPE, "application/json")],
            state.body,
        )
    }

    /// Start a mock Keycloak token endpoint; returns its base URL.
    async fn start_identity_server(status: StatusCode, body: &'static str) -> (String, Seen) {
        let seen = Seen::default();
        let state = MockState {
            status,
            body,
            seen: seen.clone(),
        };
        let app = axum::Router::new()
            .route(
                "/auth/realms/trendminer/protocol/openid-connect/token",
                post(token_handler),
            )
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn test_credentials(base_url: &str) -> Credentials {
        let store = MemoryStore::new()
            .with(base_url, "wdanielsclient", "client-secret")
            .with(base_url, "wdaniels", "user-password");
        Credentials::load(&store, base_url, "wdanielsclient", "wdaniels").unwrap()
    }

    fn test_client(base_url: &str) -> TokenClient {
        TokenClient::new(
            token_endpoint(base_url, DEFAULT_REALM),
            test_credentials(base_url),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn token_response_ignores_extra_fields() {
        let json = r#"{"access_token":"eyJ.a.b","expires_in":300,"refresh_expires_in":1800,
            "refresh_token":"eyJ.r","token_type":"Bearer","not-before-policy":0,"scope":"profile"}"#;
        let parsed: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token.as_deref(), Some("eyJ.a.b"));
        assert_eq!(parsed.expires_in, Some(300));
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJ.secret.value");
        assert_eq!(token.expose(), "eyJ.secret.value");
        assert!(!format!("{token:?}").contains("eyJ.secret.value"));
    }

    #[tokio::test]
    async fn fetch_returns_exact_access_token() {
        let (base, _seen) = start_identity_server(
            StatusCode::OK,
            r#"{"access_token":"T1","token_type":"Bearer","expires_in":300}"#,
        )
        .await;

        let token = test_client(&base).fetch_token().await.unwrap();
        assert_eq!(token.expose(), "T1");
    }

    #[tokio::test]
    async fn fetch_sends_password_grant_form() {
        let (base, seen) =
            start_identity_server(StatusCode::OK, r#"{"access_token":"T1"}"#).await;

        test_client(&base).fetch_token().await.unwrap();

        let forms = seen.forms.lock().unwrap();
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form["grant_type"], "password");
        assert_eq!(form["client_id"], "wdanielsclient");
        assert_eq!(form["client_secret"], "client-secret");
        assert_eq!(form["username"], "wdaniels");
        assert_eq!(form["password"], "user-password");
        assert_eq!(form.len(), 5);

        let content_types = seen.content_types.lock().unwrap();
        assert_eq!(content_types[0], "application/x-www-form-urlencoded");
    }

    #[tokio::test]
    async fn non_success_status_is_http_error_without_retry() {
        let (base, seen) = start_identity_server(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#,
        )
        .await;

        let err = test_client(&base).fetch_token().await.unwrap_err();
        match &err {
            Error::Http { status, body } => {
                assert_eq!(*status, 401);
                assert!(body.contains("invalid_grant"), "got body: {body}");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
        assert!(err.is_auth_rejection());
        assert_eq!(seen.forms.lock().unwrap().len(), 1, "must not retry");
    }

    #[tokio::test]
    async fn server_error_is_http_error() {
        let (base, seen) =
            start_identity_server(StatusCode::SERVICE_UNAVAILABLE, "upstream down").await;

        let err = test_client(&base).fetch_token().await.unwrap_err();
        assert!(matches!(err, Error::Http { status: 503, .. }), "got {err:?}");
        assert_eq!(seen.forms.lock().unwrap().len(), 1, "must not retry");
    }

    #[tokio::test]
    async fn missing_access_token_is_parse_error() {
        let (base, _seen) =
            start_identity_server(StatusCode::OK, r#"{"token_type":"Bearer"}"#).await;

        let err = test_client(&base).fetch_token().await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn non_json_body_is_parse_error() {
        let (base, _seen) = start_identity_server(StatusCode::OK, "<html>login</html>").await;

        let err = test_client(&base).fetch_token().await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {err:?}");
    }

    /// Serve one response whose body stops short of its Content-Length.
    async fn start_truncating_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Drain the request so closing the socket is a clean FIN.
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending a request");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length: usize = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while request.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\n\
                      content-type: application/json\r\n\
                      content-length: 200\r\n\
                      \r\n\
                      {\"access_token\":\"T",
                )
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn body_cut_off_mid_transfer_is_request_error() {
        let base = start_truncating_server().await;

        let err = test_client(&base).fetch_token().await.unwrap_err();
        assert!(matches!(err, Error::Request(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = format!("http://{addr}");
        let err = test_client(&base).fetch_token().await.unwrap_err();
        assert!(matches!(err, Error::Request(_)), "got {err:?}");
    }
}

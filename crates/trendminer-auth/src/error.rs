//! Error types for token endpoint and secret store operations

/// Errors from a single token fetch or credential lookup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body had no usable `access_token`.
    #[error("invalid token response: {0}")]
    Parse(String),

    #[error("secret store error: {0}")]
    SecretStore(String),
}

impl Error {
    /// Whether the identity provider rejected the credentials themselves.
    ///
    /// Keycloak answers a bad password grant with 401, and with 400
    /// `invalid_grant` or `unauthorized_client` for a bad client.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Error::Http { status: 400 | 401 | 403, .. })
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

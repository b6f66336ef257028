//! TrendMiner identity provider defaults
//!
//! These identify the server, realm and accounts the launcher authenticates
//! as. They are not secrets; the client secret and user password live in the
//! OS keyring under the server URL.

/// TrendMiner server the notebook kernels talk to
pub const DEFAULT_SERVER_URL: &str = "https://cs.trendminer.net";

/// Keycloak realm serving TrendMiner tokens
pub const DEFAULT_REALM: &str = "trendminer";

/// Confidential client registered for notebook access
pub const DEFAULT_CLIENT_ID: &str = "wdanielsclient";

/// End user the token is issued for
pub const DEFAULT_USERNAME: &str = "wdaniels";

/// OAuth2 grant type exchanged at the token endpoint
pub const PASSWORD_GRANT: &str = "password";

/// Build the OpenID Connect token endpoint for a realm on a server.
pub fn token_endpoint(server_url: &str, realm: &str) -> String {
    format!(
        "{}/auth/realms/{realm}/protocol/openid-connect/token",
        server_url.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_matches_trendminer_realm() {
        assert_eq!(
            token_endpoint(DEFAULT_SERVER_URL, DEFAULT_REALM),
            "https://cs.trendminer.net/auth/realms/trendminer/protocol/openid-connect/token"
        );
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        assert_eq!(
            token_endpoint("http://127.0.0.1:8080/", "demo"),
            "http://127.0.0.1:8080/auth/realms/demo/protocol/openid-connect/token"
        );
    }
}

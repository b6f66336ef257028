//! TrendMiner identity provider authentication
//!
//! Exchanges stored client and user credentials for a bearer token using
//! the OAuth2 password grant against the Keycloak realm that fronts a
//! TrendMiner server. This crate has no knowledge of refresh scheduling;
//! it performs exactly one request per call and never retries.
//!
//! Credential flow:
//! 1. `Credentials::load()` reads the client and user secrets from a `SecretStore`
//! 2. `TokenClient::new()` binds them to the realm's token endpoint
//! 3. `TokenClient::fetch_token()` POSTs the password grant and returns an `AccessToken`

pub mod constants;
pub mod error;
pub mod secrets;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use secrets::{Credential, Credentials, KeyringStore, MemoryStore, SecretStore};
pub use token::{AccessToken, TokenClient, TokenResponse};

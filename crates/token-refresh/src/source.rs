//! Token source abstraction
//!
//! The refresh task only needs "give me a new token". Keeping that behind a
//! trait lets tests script success and failure sequences without a network.

use std::future::Future;
use std::pin::Pin;

use trendminer_auth::{AccessToken, Result, TokenClient};

/// Anything that can produce a fresh access token.
///
/// Uses a boxed future so the task can hold an `Arc<dyn TokenSource>`.
pub trait TokenSource: Send + Sync {
    fn fetch_token(&self) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + '_>>;
}

impl TokenSource for TokenClient {
    fn fetch_token(&self) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + '_>> {
        Box::pin(TokenClient::fetch_token(self))
    }
}

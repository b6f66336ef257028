//! Launcher error types

use thiserror::Error;

/// Failures after the initial token has been obtained.
///
/// Token fetch and credential errors come from `trendminer_auth` and are
/// wrapped with context in `main`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("failed waiting for notebook server: {0}")]
    Wait(String),

    #[error("token file error: {0}")]
    TokenFile(String),

    #[error("token slot is empty")]
    NoToken,
}

/// Result alias using launcher Error
pub type Result<T> = std::result::Result<T, Error>;

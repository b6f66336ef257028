//! Client and user credentials from the OS keyring
//!
//! Secrets are stored under the TrendMiner server URL as the keyring
//! service, with the client id and the username as account names. They are
//! read once at startup and stay fixed for the life of the process.

use std::collections::HashMap;

use common::Secret;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Lookup of secrets by (service, account).
///
/// `Ok(None)` means the store answered but holds no entry; `Err` means the
/// store itself could not be queried.
pub trait SecretStore: Send + Sync {
    fn get(&self, service: &str, account: &str) -> Result<Option<Secret<String>>>;
}

/// Platform credential store: macOS Keychain, Windows Credential Manager,
/// or the freedesktop Secret Service on Linux (the same entries Python's
/// `keyring` writes), cached in the kernel keyring.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl SecretStore for KeyringStore {
    fn get(&self, service: &str, account: &str) -> Result<Option<Secret<String>>> {
        let entry = keyring::Entry::new(service, account)
            .map_err(|e| Error::SecretStore(format!("opening entry {account}@{service}: {e}")))?;
        match entry.get_password() {
            Ok(value) => Ok(Some(Secret::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::SecretStore(format!(
                "reading entry {account}@{service}: {e}"
            ))),
        }
    }
}

/// In-memory store filled through `with()`. Stands in for the keyring in
/// tests, including the launcher's.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<(String, String), Secret<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any previous value for the same pair.
    pub fn with(mut self, service: &str, account: &str, secret: &str) -> Self {
        self.entries.insert(
            (service.to_owned(), account.to_owned()),
            Secret::new(secret.to_owned()),
        );
        self
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, service: &str, account: &str) -> Result<Option<Secret<String>>> {
        Ok(self
            .entries
            .get(&(service.to_owned(), account.to_owned()))
            .cloned())
    }
}

/// An identifier and its secret.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: String,
    pub secret: Secret<String>,
}

/// The two credentials a password grant needs.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Confidential client (client_id / client_secret)
    pub client: Credential,
    /// End user (username / password)
    pub user: Credential,
}

impl Credentials {
    /// Read both secrets from `store`, keyed by `service_url`.
    ///
    /// A missing entry is not fatal here: it is sent as an empty secret and
    /// the identity provider rejects the grant, which surfaces as an
    /// `Error::Http` on the first fetch.
    pub fn load(
        store: &dyn SecretStore,
        service_url: &str,
        client_id: &str,
        username: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: lookup(store, service_url, client_id)?,
            user: lookup(store, service_url, username)?,
        })
    }
}

fn lookup(store: &dyn SecretStore, service: &str, account: &str) -> Result<Credential> {
    let secret = match store.get(service, account)? {
        Some(secret) if !secret.is_empty() => {
            debug!(service, account, "loaded secret from store");
            secret
        }
        Some(_) => {
            warn!(service, account, "secret store entry is empty");
            Secret::empty()
        }
        None => {
            warn!(service, account, "no secret store entry, sending empty secret");
            Secret::empty()
        }
    };
    Ok(Credential {
        id: account.to_owned(),
        secret,
    })
}

//! Current token slot
//!
//! Single-writer, multi-reader cell backed by a `watch` channel. Writers
//! replace the whole value, so readers see either the previous token or the
//! new one, never a mix. The slot is never cleared once populated.

use tokio::sync::watch;
use trendminer_auth::AccessToken;

/// Shared holder of the most recently fetched token.
///
/// Cloning the slot shares the same underlying channel.
#[derive(Debug, Clone)]
pub struct TokenSlot {
    tx: watch::Sender<Option<AccessToken>>,
}

impl TokenSlot {
    /// A slot that has not seen a token yet.
    pub fn empty() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }

    /// A slot populated with the bootstrap token.
    pub fn new(initial: AccessToken) -> Self {
        Self {
            tx: watch::Sender::new(Some(initial)),
        }
    }

    /// Replace the current token and wake subscribers.
    pub fn publish(&self, token: AccessToken) {
        self.tx.send_replace(Some(token));
    }

    /// Snapshot of the current token.
    pub fn current(&self) -> Option<AccessToken> {
        self.tx.borrow().clone()
    }

    pub fn is_populated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Receiver that is notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Option<AccessToken>> {
        self.tx.subscribe()
    }
}

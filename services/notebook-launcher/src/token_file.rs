//! Token file mirror
//!
//! Keeps a file in sync with the current token slot so a running notebook
//! server can pick up refreshed tokens without restarting. All writes use
//! temp-file + rename, so readers see either the old or the new token. The
//! file is only ever written, never read back on startup.

use std::path::{Path, PathBuf};

use token_refresh::{AccessToken, TokenSlot};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Write the token to `path` atomically.
///
/// The temp file is created owner-only, so the token is never readable by
/// other users, not even before the rename.
pub async fn write_token(path: &Path, token: &AccessToken) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::TokenFile(format!("{} has no file name", path.display())))?;
    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    // A leftover or planted entry at the temp name is removed; create_new
    // then refuses to follow anything recreated in its place.
    match tokio::fs::remove_file(&tmp_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(Error::TokenFile(format!(
                "removing stale {}: {e}",
                tmp_path.display()
            )));
        }
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(&tmp_path)
        .await
        .map_err(|e| Error::TokenFile(format!("creating {}: {e}", tmp_path.display())))?;
    file.write_all(token.expose().as_bytes())
        .await
        .map_err(|e| Error::TokenFile(format!("writing {}: {e}", tmp_path.display())))?;
    file.flush()
        .await
        .map_err(|e| Error::TokenFile(format!("writing {}: {e}", tmp_path.display())))?;
    drop(file);

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::TokenFile(format!("renaming into {}: {e}", path.display())))?;

    debug!(path = %path.display(), "wrote token file");
    Ok(())
}

/// Write whatever the slot currently holds.
pub async fn write_current(path: &Path, slot: &TokenSlot) -> Result<()> {
    let token = slot.current().ok_or(Error::NoToken)?;
    write_token(path, &token).await
}

/// Spawn a task that rewrites `path` every time a new token is published.
///
/// Write failures are logged and the mirror keeps running; the environment
/// variable handed to the notebook server is unaffected either way.
pub fn spawn_mirror(
    path: PathBuf,
    mut rx: watch::Receiver<Option<AccessToken>>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(path = %path.display(), "token file mirror started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        // Slot dropped; nothing more will be published.
                        break;
                    }
                }
            }

            let Some(token) = rx.borrow_and_update().clone() else {
                continue;
            };
            if let Err(e) = write_token(&path, &token).await {
                warn!(error = %e, "failed to update token file");
            }
        }
        debug!("token file mirror stopped");
    })
}

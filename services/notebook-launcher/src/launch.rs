//! Notebook server process
//!
//! The child inherits the launcher's environment plus the server URL and the
//! token current at spawn time. The launcher then waits for it; the process
//! lifetime of the child is the lifetime of the whole program.

use std::process::ExitStatus;

use token_refresh::{AccessToken, TokenSlot};
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::LaunchConfig;
use crate::error::{Error, Result};

/// Environment variable pointing the child at the token file mirror
pub const TOKEN_FILE_VAR: &str = "KERNEL_USER_TOKEN_FILE";

/// Build the notebook server command without starting it.
pub fn build_command(launch: &LaunchConfig, server_url: &str, token: &AccessToken) -> Command {
    let mut cmd = Command::new(&launch.program);
    cmd.args(&launch.args)
        .env(&launch.server_url_var, server_url)
        .env(&launch.token_var, token.expose())
        .kill_on_drop(true);
    if let Some(path) = &launch.token_file {
        cmd.env(TOKEN_FILE_VAR, path);
    }
    cmd
}

/// Start the notebook server with the slot's current token.
pub fn spawn(launch: &LaunchConfig, server_url: &str, slot: &TokenSlot) -> Result<Child> {
    let token = slot.current().ok_or(Error::NoToken)?;
    let child = build_command(launch, server_url, &token)
        .spawn()
        .map_err(|e| Error::Spawn {
            program: launch.program.clone(),
            reason: e.to_string(),
        })?;
    info!(
        program = %launch.program,
        args = ?launch.args,
        pid = child.id(),
        "notebook server started"
    );
    Ok(child)
}

/// Wait for the notebook server to exit.
///
/// An interrupt or SIGTERM delivered to the launcher stops the notebook
/// server and returns its final status, so an operator can end the whole
/// program with either signal.
pub async fn supervise(mut child: Child) -> Result<ExitStatus> {
    let mut watch_interrupt = true;
    loop {
        tokio::select! {
            status = child.wait() => {
                return status.map_err(|e| Error::Wait(e.to_string()));
            }
            interrupt = tokio::signal::ctrl_c(), if watch_interrupt => {
                match interrupt {
                    Ok(()) => return stop(&mut child, "interrupt").await,
                    Err(e) => {
                        warn!(error = %e, "cannot listen for interrupts");
                        watch_interrupt = false;
                    }
                }
            }
            _ = terminate_signal() => return stop(&mut child, "SIGTERM").await,
        }
    }
}

/// Kill the child after a shutdown signal and reap it.
async fn stop(child: &mut Child, signal: &str) -> Result<ExitStatus> {
    info!(signal, "shutdown signal received, stopping notebook server");
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "failed to kill notebook server");
    }
    child.wait().await.map_err(|e| Error::Wait(e.to_string()))
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}

/// Map the child's exit status to the launcher's exit code.
pub fn exit_code(status: ExitStatus) -> std::process::ExitCode {
    match status.code() {
        Some(code) => std::process::ExitCode::from(u8::try_from(code).unwrap_or(1)),
        // Killed by a signal
        None => std::process::ExitCode::FAILURE,
    }
}

/// Tests that run `supervise` share the process-wide signal handlers; a
/// signal sent by one of them must not stop another test's child.
#[cfg(test)]
pub(crate) static SUPERVISE_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

//! # Process exit signals.
//!
//! [`wait_for_exit_signal`] completes when the process is asked to exit, so the
//! caller can run teardown before it does.
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`.
//! **Elsewhere:** Ctrl-C.

/// Waits for an exit signal and returns its name.
#[cfg(unix)]
pub async fn wait_for_exit_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for an exit signal and returns its name.
#[cfg(not(unix))]
pub async fn wait_for_exit_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

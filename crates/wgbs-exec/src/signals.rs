//! Translation of terminal signals into cancellation.
use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cancel `token` on the first SIGINT, SIGTERM or SIGHUP.
///
/// The task resolves to the received signal number, or `None` when `token`
/// was cancelled by someone else first. Handlers are installed before this
/// returns, so a signal arriving right after the call is not lost.
#[cfg(unix)]
pub fn listen_for_shutdown(token: CancellationToken) -> io::Result<JoinHandle<Option<i32>>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut hup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        let signum = tokio::select! {
            _ = token.cancelled() => return None,
            _ = int.recv() => libc::SIGINT,
            _ = term.recv() => libc::SIGTERM,
            _ = hup.recv() => libc::SIGHUP,
        };
        warn!(target: "wgbs.exec.signals", signum, "shutdown signal received");
        token.cancel();
        Some(signum)
    }))
}

#[cfg(not(unix))]
pub fn listen_for_shutdown(token: CancellationToken) -> io::Result<JoinHandle<Option<i32>>> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => None,
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(target: "wgbs.exec.signals", error = %e, "cannot listen for ctrl-c");
                    return None;
                }
                warn!(target: "wgbs.exec.signals", "interrupt received");
                token.cancel();
                Some(2)
            }
        }
    }))
}

// components/media_pipeline/src/supervisor.rs
use crate::children::ChildProcessSet;
use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Resolves on the next interrupt: Ctrl-C everywhere, plus SIGTERM and SIGHUP on unix.
pub async fn shutdown_signal() -> io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    #[cfg(unix)]
    {
        let mut term = signal(SignalKind::terminate())?;
        let mut hup = signal(SignalKind::hangup())?;
        tokio::select! {
            result = &mut ctrl_c => result?,
            _ = term.recv() => {},
            _ = hup.recv() => {},
        }
        return Ok(());
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await
    }
}

/// Turns interrupts into cancellation of the run and termination of its children.
#[derive(Clone)]
pub struct Supervisor {
    children: ChildProcessSet,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(children: ChildProcessSet, cancel: CancellationToken) -> Self {
        Self { children, cancel }
    }

    /// Stop the run: cancel the token and ask every tracked child to terminate.
    ///
    /// Repeated calls only re-send termination requests; returns how many
    /// children were still tracked.
    pub fn interrupt(&self) -> usize {
        if !self.cancel.is_cancelled() {
            warn!("interrupted, stopping child processes");
        }
        self.cancel.cancel();
        self.children.terminate_all()
    }

    /// Listen for interrupts for the rest of the process lifetime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = shutdown_signal().await {
                    warn!("cannot listen for interrupt signals: {}", e);
                    return;
                }
                self.interrupt();
            }
        })
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

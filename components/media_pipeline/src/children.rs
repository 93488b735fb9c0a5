// components/media_pipeline/src/children.rs
//! Bookkeeping for the child processes of one run.
//!
//! Every spawned process is handed to [`ChildProcessSet::track`], which moves
//! it into a watcher task. The watcher waits for the process and kills it as
//! soon as its termination token fires, then deregisters it. The set itself
//! only holds stage names, pids and tokens, so terminating everything is a
//! synchronous, lock-and-cancel operation that can run from any task.

use crate::error::{PipelineError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Downloader,
    Player,
    Recorder,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Downloader => write!(f, "downloader"),
            Stage::Player => write!(f, "player"),
            Stage::Recorder => write!(f, "recorder"),
        }
    }
}

#[derive(Clone, Default)]
pub struct ChildProcessSet {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    drained: Notify,
}

#[derive(Default)]
struct State {
    next_id: u64,
    terminating: bool,
    children: HashMap<u64, TrackedChild>,
}

struct TrackedChild {
    stage: Stage,
    pid: Option<u32>,
    terminate: CancellationToken,
}

/// Exit of a tracked child, as observed by its watcher.
pub struct StageHandle {
    stage: Stage,
    pid: Option<u32>,
    exit: JoinHandle<std::io::Result<ExitStatus>>,
}

impl StageHandle {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub async fn wait(self) -> Result<ExitStatus> {
        let stage = self.stage;
        match self.exit.await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(source)) => Err(PipelineError::io(format!("waiting for {}", stage), source)),
            Err(join) => Err(PipelineError::io(
                format!("watching {}", stage),
                std::io::Error::new(std::io::ErrorKind::Other, join),
            )),
        }
    }
}

impl ChildProcessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly spawned child and start watching it.
    ///
    /// Take any piped stdio off the child before calling this.
    pub fn track(&self, stage: Stage, mut child: Child) -> StageHandle {
        let pid = child.id();
        let terminate = CancellationToken::new();

        let id = {
            let mut state = self.shared.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.children.insert(
                id,
                TrackedChild {
                    stage,
                    pid,
                    terminate: terminate.clone(),
                },
            );
            // A child spawned after teardown started is terminated right away.
            if state.terminating {
                terminate.cancel();
            }
            id
        };
        debug!(%stage, ?pid, "tracking child process");

        let set = self.clone();
        let exit = tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = terminate.cancelled() => {
                    debug!(%stage, ?pid, "killing child process");
                    if let Err(e) = child.start_kill() {
                        warn!(%stage, ?pid, "failed to kill child process: {}", e);
                    }
                    child.wait().await
                }
            };
            set.forget(id);
            status
        });

        StageHandle { stage, pid, exit }
    }

    /// Request termination of every tracked child. Safe to call repeatedly.
    ///
    /// Returns how many children were asked to stop.
    pub fn terminate_all(&self) -> usize {
        let mut state = self.shared.state.lock();
        state.terminating = true;
        for child in state.children.values() {
            if !child.terminate.is_cancelled() {
                info!(stage = %child.stage, pid = ?child.pid, "requesting termination");
            }
            child.terminate.cancel();
        }
        state.children.len()
    }

    /// Terminate everything and wait up to `grace` for the watchers to confirm.
    ///
    /// Returns `true` if the set drained in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if self.terminate_all() == 0 {
            return true;
        }
        tokio::time::timeout(grace, self.drained()).await.is_ok()
    }

    /// Resolves once no child is tracked.
    pub async fn drained(&self) {
        loop {
            let notified = self.shared.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stages and pids currently tracked, in registration order.
    pub fn stages(&self) -> Vec<(Stage, Option<u32>)> {
        let state = self.shared.state.lock();
        let mut tracked: Vec<_> = state.children.iter().collect();
        tracked.sort_by_key(|(id, _)| **id);
        tracked
            .into_iter()
            .map(|(_, child)| (child.stage, child.pid))
            .collect()
    }

    fn forget(&self, id: u64) {
        let now_empty = {
            let mut state = self.shared.state.lock();
            if let Some(child) = state.children.remove(&id) {
                debug!(stage = %child.stage, pid = ?child.pid, "child process exited");
            }
            state.children.is_empty()
        };
        if now_empty {
            self.shared.drained.notify_waiters();
        }
    }
}

// components/media_pipeline/src/fanout.rs
//! The tee stage of play-while-downloading.
//!
//! Bytes read from the downloader are written to the file inline, so a slow
//! disk slows the downloader down. The player is fed through a bounded channel
//! by a separate task, and a player reading at playback speed slows the
//! download the same way. A player that quits, or accepts nothing for the
//! stall timeout, is cut off and the file keeps receiving everything.

use crate::error::{PipelineError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const CHUNK_SIZE: usize = 64 * 1024;
pub const PLAYER_BUFFER_CHUNKS: usize = 256;
/// How long a full player buffer may stay full before playback is dropped.
pub const PLAYER_STALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    chunk_size: usize,
    player_buffer: usize,
    stall_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Bytes written to the file
    pub bytes_written: u64,
    /// Bytes the player accepted
    pub bytes_forwarded: u64,
    /// Whether forwarding to the player stopped before the end of the stream
    pub player_detached: bool,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            player_buffer: PLAYER_BUFFER_CHUNKS,
            stall_timeout: PLAYER_STALL_TIMEOUT,
        }
    }
}

struct PlayerBranch {
    sender: mpsc::Sender<Vec<u8>>,
    task: JoinHandle<()>,
}

impl FanOut {
    pub fn new(chunk_size: usize, player_buffer: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            player_buffer: player_buffer.max(1),
            stall_timeout: PLAYER_STALL_TIMEOUT,
        }
    }

    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    /// Copy `source` to `file` until end of stream, mirroring it to `player` until it quits or stalls.
    pub async fn run<R, F, P>(
        &self,
        mut source: R,
        mut file: F,
        player: Option<P>,
        cancel: &CancellationToken,
    ) -> Result<FanOutReport>
    where
        R: AsyncRead + Unpin,
        F: AsyncWrite + Unpin,
        P: AsyncWrite + Unpin + Send + 'static,
    {
        let forwarded = Arc::new(AtomicU64::new(0));
        let mut branch = player.map(|sink| self.spawn_player_branch(sink, forwarded.clone()));
        let mut report = FanOutReport::default();
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Interrupted),
                read = source.read(&mut buf) => {
                    read.map_err(|e| PipelineError::io("reading downloader output", e))?
                }
            };
            if n == 0 {
                break;
            }

            file.write_all(&buf[..n])
                .await
                .map_err(|e| PipelineError::io("writing output file", e))?;
            report.bytes_written += n as u64;

            let Some(player) = &branch else { continue };
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Interrupted),
                sent = tokio::time::timeout(self.stall_timeout, player.sender.send(buf[..n].to_vec())) => sent,
            };
            match sent {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    info!("player stopped reading, download continues");
                    branch = None;
                    report.player_detached = true;
                }
                Err(_) => {
                    warn!(
                        "player accepted nothing for {:?}, continuing the download without playback",
                        self.stall_timeout
                    );
                    player.task.abort();
                    branch = None;
                    report.player_detached = true;
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| PipelineError::io("flushing output file", e))?;
        debug!("downloader stream ended after {} bytes", report.bytes_written);

        if let Some(PlayerBranch { sender, mut task }) = branch {
            // Closing the channel lets the player drain what it has and see end of stream.
            drop(sender);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    task.abort();
                    return Err(PipelineError::Interrupted);
                }
                _ = &mut task => {}
            }
        }

        report.bytes_forwarded = forwarded.load(Ordering::Relaxed);
        Ok(report)
    }

    fn spawn_player_branch<P>(&self, mut sink: P, forwarded: Arc<AtomicU64>) -> PlayerBranch
    where
        P: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<Vec<u8>>(self.player_buffer);
        let task = tokio::spawn(async move {
            while let Some(chunk) = receiver.recv().await {
                if let Err(e) = sink.write_all(&chunk).await {
                    debug!("player input closed: {}", e);
                    return;
                }
                forwarded.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            }
            let _ = sink.shutdown().await;
        });
        PlayerBranch { sender, task }
    }
}

//! Waiting for the daemon to sync to its chain backend.
//!
//! The monitor polls one status query at a time. Each query is bounded by a
//! short per-call timeout; the wait as a whole is unbounded and ends only on
//! sync, a poll failure, or cancellation. Cancellation is checked between
//! polls and never interrupts a query in flight.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SyncWaitError;
use crate::transport::RpcError;

/// Interval between two sync status polls.
pub const CHAIN_SYNC_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on a single status poll.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Reported when a wait is cancelled through a bare [`CancellationToken`].
pub const UNSPECIFIED_CANCEL_REASON: &str = "cancellation requested";

/// Cancels a sync wait and records why.
///
/// The first reason given wins. Cancelling the wrapped token directly
/// reports [`UNSPECIFIED_CANCEL_REASON`].
#[derive(Debug, Clone, Default)]
pub struct SyncCancel {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl SyncCancel {
    /// A fresh, unsignaled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation with `reason`.
    pub fn cancel(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    /// Whether cancellation has been signaled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The underlying token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn reason(&self) -> String {
        self.reason
            .get()
            .map_or_else(|| UNSPECIFIED_CANCEL_REASON.to_string(), Clone::clone)
    }

    fn cancelled_error(&self) -> SyncWaitError {
        SyncWaitError::Cancelled {
            reason: self.reason(),
        }
    }
}

impl From<CancellationToken> for SyncCancel {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            reason: Arc::default(),
        }
    }
}

/// Anything that can report whether the daemon is synced to chain.
#[async_trait]
pub trait ChainSyncSource: Send + Sync {
    /// Query the current sync status.
    async fn synced_to_chain(&self) -> Result<bool, RpcError>;
}

/// Progress of a sync wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not started.
    Idle,
    /// Issuing or waiting between status polls.
    Polling {
        /// 1-based number of the current poll.
        attempt: u32,
    },
    /// The daemon reported it is synced.
    Synced,
    /// A poll failed.
    Failed,
    /// The wait was cancelled.
    Cancelled,
}

impl SyncState {
    /// Whether the wait has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Synced | Self::Failed | Self::Cancelled)
    }
}

/// Polls a [`ChainSyncSource`] until it reports being synced.
#[derive(Debug, Clone, Copy)]
pub struct SyncMonitor {
    poll_interval: Duration,
    call_timeout: Duration,
}

impl Default for SyncMonitor {
    fn default() -> Self {
        Self::new(CHAIN_SYNC_POLL_INTERVAL, RPC_TIMEOUT)
    }
}

impl SyncMonitor {
    /// A monitor with custom pacing.
    #[must_use]
    pub const fn new(poll_interval: Duration, call_timeout: Duration) -> Self {
        Self {
            poll_interval,
            call_timeout,
        }
    }

    /// Interval between polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Start waiting on a background task.
    pub fn start<S>(&self, source: S, cancel: impl Into<SyncCancel>) -> SyncHandle
    where
        S: ChainSyncSource + 'static,
    {
        let cancel = cancel.into();
        let (state_tx, state_rx) = watch::channel(SyncState::Idle);
        let (done_tx, done_rx) = oneshot::channel();
        let monitor = *self;

        tokio::spawn(async move {
            let outcome = monitor.run(&source, &cancel, &state_tx).await;
            let terminal = match &outcome {
                Ok(()) => SyncState::Synced,
                Err(SyncWaitError::Cancelled { .. }) => SyncState::Cancelled,
                Err(_) => SyncState::Failed,
            };
            state_tx.send_replace(terminal);
            // The caller may have stopped waiting.
            let _ = done_tx.send(outcome);
        });

        SyncHandle {
            state: state_rx,
            outcome: done_rx,
        }
    }

    /// Wait until `source` is synced, it fails, or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns the [`SyncWaitError`] that ended the wait.
    pub async fn wait<S>(
        &self,
        source: S,
        cancel: impl Into<SyncCancel>,
    ) -> Result<(), SyncWaitError>
    where
        S: ChainSyncSource + 'static,
    {
        self.start(source, cancel).wait().await
    }

    async fn run(
        &self,
        source: &dyn ChainSyncSource,
        cancel: &SyncCancel,
        state: &watch::Sender<SyncState>,
    ) -> Result<(), SyncWaitError> {
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            state.send_replace(SyncState::Polling { attempt });
            debug!(attempt, "Polling chain sync status");

            let synced = match tokio::time::timeout(self.call_timeout, source.synced_to_chain()).await
            {
                Ok(Ok(synced)) => synced,
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "Chain sync poll failed");
                    return Err(SyncWaitError::Poll(e));
                },
                Err(_) => {
                    warn!(attempt, timeout = ?self.call_timeout, "Chain sync poll timed out");
                    return Err(SyncWaitError::PollTimeout(self.call_timeout));
                },
            };

            if synced {
                info!(attempt, "lnd is synced to chain");
                return Ok(());
            }

            info!(
                attempt,
                retry_in = ?self.poll_interval,
                "Waiting for lnd to sync to chain"
            );

            tokio::select! {
                biased;
                () = cancel.token().cancelled() => return Err(cancel.cancelled_error()),
                () = tokio::time::sleep(self.poll_interval) => {},
            }

            if cancel.is_cancelled() {
                return Err(cancel.cancelled_error());
            }
        }
    }
}

/// A running sync wait.
#[derive(Debug)]
pub struct SyncHandle {
    state: watch::Receiver<SyncState>,
    outcome: oneshot::Receiver<Result<(), SyncWaitError>>,
}

impl SyncHandle {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Block until the wait ends.
    ///
    /// # Errors
    ///
    /// Returns the [`SyncWaitError`] that ended the wait, or
    /// [`SyncWaitError::MonitorGone`] if the task died without reporting.
    pub async fn wait(self) -> Result<(), SyncWaitError> {
        self.outcome
            .await
            .unwrap_or(Err(SyncWaitError::MonitorGone))
    }
}

//! Shutdown hooks and the background tasks they wind down.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::transport::RpcError;

/// Buffer size of the channels fed by subscription tasks.
pub const SUBSCRIPTION_BUFFER: usize = 16;

/// Something that must be wound down when the services are closed.
///
/// Hooks run after the connection is closed, in registration order.
#[async_trait]
pub trait ShutdownHook: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Stop background work and wait for it to finish.
    async fn shutdown(&self);
}

/// Tracks the streaming-subscription tasks of one domain client.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl BackgroundTasks {
    /// An empty task set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks still running.
    #[must_use]
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Pump `stream` into a bounded channel from a tracked task.
    ///
    /// The task ends when the stream ends or yields an error, when the
    /// receiver is dropped, or when the tasks are shut down.
    pub fn forward<T>(
        &self,
        mut stream: BoxStream<'static, Result<T, RpcError>>,
    ) -> mpsc::Receiver<Result<T, RpcError>>
    where
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = self.cancel.clone();

        self.tracker.spawn(async move {
            loop {
                let item = tokio::select! {
                    () = cancel.cancelled() => break,
                    item = stream.next() => item,
                };
                let Some(item) = item else { break };
                let failed = item.is_err();

                tokio::select! {
                    () = cancel.cancelled() => break,
                    sent = tx.send(item) => {
                        if sent.is_err() || failed {
                            break;
                        }
                    },
                }
            }
        });

        rx
    }

    /// Cancel every task and wait until all have finished.
    pub async fn wait_for_finished(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// A hook that winds these tasks down.
    #[must_use]
    pub fn hook(&self, name: &'static str) -> Box<dyn ShutdownHook> {
        Box::new(TaskShutdown {
            name,
            tasks: self.clone(),
        })
    }
}

struct TaskShutdown {
    name: &'static str,
    tasks: BackgroundTasks,
}

#[async_trait]
impl ShutdownHook for TaskShutdown {
    fn name(&self) -> &str {
        self.name
    }

    async fn shutdown(&self) {
        debug!(client = self.name, "Wait for client to shut down");
        self.tasks.wait_for_finished().await;
    }
}

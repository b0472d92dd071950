//! A scripted in-memory daemon.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use crate::credentials::Macaroon;
use crate::transport::{RpcChannel, RpcError, RpcSubscription};

/// A request the mock daemon received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Method name.
    pub method: String,
    /// Raw bytes of the macaroon that authorized the call.
    pub macaroon: Vec<u8>,
    /// Named parameters, without the macaroon.
    pub params: Value,
}

#[derive(Default)]
struct DaemonState {
    responses: HashMap<String, VecDeque<Result<Value, RpcError>>>,
    streams: HashMap<String, Vec<Value>>,
    delays: HashMap<String, Duration>,
    calls: Vec<RecordedCall>,
    closes: usize,
}

/// Scripted [`RpcChannel`] standing in for a running daemon.
///
/// Responses queued for a method are returned in order; the last one is
/// repeated once the queue is down to it. Methods with nothing scripted
/// fail with [`RpcError::Unimplemented`], like an old daemon would.
#[derive(Clone, Default)]
pub struct MockDaemon {
    state: Arc<Mutex<DaemonState>>,
}

impl MockDaemon {
    /// A daemon with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut DaemonState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// The channel to hand to a [`Connection`](crate::transport::Connection).
    #[must_use]
    pub fn channel(&self) -> Arc<dyn RpcChannel> {
        Arc::new(self.clone())
    }

    /// Queue a successful response for `method`.
    pub fn respond(&self, method: &str, response: Value) {
        self.push(method, Ok(response));
    }

    /// Queue a failure for `method`.
    pub fn fail(&self, method: &str, error: RpcError) {
        self.push(method, Err(error));
    }

    fn push(&self, method: &str, outcome: Result<Value, RpcError>) {
        self.with_state(|s| {
            s.responses
                .entry(method.to_string())
                .or_default()
                .push_back(outcome);
        });
    }

    /// Delay every response to `method` by `delay`.
    pub fn delay(&self, method: &str, delay: Duration) {
        self.with_state(|s| {
            s.delays.insert(method.to_string(), delay);
        });
    }

    /// Script a subscription: `items` are delivered, then the stream stays
    /// open without further notifications.
    pub fn stream(&self, method: &str, items: Vec<Value>) {
        self.with_state(|s| {
            s.streams.insert(method.to_string(), items);
        });
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.with_state(|s| s.calls.clone())
    }

    /// How many requests `method` received.
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| c.method == method).count())
    }

    /// How many times the channel was closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.with_state(|s| s.closes)
    }

    fn record(&self, method: &str, macaroon: &Macaroon, params: Value) {
        self.with_state(|s| {
            s.calls.push(RecordedCall {
                method: method.to_string(),
                macaroon: macaroon.as_bytes().to_vec(),
                params,
            });
        });
    }
}

#[async_trait]
impl RpcChannel for MockDaemon {
    async fn call(
        &self,
        method: &str,
        macaroon: &Macaroon,
        params: Value,
    ) -> Result<Value, RpcError> {
        self.record(method, macaroon, params);

        let (delay, outcome) = self.with_state(|s| {
            let outcome = s.responses.get_mut(method).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            });
            (s.delays.get(method).copied(), outcome)
        });

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        outcome.unwrap_or_else(|| {
            Err(RpcError::Unimplemented {
                method: method.to_string(),
            })
        })
    }

    async fn subscribe(
        &self,
        method: &str,
        macaroon: &Macaroon,
        params: Value,
    ) -> Result<RpcSubscription, RpcError> {
        self.record(method, macaroon, params);

        let items = self
            .with_state(|s| s.streams.get(method).cloned())
            .ok_or_else(|| RpcError::Unimplemented {
                method: method.to_string(),
            })?;

        Ok(futures::stream::iter(items.into_iter().map(Ok))
            .chain(futures::stream::pending())
            .boxed())
    }

    async fn close(&self) {
        self.with_state(|s| s.closes = s.closes.saturating_add(1));
    }
}

//! Watch-driven controller loop.
//!
//! A single worker consumes watch events, maps each to the keys it
//! affects, and reconciles them sequentially, so reconciles for the
//! same key are serialized. Transient failures are retried
//! in place with exponential backoff; each reconcile attempt runs
//! under a ten-second deadline.

use crate::store::WatchEvent;
use crate::types::{ObjectKey, OperatorError};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

pub const RECONCILE_DEADLINE: Duration = Duration::from_secs(10);

pub struct Controller {
    name: &'static str,
}

impl Controller {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub async fn run<M, F, Fut>(
        &self,
        mut events: broadcast::Receiver<WatchEvent>,
        map_event: M,
        reconcile: F,
    ) where
        M: Fn(&WatchEvent) -> Vec<ObjectKey>,
        F: Fn(ObjectKey) -> Fut,
        Fut: Future<Output = Result<(), OperatorError>>,
    {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(controller = self.name, missed, "watch lagged, continuing");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(controller = self.name, "watch closed, stopping");
                    return;
                }
            };

            for key in map_event(&event) {
                self.reconcile_with_retry(&key, &reconcile).await;
            }
        }
    }

    async fn reconcile_with_retry<F, Fut>(&self, key: &ObjectKey, reconcile: &F)
    where
        F: Fn(ObjectKey) -> Fut,
        Fut: Future<Output = Result<(), OperatorError>>,
    {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(5),
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        loop {
            let attempt = tokio::time::timeout(RECONCILE_DEADLINE, reconcile(key.clone())).await;
            match attempt {
                Ok(Ok(())) => {
                    debug!(controller = self.name, %key, "reconciled");
                    return;
                }
                Ok(Err(e)) if !e.is_transient() => {
                    // Permanent errors were already reflected in status
                    // by the reconciler; nothing to retry.
                    error!(controller = self.name, %key, error = %e, "reconcile failed");
                    return;
                }
                Ok(Err(e)) => {
                    warn!(controller = self.name, %key, error = %e, "transient failure");
                }
                Err(_) => {
                    warn!(controller = self.name, %key, "reconcile deadline expired");
                }
            }

            match backoff.next_backoff() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    error!(controller = self.name, %key, "giving up after repeated failures");
                    return;
                }
            }
        }
    }
}

//! Reconciles declarative Feed records with the aggregator's source
//! registry. Idempotent: a reconcile with nothing to do writes no
//! condition.

use crate::client::RegistryApi;
use crate::store::Store;
use crate::types::{Condition, ConditionType, ObjectKey, OperatorError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

pub const FINALIZER: &str = "feeds.newsaggregator.io/cleanup";

pub struct FeedReconciler<R: RegistryApi> {
    store: Store,
    registry: R,
    /// Spec generations already synced to the registry, per key.
    observed: Mutex<HashMap<ObjectKey, i64>>,
}

impl<R: RegistryApi> FeedReconciler<R> {
    pub fn new(store: Store, registry: R) -> Self {
        Self {
            store,
            registry,
            observed: Mutex::new(HashMap::new()),
        }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> Result<()> {
        let Some(feed) = self.store.get_feed(key) else {
            // Already gone; best-effort cleanup under the key name.
            if let Err(e) = self.registry.delete_source(&key.name).await {
                warn!(%key, error = %e, "cleanup delete for vanished feed failed");
            }
            self.observed.lock().unwrap().remove(key);
            return Ok(());
        };

        if feed.metadata.deletion_timestamp.is_some() {
            return self.finalize(key, &feed.spec.name).await;
        }

        let last = feed.last_condition().map(|c| c.condition_type);
        match last {
            None | Some(ConditionType::Failed) | Some(ConditionType::Deleted) => {
                self.create(key, &feed.spec.name, &feed.spec.link).await
            }
            Some(ConditionType::Added) | Some(ConditionType::Updated) => {
                let observed = self.observed.lock().unwrap().get(key).copied();
                if observed == Some(feed.metadata.generation) {
                    // Spec unchanged since the last sync.
                    return Ok(());
                }
                self.update(key, &feed.spec.name, &feed.spec.link, feed.metadata.generation)
                    .await
            }
        }
    }

    async fn create(&self, key: &ObjectKey, name: &str, link: &str) -> Result<()> {
        match self.registry.create_source(name, link).await {
            Ok(()) => {
                self.store.add_feed_finalizer(key, FINALIZER)?;
                self.store
                    .append_feed_condition(key, Condition::new(ConditionType::Added))?;
                let generation = self
                    .store
                    .get_feed(key)
                    .map(|f| f.metadata.generation)
                    .unwrap_or(1);
                self.observed.lock().unwrap().insert(key.clone(), generation);
                info!(%key, "source registered");
                Ok(())
            }
            Err(e) => self.fail_or_requeue(key, e),
        }
    }

    async fn update(&self, key: &ObjectKey, name: &str, link: &str, generation: i64) -> Result<()> {
        match self.registry.update_source(name, link).await {
            Ok(()) => {
                self.store
                    .append_feed_condition(key, Condition::new(ConditionType::Updated))?;
                self.observed.lock().unwrap().insert(key.clone(), generation);
                info!(%key, generation, "source updated");
                Ok(())
            }
            Err(e) => self.fail_or_requeue(key, e),
        }
    }

    /// Deletion path: the finalizer keeps the record visible until the
    /// registry delete succeeds, so an interrupted delete is retried.
    async fn finalize(&self, key: &ObjectKey, name: &str) -> Result<()> {
        match self.registry.delete_source(name).await {
            Ok(()) => {
                self.store
                    .append_feed_condition(key, Condition::new(ConditionType::Deleted))?;
                self.store.remove_feed_finalizer(key, FINALIZER)?;
                self.observed.lock().unwrap().remove(key);
                info!(%key, "source deleted");
                Ok(())
            }
            Err(e) => self.fail_or_requeue(key, e),
        }
    }

    /// Transient errors keep the current condition and bubble up for
    /// requeue; permanent ones write `Failed` with the reason and wait
    /// for a spec change.
    fn fail_or_requeue(&self, key: &ObjectKey, error: OperatorError) -> Result<()> {
        if error.is_transient() {
            warn!(%key, error = %error, "transient registry error, requeueing");
            return Err(error);
        }
        warn!(%key, error = %error, "permanent registry error");
        self.store
            .append_feed_condition(key, Condition::failed(error.to_string()))?;
        Ok(())
    }
}

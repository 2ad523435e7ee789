//! In-memory watchable store for the declarative records.
//!
//! Admission runs on every create/update. Spec changes bump the
//! object generation; status writes do not. Every mutation emits a
//! watch event on the broadcast channel that drives the controllers.

use crate::admission;
use crate::types::{
    Condition, Feed, FeedGroups, HotNews, HotNewsStatus, ObjectKey, OperatorError, Result,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Feed,
    HotNews,
    FeedGroups,
}

#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub kind: ResourceKind,
    pub key: ObjectKey,
}

#[derive(Default)]
struct Inner {
    feeds: HashMap<ObjectKey, Feed>,
    hotnews: HashMap<ObjectKey, HotNews>,
    groups: HashMap<ObjectKey, FeedGroups>,
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<WatchEvent>,
}

impl Store {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    fn emit(&self, kind: ResourceKind, key: ObjectKey) {
        debug!(?kind, %key, "watch event");
        // Nobody listening is fine; controllers may not be up yet.
        let _ = self.events.send(WatchEvent { kind, key });
    }

    // Feeds.

    pub fn apply_feed(&self, feed: Feed) -> Result<()> {
        let key = feed.metadata.key();
        let mut inner = self.inner.lock().unwrap();
        let existing: Vec<Feed> = inner.feeds.values().cloned().collect();
        admission::validate_feed(&feed, &existing)?;

        let feed = match inner.feeds.get(&key) {
            Some(current) => {
                let mut updated = feed;
                updated.metadata.uid = current.metadata.uid;
                updated.metadata.finalizers = current.metadata.finalizers.clone();
                updated.metadata.generation = if current.spec == updated.spec {
                    current.metadata.generation
                } else {
                    current.metadata.generation + 1
                };
                updated.status = current.status.clone();
                updated
            }
            None => feed,
        };
        inner.feeds.insert(key.clone(), feed);
        drop(inner);
        self.emit(ResourceKind::Feed, key);
        Ok(())
    }

    pub fn get_feed(&self, key: &ObjectKey) -> Option<Feed> {
        self.inner.lock().unwrap().feeds.get(key).cloned()
    }

    pub fn list_feeds(&self, namespace: &str) -> Vec<Feed> {
        self.inner
            .lock()
            .unwrap()
            .feeds
            .values()
            .filter(|feed| feed.metadata.namespace == namespace)
            .cloned()
            .collect()
    }

    /// Marks a feed for deletion. With finalizers pending the object
    /// stays visible with a deletion timestamp; otherwise it is
    /// removed immediately.
    pub fn delete_feed(&self, key: &ObjectKey) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let feed = inner
            .feeds
            .get_mut(key)
            .ok_or_else(|| OperatorError::NotFound(key.to_string()))?;
        if feed.metadata.finalizers.is_empty() {
            inner.feeds.remove(key);
        } else if feed.metadata.deletion_timestamp.is_none() {
            feed.metadata.deletion_timestamp = Some(Utc::now());
        }
        drop(inner);
        self.emit(ResourceKind::Feed, key.clone());
        Ok(())
    }

    pub fn add_feed_finalizer(&self, key: &ObjectKey, finalizer: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let feed = inner
            .feeds
            .get_mut(key)
            .ok_or_else(|| OperatorError::NotFound(key.to_string()))?;
        if !feed.metadata.finalizers.iter().any(|f| f == finalizer) {
            feed.metadata.finalizers.push(finalizer.to_string());
        }
        Ok(())
    }

    /// Removes a finalizer; once none remain on an object marked for
    /// deletion, the object is dropped.
    pub fn remove_feed_finalizer(&self, key: &ObjectKey, finalizer: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let feed = inner
            .feeds
            .get_mut(key)
            .ok_or_else(|| OperatorError::NotFound(key.to_string()))?;
        feed.metadata.finalizers.retain(|f| f != finalizer);
        if feed.metadata.finalizers.is_empty() && feed.metadata.deletion_timestamp.is_some() {
            inner.feeds.remove(key);
        }
        Ok(())
    }

    /// Appends a status condition. Status writes never bump the
    /// generation and never run admission.
    pub fn append_feed_condition(&self, key: &ObjectKey, condition: Condition) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let feed = inner
            .feeds
            .get_mut(key)
            .ok_or_else(|| OperatorError::NotFound(key.to_string()))?;
        feed.status.conditions.push(condition);
        Ok(())
    }

    // HotNews.

    pub fn apply_hotnews(&self, hotnews: HotNews) -> Result<()> {
        let key = hotnews.metadata.key();
        let mut inner = self.inner.lock().unwrap();
        let feeds: Vec<Feed> = inner.feeds.values().cloned().collect();
        let groups_key = ObjectKey::new(hotnews.metadata.namespace.clone(), FEED_GROUPS_NAME);
        let groups = inner.groups.get(&groups_key).cloned();
        admission::validate_hotnews(&hotnews, &feeds, groups.as_ref())?;

        let hotnews = match inner.hotnews.get(&key) {
            Some(current) => {
                let mut updated = hotnews;
                updated.metadata.uid = current.metadata.uid;
                updated.metadata.generation = if current.spec == updated.spec {
                    current.metadata.generation
                } else {
                    current.metadata.generation + 1
                };
                updated.status = current.status.clone();
                updated
            }
            None => hotnews,
        };
        inner.hotnews.insert(key.clone(), hotnews);
        drop(inner);
        self.emit(ResourceKind::HotNews, key);
        Ok(())
    }

    pub fn get_hotnews(&self, key: &ObjectKey) -> Option<HotNews> {
        self.inner.lock().unwrap().hotnews.get(key).cloned()
    }

    pub fn list_hotnews(&self, namespace: &str) -> Vec<HotNews> {
        self.inner
            .lock()
            .unwrap()
            .hotnews
            .values()
            .filter(|h| h.metadata.namespace == namespace)
            .cloned()
            .collect()
    }

    pub fn update_hotnews_status(&self, key: &ObjectKey, status: HotNewsStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let hotnews = inner
            .hotnews
            .get_mut(key)
            .ok_or_else(|| OperatorError::NotFound(key.to_string()))?;
        hotnews.status = status;
        Ok(())
    }

    // Feed groups.

    pub fn apply_feed_groups(&self, groups: FeedGroups) -> Result<()> {
        let key = groups.metadata.key();
        let mut inner = self.inner.lock().unwrap();
        let feeds: Vec<Feed> = inner.feeds.values().cloned().collect();
        admission::validate_feed_groups(&groups, &feeds)?;
        inner.groups.insert(key.clone(), groups);
        drop(inner);
        self.emit(ResourceKind::FeedGroups, key);
        Ok(())
    }

    pub fn get_feed_groups(&self, key: &ObjectKey) -> Option<FeedGroups> {
        self.inner.lock().unwrap().groups.get(key).cloned()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Well-known name of the feed-group map within a namespace.
pub const FEED_GROUPS_NAME: &str = "feed-group-source";

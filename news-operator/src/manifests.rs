//! Startup loading of declarative manifests.
//!
//! The operator ingests desired state from a directory of JSON
//! manifests, each tagged with its `kind`. Every record goes through
//! the store, so admission runs exactly as it would on a live apply.
//! Feeds are applied first, then the feed-group map, then HotNews,
//! because the later kinds validate references to the earlier ones.

use crate::store::Store;
use crate::types::{Feed, FeedGroups, HotNews, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum Manifest {
    Feed(Feed),
    HotNews(HotNews),
    FeedGroups(FeedGroups),
}

/// Applies every `*.json` manifest under `dir` to the store and
/// returns how many records were accepted. A missing directory is not
/// an error; the operator simply starts empty.
pub fn load_dir(store: &Store, dir: impl AsRef<Path>) -> Result<usize> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        warn!(path = %dir.display(), "manifest directory not found, starting empty");
        return Ok(0);
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut feeds = Vec::new();
    let mut groups = Vec::new();
    let mut hotnews = Vec::new();
    for path in &paths {
        let raw = fs::read(path)?;
        match serde_json::from_slice::<Manifest>(&raw)? {
            Manifest::Feed(feed) => feeds.push(feed),
            Manifest::FeedGroups(map) => groups.push(map),
            Manifest::HotNews(record) => hotnews.push(record),
        }
    }

    let mut applied = 0;
    for feed in feeds {
        let key = feed.metadata.key();
        store.apply_feed(feed)?;
        info!(%key, "applied Feed manifest");
        applied += 1;
    }
    for map in groups {
        let key = map.metadata.key();
        store.apply_feed_groups(map)?;
        info!(%key, "applied FeedGroups manifest");
        applied += 1;
    }
    for record in hotnews {
        let key = record.metadata.key();
        store.apply_hotnews(record)?;
        info!(%key, "applied HotNews manifest");
        applied += 1;
    }

    Ok(applied)
}

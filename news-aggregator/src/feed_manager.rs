//! Resource manager: owns the snapshot storage, the persisted source
//! dictionary and the feed-group map.

use crate::fetcher::{FetchConfig, Fetcher};
use crate::types::{AggregatorError, Content, Format, Resource, Result, Source};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

pub const NO_AVAILABLE_SOURCES: &str = "no available sources";
pub const NO_AVAILABLE_FEEDS: &str = "no available feeds";

/// One persisted dictionary row: `{"source","format","link"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub source: String,
    pub format: Format,
    pub link: String,
}

pub struct FeedManager {
    storage: crate::storage::Storage,
    config_path: PathBuf,
    dictionary: BTreeMap<String, DictionaryEntry>,
    feed_groups: HashMap<String, String>,
    fetcher: Fetcher,
}

impl FeedManager {
    /// Loads the dictionary from `config_path`, seeding the default
    /// publisher set when no dictionary exists yet.
    pub fn new(storage_path: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Result<Self> {
        let storage = crate::storage::Storage::new(storage_path)?;
        let config_path = config_path.into();

        let dictionary = if config_path.is_file() {
            let raw = fs::read(&config_path)?;
            let entries: Vec<DictionaryEntry> = serde_json::from_slice(&raw)?;
            entries
                .into_iter()
                .map(|entry| (entry.source.clone(), entry))
                .collect()
        } else {
            info!(path = %config_path.display(), "no dictionary found, seeding defaults");
            default_dictionary()
        };

        let mut manager = Self {
            storage,
            config_path,
            dictionary,
            feed_groups: default_feed_groups(),
            fetcher: Fetcher::new(FetchConfig::default())?,
        };
        if !manager.config_path.is_file() {
            manager.persist()?;
        }
        Ok(manager)
    }

    /// Comma-separated list of sources with stored snapshots.
    pub fn available_sources(&self) -> Result<String> {
        if self.dictionary.is_empty() {
            return Ok(NO_AVAILABLE_FEEDS.to_string());
        }
        let sources = self.storage.list_sources()?;
        if sources.is_empty() {
            return Ok(NO_AVAILABLE_SOURCES.to_string());
        }
        Ok(sources.join(","))
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.dictionary.contains_key(name)
    }

    pub fn dictionary(&self) -> Vec<DictionaryEntry> {
        self.dictionary.values().cloned().collect()
    }

    pub fn feed_groups(&self) -> &HashMap<String, String> {
        &self.feed_groups
    }

    /// Adds or replaces a dictionary entry and persists. Registering
    /// a name that already exists is an update.
    pub fn register_source(&mut self, name: &str, link: &str, format: Format) -> Result<()> {
        let source = Source::new(name)?;
        url::Url::parse(link)?;
        self.dictionary.insert(
            source.as_str().to_string(),
            DictionaryEntry {
                source: source.as_str().to_string(),
                format,
                link: link.to_string(),
            },
        );
        self.persist()?;
        info!(source = name, %format, "registered source");
        Ok(())
    }

    pub fn update_source(&mut self, name: &str, link: &str, format: Format) -> Result<()> {
        self.register_source(name, link, format)
    }

    /// Removes a dictionary entry if present and persists. Deleting
    /// an unknown name is a no-op.
    pub fn delete_source(&mut self, name: &str) -> Result<()> {
        if self.dictionary.remove(name).is_some() {
            self.persist()?;
            info!(source = name, "deleted source");
        }
        Ok(())
    }

    /// One resource per stored snapshot file, for every dictionary
    /// entry that has snapshots.
    pub fn all_resources(&self) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        for entry in self.dictionary.values() {
            resources.extend(self.resources_for(entry)?);
        }
        Ok(resources)
    }

    /// Same as [`all_resources`](Self::all_resources), restricted to
    /// the given names. Unknown names fail fast.
    pub fn selected_resources(&self, names: &[String]) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        for name in names {
            let entry = self
                .dictionary
                .get(name.as_str())
                .ok_or_else(|| AggregatorError::UnknownSource(name.clone()))?;
            resources.extend(self.resources_for(entry)?);
        }
        Ok(resources)
    }

    /// Resolves a source into its refresh inputs: validated source,
    /// snapshot extension and remote link. JSON sources cannot be
    /// refreshed remotely.
    pub fn refresh_target(&self, name: &str) -> Result<(Source, &'static str, String)> {
        let entry = self
            .dictionary
            .get(name)
            .ok_or_else(|| AggregatorError::UnknownSource(name.to_string()))?;

        let extension = match entry.format {
            Format::Rss => "xml",
            Format::Html => "html",
            Format::Json | Format::Unknown => {
                return Err(AggregatorError::FormatNotRemotelyRefreshable(entry.format))
            }
        };

        let source = Source::new(entry.source.as_str())?;
        Ok((source, extension, entry.link.clone()))
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn store_snapshot(&self, source: &Source, extension: &str, bytes: &[u8]) -> Result<()> {
        self.storage.write_snapshot(source, extension, bytes)?;
        Ok(())
    }

    /// Refreshes one source's snapshot from its remote link.
    pub async fn update_resource(&self, name: &str) -> Result<()> {
        let (source, extension, link) = self.refresh_target(name)?;
        let body = self.fetcher.fetch_body(&link).await?;
        self.store_snapshot(&source, extension, &body)
    }

    fn resources_for(&self, entry: &DictionaryEntry) -> Result<Vec<Resource>> {
        let source = Source::new(entry.source.as_str())?;
        let mut resources = Vec::new();
        for path in self.storage.snapshot_files(&source)? {
            let bytes = fs::read(&path)?;
            match Content::new(bytes) {
                Ok(content) => {
                    resources.push(Resource::new(source.clone(), entry.format, content))
                }
                Err(_) => {
                    warn!(path = %path.display(), "skipping empty snapshot");
                }
            }
        }
        Ok(resources)
    }

    /// Rewrites the dictionary file atomically (write-to-temp then
    /// rename); the file is shared across processes.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let entries: Vec<&DictionaryEntry> = self.dictionary.values().collect();
        let raw = serde_json::to_vec_pretty(&entries)?;
        let tmp = self.config_path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.config_path)?;
        Ok(())
    }
}

fn default_dictionary() -> BTreeMap<String, DictionaryEntry> {
    let defaults = [
        (
            "abc-news",
            Format::Rss,
            "https://abcnews.go.com/abcnews/internationalheadlines",
        ),
        (
            "bbc-world",
            Format::Rss,
            "https://feeds.bbci.co.uk/news/world/rss.xml",
        ),
        (
            "washington-times",
            Format::Rss,
            "https://www.washingtontimes.com/rss/headlines/news/world",
        ),
        (
            "nbc-news",
            Format::Json,
            "https://www.nbcnews.com/news/world",
        ),
        ("usa-today", Format::Html, "https://www.usatoday.com/news/"),
    ];
    defaults
        .into_iter()
        .map(|(source, format, link)| {
            (
                source.to_string(),
                DictionaryEntry {
                    source: source.to_string(),
                    format,
                    link: link.to_string(),
                },
            )
        })
        .collect()
}

fn default_feed_groups() -> HashMap<String, String> {
    HashMap::from([
        ("world".to_string(), "abc-news,bbc-world".to_string()),
        (
            "us".to_string(),
            "washington-times,usa-today".to_string(),
        ),
    ])
}

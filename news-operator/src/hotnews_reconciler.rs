//! Recomputes a HotNews projection whenever its spec or any of its
//! inputs (Feed records, the feed-group map) change.

use crate::client::NewsApi;
use crate::store::{Store, FEED_GROUPS_NAME};
use crate::types::{HotNewsSpec, HotNewsStatus, ObjectKey, OperatorError, Result};
use std::collections::BTreeSet;
use tracing::info;

pub struct HotNewsReconciler<N: NewsApi> {
    store: Store,
    news: N,
    aggregator_base: String,
}

impl<N: NewsApi> HotNewsReconciler<N> {
    pub fn new(store: Store, news: N, aggregator_base: impl Into<String>) -> Self {
        Self {
            store,
            news,
            aggregator_base: aggregator_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> Result<()> {
        let Some(hotnews) = self.store.get_hotnews(key) else {
            return Ok(());
        };

        let sources = self.effective_sources(&hotnews.metadata.namespace, &hotnews.spec)?;
        let url = self.news_url(&hotnews.spec, &sources);

        // A failed fetch leaves the previous status untouched.
        let titles = self.news.fetch_titles(&url).await?;

        let mut truncated = titles;
        truncated.truncate(hotnews.spec.summary_config.titles_count);

        let status = HotNewsStatus {
            news_link: url,
            articles_count: truncated.len(),
            articles_titles: truncated,
        };
        self.store.update_hotnews_status(key, status)?;
        info!(%key, "hot news recomputed");
        Ok(())
    }

    /// Union of the spec's feeds and the flattened feed groups,
    /// sorted lexicographically.
    fn effective_sources(&self, namespace: &str, spec: &HotNewsSpec) -> Result<Vec<String>> {
        let mut sources: BTreeSet<String> = spec.feeds.iter().cloned().collect();

        if !spec.feed_groups.is_empty() {
            let groups_key = ObjectKey::new(namespace, FEED_GROUPS_NAME);
            let groups = self.store.get_feed_groups(&groups_key).ok_or_else(|| {
                OperatorError::Transient(format!("feed-group map {} not found", groups_key))
            })?;
            for group in &spec.feed_groups {
                if let Some(members) = groups.data.get(group) {
                    sources.extend(
                        members
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    );
                }
            }
        }

        Ok(sources.into_iter().collect())
    }

    /// `/news` URL with the query parameters in their fixed order,
    /// omitting unused ones.
    fn news_url(&self, spec: &HotNewsSpec, sources: &[String]) -> String {
        let mut params = Vec::new();
        if !spec.keywords.is_empty() {
            params.push(format!("keywords={}", spec.keywords.join(",")));
        }
        if !sources.is_empty() {
            params.push(format!("sources={}", sources.join(",")));
        }
        if let Some(start) = spec.date_start {
            params.push(format!("date-start={}", start.format("%Y-%m-%d")));
        }
        if let Some(end) = spec.date_end {
            params.push(format!("date-end={}", end.format("%Y-%m-%d")));
        }
        format!("{}/news?{}", self.aggregator_base, params.join("&"))
    }
}

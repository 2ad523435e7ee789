//! Parser for RSS 2.0 documents (`channel > item`).

use crate::dates;
use crate::parsers::Parse;
use crate::types::{AggregatorError, Article, Resource, Result};
use rss::Channel;
use tracing::debug;

pub struct RssParser;

impl RssParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RssParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parse for RssParser {
    fn parse(&self, resource: &Resource) -> Result<Vec<Article>> {
        let channel = Channel::read_from(resource.content())
            .map_err(|e| AggregatorError::MalformedEnvelope(e.to_string()))?;

        debug!(
            source = %resource.source(),
            items = channel.items().len(),
            "parsing RSS channel"
        );

        let mut articles = Vec::with_capacity(channel.items().len());
        for item in channel.items() {
            let date = dates::parse_date(item.pub_date().unwrap_or_default())?;
            let mut builder = Article::builder()
                .title(item.title().unwrap_or_default().trim())
                .description(item.description().unwrap_or_default().trim())
                .creation_date(date)
                .source(resource.source().as_str());
            if let Some(link) = item.link() {
                builder = builder.link(link.trim());
            }
            // dc:creator carries the byline in most publisher feeds.
            if let Some(creator) = item
                .dublin_core_ext()
                .and_then(|ext| ext.creators().first())
            {
                builder = builder.author(creator.trim());
            }
            articles.push(builder.build()?);
        }

        Ok(articles)
    }
}

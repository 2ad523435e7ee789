//! Parser for the vendor JSON envelope (`{"articles": [...]}`).

use crate::dates;
use crate::parsers::Parse;
use crate::types::{AggregatorError, Article, Resource, Result};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope {
    articles: Vec<EnvelopeArticle>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeArticle {
    #[allow(dead_code)]
    source: EnvelopeSource,
    #[serde(default)]
    author: Option<String>,
    title: String,
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeSource {
    #[allow(dead_code)]
    #[serde(default)]
    name: Option<String>,
}

pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parse for JsonParser {
    fn parse(&self, resource: &Resource) -> Result<Vec<Article>> {
        let envelope: Envelope = serde_json::from_slice(resource.content())
            .map_err(|e| AggregatorError::MalformedEnvelope(e.to_string()))?;

        debug!(
            source = %resource.source(),
            items = envelope.articles.len(),
            "parsing JSON envelope"
        );

        let mut articles = Vec::with_capacity(envelope.articles.len());
        for item in envelope.articles {
            // The per-item source.name is advisory; the resource's own
            // source identifies the article.
            let date = dates::parse_date(&item.published_at)?;
            let mut builder = Article::builder()
                .title(item.title.trim())
                .description(item.description.trim())
                .creation_date(date)
                .source(resource.source().as_str());
            if let Some(author) = item.author {
                builder = builder.author(author.trim());
            }
            if let Some(url) = item.url {
                builder = builder.link(url.trim());
            }
            articles.push(builder.build()?);
        }

        Ok(articles)
    }
}

//! The ingestion pipeline: resource -> parser -> articles -> filters.

use crate::filters::Filter;
use crate::parsers::ParserFactory;
use crate::types::{AggregatorError, Article, Resource, Result};
use tracing::debug;

/// Accumulates parsed articles and applies its filter chain when a
/// batch completes.
///
/// Not safe for concurrent mutation; each request owns its own
/// instance.
pub struct NewsAggregator {
    factory: ParserFactory,
    filters: Vec<Box<dyn Filter>>,
    articles: Vec<Article>,
}

impl NewsAggregator {
    pub fn new(factory: Option<ParserFactory>) -> Result<Self> {
        let factory = factory.ok_or_else(|| {
            AggregatorError::InvalidConfiguration("aggregator requires a parser factory".to_string())
        })?;
        Ok(Self {
            factory,
            filters: Vec::new(),
            articles: Vec::new(),
        })
    }

    /// Appends a filter; filters run in registration order and are
    /// never deduplicated.
    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Parses one resource and appends its articles, preserving
    /// parser emission order.
    pub fn aggregate(&mut self, resource: &Resource) -> Result<()> {
        let parser = self
            .factory
            .get_parser(resource.format(), resource.source())?;
        let articles = parser.parse(resource)?;
        debug!(
            source = %resource.source(),
            count = articles.len(),
            "aggregated resource"
        );
        self.articles.extend(articles);
        Ok(())
    }

    /// Aggregates every resource, then applies the filter chain once
    /// to the full accumulated list.
    pub fn aggregate_multiple(&mut self, resources: &[Resource]) -> Result<Vec<Article>> {
        for resource in resources {
            self.aggregate(resource)?;
        }
        let mut articles = self.articles.clone();
        for filter in &self.filters {
            articles = filter.apply(articles);
        }
        Ok(articles)
    }

    /// The raw accumulated list, before any filtering.
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }
}

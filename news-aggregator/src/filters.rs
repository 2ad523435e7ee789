//! Composable article filters and deterministic ordering.

use crate::dates;
use crate::types::{AggregatorError, Article, Result};
use chrono::{DateTime, Utc};
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

/// Single-method predicate over article lists. Apply never fails;
/// construction may.
pub trait Filter: Send + Sync {
    fn apply(&self, articles: Vec<Article>) -> Vec<Article>;
}

/// Matches articles whose stemmed title or description contains any
/// stemmed term. An empty term list matches everything.
pub struct KeywordFilter {
    terms: Vec<String>,
    stemmer: Stemmer,
}

impl KeywordFilter {
    pub fn new(keywords: &[String]) -> Self {
        let stemmer = Stemmer::create(Algorithm::English);
        let terms = keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| stem_text(&stemmer, k))
            .collect();
        Self { terms, stemmer }
    }
}

impl Filter for KeywordFilter {
    fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        if self.terms.is_empty() {
            return articles;
        }
        articles
            .into_iter()
            .filter(|article| {
                let haystack = format!(
                    "{} {}",
                    stem_text(&self.stemmer, &article.title),
                    stem_text(&self.stemmer, &article.description)
                );
                self.terms.iter().any(|term| haystack.contains(term))
            })
            .collect()
    }
}

/// Keeps articles from the given sources. An empty set matches
/// everything.
pub struct SourceFilter {
    sources: HashSet<String>,
}

impl SourceFilter {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }
}

impl Filter for SourceFilter {
    fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        if self.sources.is_empty() {
            return articles;
        }
        articles
            .into_iter()
            .filter(|article| self.sources.contains(&article.source))
            .collect()
    }
}

/// Rejects articles strictly before the configured instant.
pub struct StartDateFilter {
    cutoff: DateTime<Utc>,
}

impl StartDateFilter {
    pub fn new(raw: &str) -> Result<Self> {
        Ok(Self {
            cutoff: parse_cutoff(raw)?,
        })
    }
}

impl Filter for StartDateFilter {
    fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        articles
            .into_iter()
            .filter(|article| article.creation_date >= self.cutoff)
            .collect()
    }
}

/// Rejects articles strictly after the configured instant.
pub struct EndDateFilter {
    cutoff: DateTime<Utc>,
}

impl EndDateFilter {
    pub fn new(raw: &str) -> Result<Self> {
        Ok(Self {
            cutoff: parse_cutoff(raw)?,
        })
    }
}

impl Filter for EndDateFilter {
    fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        articles
            .into_iter()
            .filter(|article| article.creation_date <= self.cutoff)
            .collect()
    }
}

fn parse_cutoff(raw: &str) -> Result<DateTime<Utc>> {
    dates::parse_default_format(raw)
        .map_err(|_| AggregatorError::InvalidDate(raw.to_string()))
}

fn stem_text(stemmer: &Stemmer, text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| stemmer.stem(word).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable ascending order by creation date; equal dates keep their
/// prior relative order.
pub fn sort_ascending(articles: &mut [Article]) {
    articles.sort_by_key(|article| article.creation_date);
}

/// Stable descending order by creation date.
pub fn sort_descending(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
}

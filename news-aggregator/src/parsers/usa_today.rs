//! Scraper for the USA Today front-page listing markup.
//!
//! Unlike the JSON and RSS parsers, a single bad item does not fail
//! the parse: anchors whose publication date cannot be parsed are
//! dropped one by one. An empty final list is an error.

use crate::dates;
use crate::parsers::Parse;
use crate::types::{AggregatorError, Article, Resource, Result};
use scraper::{Html, Selector};
use tracing::debug;

const ANCHOR_SELECTOR: &str = "main.gnt_cw div.gnt_m_flm a.gnt_m_flm_a";
const DATE_SELECTOR: &str = "div.gnt_m_flm_sbt";

pub struct UsaTodayParser {
    anchors: Selector,
    dates: Selector,
}

impl UsaTodayParser {
    pub fn new() -> Self {
        Self {
            // Both selectors are static and known-valid.
            anchors: Selector::parse(ANCHOR_SELECTOR).unwrap(),
            dates: Selector::parse(DATE_SELECTOR).unwrap(),
        }
    }
}

impl Default for UsaTodayParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parse for UsaTodayParser {
    fn parse(&self, resource: &Resource) -> Result<Vec<Article>> {
        let html = String::from_utf8(resource.content().to_vec())
            .map_err(|e| AggregatorError::MalformedEnvelope(e.to_string()))?;
        let document = Html::parse_document(&html);

        let mut articles = Vec::new();
        for anchor in document.select(&self.anchors) {
            let title: String = anchor.text().collect::<String>().trim().to_string();
            let description = anchor.value().attr("data-c-br").unwrap_or_default();
            let raw_date = anchor
                .select(&self.dates)
                .next()
                .and_then(|div| div.value().attr("data-c-dt"))
                .unwrap_or_default();

            let date = match dates::parse_date(raw_date) {
                Ok(date) => date,
                Err(_) => {
                    debug!(title = %title, raw_date, "dropping item with unparseable date");
                    continue;
                }
            };

            let mut builder = Article::builder()
                .title(title)
                .description(description.trim())
                .creation_date(date)
                .source(resource.source().as_str());
            if let Some(link) = anchor.value().attr("href") {
                builder = builder.link(link.trim());
            }
            articles.push(builder.build()?);
        }

        if articles.is_empty() {
            return Err(AggregatorError::NoArticlesFound);
        }
        Ok(articles)
    }
}

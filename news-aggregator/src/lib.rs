pub mod aggregator;
pub mod config;
pub mod dates;
pub mod feed_manager;
pub mod fetcher;
pub mod filters;
pub mod parsers;
pub mod server;
pub mod storage;
pub mod types;

pub use aggregator::NewsAggregator;
pub use feed_manager::FeedManager;
pub use fetcher::{FetchConfig, Fetcher};
pub use filters::{EndDateFilter, Filter, KeywordFilter, SourceFilter, StartDateFilter};
pub use parsers::{Parse, ParserFactory};
pub use storage::Storage;
pub use types::{AggregatorError, Article, Content, Format, Resource, Result, Source};

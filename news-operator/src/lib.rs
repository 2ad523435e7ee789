pub mod admission;
pub mod client;
pub mod controller;
pub mod feed_reconciler;
pub mod hotnews_reconciler;
pub mod manifests;
pub mod store;
pub mod types;

pub use client::{AggregatorClient, ClientConfig, NewsApi, RegistryApi};
pub use controller::Controller;
pub use feed_reconciler::FeedReconciler;
pub use hotnews_reconciler::HotNewsReconciler;
pub use store::{ResourceKind, Store, WatchEvent, FEED_GROUPS_NAME};
pub use types::{
    Condition, ConditionType, Feed, FeedGroups, FeedSpec, FeedStatus, HotNews, HotNewsSpec,
    HotNewsStatus, ObjectKey, ObjectMeta, OperatorError, Result, SummaryConfig,
};

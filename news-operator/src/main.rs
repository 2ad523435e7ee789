use news_operator::controller::Controller;
use news_operator::store::ResourceKind;
use news_operator::{
    manifests, AggregatorClient, ClientConfig, FeedReconciler, HotNewsReconciler, Store,
};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = client_config_from_env();
    info!(base_url = %config.base_url, "starting controllers");

    let store = Store::new();
    let registry = AggregatorClient::new(config.clone())?;
    let news = AggregatorClient::new(config.clone())?;

    let feed_reconciler = Arc::new(FeedReconciler::new(store.clone(), registry));
    let hotnews_reconciler = Arc::new(HotNewsReconciler::new(
        store.clone(),
        news,
        config.base_url.clone(),
    ));

    let feed_events = store.subscribe();
    let feed_task = tokio::spawn(async move {
        let reconciler = feed_reconciler;
        Controller::new("feed")
            .run(
                feed_events,
                |event| match event.kind {
                    ResourceKind::Feed => vec![event.key.clone()],
                    _ => Vec::new(),
                },
                |key| {
                    let reconciler = Arc::clone(&reconciler);
                    async move { reconciler.reconcile(&key).await }
                },
            )
            .await;
    });

    let hotnews_events = store.subscribe();
    let hotnews_store = store.clone();
    let hotnews_task = tokio::spawn(async move {
        let reconciler = hotnews_reconciler;
        Controller::new("hotnews")
            .run(
                hotnews_events,
                // Feed and feed-group changes feed into every
                // projection in the same namespace.
                move |event| match event.kind {
                    ResourceKind::HotNews => vec![event.key.clone()],
                    ResourceKind::Feed | ResourceKind::FeedGroups => hotnews_store
                        .list_hotnews(&event.key.namespace)
                        .into_iter()
                        .map(|h| h.metadata.key())
                        .collect(),
                },
                |key| {
                    let reconciler = Arc::clone(&reconciler);
                    async move { reconciler.reconcile(&key).await }
                },
            )
            .await;
    });

    // Loaded after the controllers subscribe so every apply event
    // reaches them.
    let manifests_path =
        env::var("MANIFESTS_PATH").unwrap_or_else(|_| "manifests".to_string());
    let applied = manifests::load_dir(&store, &manifests_path)?;
    info!(path = %manifests_path, applied, "manifest load complete");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    feed_task.abort();
    hotnews_task.abort();
    Ok(())
}

fn client_config_from_env() -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Ok(url) = env::var("AGGREGATOR_URL") {
        config.base_url = url;
    }
    if let Ok(skip) = env::var("INSECURE_SKIP_VERIFY") {
        config.accept_invalid_certs = skip == "1" || skip.eq_ignore_ascii_case("true");
    }
    config
}

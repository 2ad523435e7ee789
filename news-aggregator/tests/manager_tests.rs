use news_aggregator::feed_manager::{DictionaryEntry, NO_AVAILABLE_SOURCES};
use news_aggregator::{
    AggregatorError, FeedManager, Format, NewsAggregator, ParserFactory, SourceFilter,
};
use std::collections::HashSet;
use std::fs;

fn manager_in(dir: &tempfile::TempDir) -> FeedManager {
    FeedManager::new(
        dir.path().join("storage"),
        dir.path().join("config/feeds_dictionary.json"),
    )
    .unwrap()
}

#[test]
fn seeds_and_persists_the_default_dictionary() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_in(&dir);

    assert!(manager.is_supported("bbc-world"));
    assert!(manager.is_supported("nbc-news"));
    assert!(!manager.is_supported("golos-ameriki"));
    assert!(dir.path().join("config/feeds_dictionary.json").is_file());

    // No snapshots yet.
    assert_eq!(manager.available_sources().unwrap(), NO_AVAILABLE_SOURCES);
}

#[test]
fn register_update_delete_round_trip_through_the_config_file() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut manager = manager_in(&dir);
        manager
            .register_source("golos-ameriki", "https://golosameriki.com/rss", Format::Rss)
            .unwrap();
        // Registering an existing name is an update.
        manager
            .register_source("golos-ameriki", "https://golosameriki.com/feed", Format::Rss)
            .unwrap();
        manager.delete_source("bbc-world").unwrap();
        // Delete is idempotent.
        manager.delete_source("bbc-world").unwrap();
    }

    let reloaded = manager_in(&dir);
    assert!(reloaded.is_supported("golos-ameriki"));
    assert!(!reloaded.is_supported("bbc-world"));
    let entry: DictionaryEntry = reloaded
        .dictionary()
        .into_iter()
        .find(|e| e.source == "golos-ameriki")
        .unwrap();
    assert_eq!(entry.link, "https://golosameriki.com/feed");
}

#[test]
fn register_rejects_bad_names_and_links() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_in(&dir);

    assert!(matches!(
        manager.register_source("has space", "https://x/", Format::Rss),
        Err(AggregatorError::InvalidSource(_))
    ));
    assert!(matches!(
        manager.register_source("ok-name", "not a url", Format::Rss),
        Err(AggregatorError::InvalidUrl(_))
    ));
}

#[test]
fn all_resources_cover_exactly_the_stored_dictionary_sources() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_in(&dir);
    let storage = dir.path().join("storage");

    let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel><item><title>Hi</title><description>World</description><pubDate>Thu, 28 May 2020 14:15:22 +0000</pubDate></item></channel></rss>"#;
    fs::write(storage.join("bbc-world_20240101.xml"), rss).unwrap();
    fs::write(storage.join("bbc-world_20240102.xml"), rss).unwrap();
    fs::write(storage.join("abc-news_20240101.xml"), rss).unwrap();
    // Stored but absent from the dictionary: must not surface.
    fs::write(storage.join("stray_20240101.xml"), rss).unwrap();

    let resources = manager.all_resources().unwrap();
    assert_eq!(resources.len(), 3);
    let sources: HashSet<&str> = resources.iter().map(|r| r.source().as_str()).collect();
    assert_eq!(sources, HashSet::from(["bbc-world", "abc-news"]));

    assert_eq!(manager.available_sources().unwrap(), "abc-news,bbc-world,stray");
}

#[test]
fn selected_resources_fail_fast_on_unknown_names() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_in(&dir);

    let err = manager
        .selected_resources(&["bbc-world".to_string(), "golos-ameriki".to_string()])
        .unwrap_err();
    assert!(matches!(err, AggregatorError::UnknownSource(name) if name == "golos-ameriki"));
}

#[test]
fn refresh_target_resolves_without_touching_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_in(&dir);

    let (source, extension, link) = manager.refresh_target("bbc-world").unwrap();
    assert_eq!(source.as_str(), "bbc-world");
    assert_eq!(extension, "xml");
    assert_eq!(link, "https://feeds.bbci.co.uk/news/world/rss.xml");

    let (_, extension, _) = manager.refresh_target("usa-today").unwrap();
    assert_eq!(extension, "html");

    assert!(matches!(
        manager.refresh_target("nbc-news"),
        Err(AggregatorError::FormatNotRemotelyRefreshable(Format::Json))
    ));
    assert!(matches!(
        manager.refresh_target("golos-ameriki"),
        Err(AggregatorError::UnknownSource(_))
    ));

    // The snapshot write path the refresh ends in.
    manager
        .store_snapshot(&source, extension, b"<rss/>")
        .unwrap();
    assert_eq!(manager.available_sources().unwrap(), "bbc-world");
}

#[tokio::test]
async fn json_sources_refuse_remote_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_in(&dir);

    let err = manager.update_resource("nbc-news").await.unwrap_err();
    assert!(matches!(
        err,
        AggregatorError::FormatNotRemotelyRefreshable(Format::Json)
    ));

    let err = manager.update_resource("golos-ameriki").await.unwrap_err();
    assert!(matches!(err, AggregatorError::UnknownSource(_)));
}

#[test]
fn pipeline_filters_apply_once_to_the_accumulated_list() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_in(&dir);
    let storage = dir.path().join("storage");

    let bbc = r#"<?xml version="1.0"?><rss version="2.0"><channel><item><title>bbc item</title><description>d</description><pubDate>Thu, 28 May 2020 14:15:22 +0000</pubDate></item></channel></rss>"#;
    let abc = r#"<?xml version="1.0"?><rss version="2.0"><channel><item><title>abc item</title><description>d</description><pubDate>Fri, 29 May 2020 14:15:22 +0000</pubDate></item></channel></rss>"#;
    fs::write(storage.join("bbc-world_20240101.xml"), bbc).unwrap();
    fs::write(storage.join("abc-news_20240101.xml"), abc).unwrap();

    let resources = manager
        .selected_resources(&["bbc-world".to_string(), "abc-news".to_string()])
        .unwrap();

    let mut aggregator = NewsAggregator::new(Some(ParserFactory::new())).unwrap();
    aggregator.add_filter(Box::new(SourceFilter::new(["bbc-world"])));
    let filtered = aggregator.aggregate_multiple(&resources).unwrap();

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].source, "bbc-world");
    // The unfiltered accumulation keeps resource order.
    assert_eq!(aggregator.articles().len(), 2);
    assert_eq!(aggregator.articles()[0].title, "bbc item");
}

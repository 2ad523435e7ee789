use async_trait::async_trait;
use news_operator::feed_reconciler::FINALIZER;
use news_operator::store::FEED_GROUPS_NAME;
use news_operator::types::{
    ConditionType, Feed, FeedGroups, HotNews, HotNewsSpec, ObjectKey, ObjectMeta, OperatorError,
    SummaryConfig,
};
use news_operator::{Controller, FeedReconciler, HotNewsReconciler, NewsApi, RegistryApi, Store};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockRegistry {
    calls: Arc<Mutex<Vec<String>>>,
    fail_status: Mutex<Option<u16>>,
}

impl MockRegistry {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_with(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    fn succeed(&self) {
        *self.fail_status.lock().unwrap() = None;
    }

    fn maybe_fail(&self) -> Result<(), OperatorError> {
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(OperatorError::Registry {
                status,
                detail: "injected".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistryApi for &MockRegistry {
    async fn create_source(&self, name: &str, link: &str) -> Result<(), OperatorError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create {name} {link}"));
        self.maybe_fail()
    }

    async fn update_source(&self, name: &str, link: &str) -> Result<(), OperatorError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("update {name} {link}"));
        self.maybe_fail()
    }

    async fn delete_source(&self, name: &str) -> Result<(), OperatorError> {
        self.calls.lock().unwrap().push(format!("delete {name}"));
        self.maybe_fail()
    }
}

struct MockNews {
    titles: Vec<String>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockNews {
    fn new(titles: &[&str]) -> Self {
        Self {
            titles: titles.iter().map(|t| t.to_string()).collect(),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl NewsApi for &MockNews {
    async fn fetch_titles(&self, url: &str) -> Result<Vec<String>, OperatorError> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(self.titles.clone())
    }
}

fn condition_types(feed: &Feed) -> Vec<ConditionType> {
    feed.status
        .conditions
        .iter()
        .map(|c| c.condition_type)
        .collect()
}

#[tokio::test]
async fn new_feed_is_registered_once() {
    let store = Store::new();
    let registry = MockRegistry::default();
    let reconciler = FeedReconciler::new(store.clone(), &registry);

    store
        .apply_feed(Feed::new("default", "bbc-world", "https://feeds.bbci.co.uk/news/world/rss.xml"))
        .unwrap();
    let key = ObjectKey::new("default", "bbc-world");

    reconciler.reconcile(&key).await.unwrap();

    assert_eq!(
        registry.calls(),
        vec!["create bbc-world https://feeds.bbci.co.uk/news/world/rss.xml"]
    );
    let feed = store.get_feed(&key).unwrap();
    assert_eq!(condition_types(&feed), vec![ConditionType::Added]);
    assert!(feed.metadata.finalizers.contains(&FINALIZER.to_string()));

    // Nothing changed; a second pass is a no-op with no new condition.
    reconciler.reconcile(&key).await.unwrap();
    assert_eq!(registry.calls().len(), 1);
    let feed = store.get_feed(&key).unwrap();
    assert_eq!(feed.status.conditions.len(), 1);
}

#[test]
fn reapplying_an_unchanged_manifest_is_accepted_without_a_generation_bump() {
    let store = Store::new();
    let key = ObjectKey::new("default", "bbc-world");

    store
        .apply_feed(Feed::new("default", "bbc-world", "https://feeds.bbci.co.uk/rss.xml"))
        .unwrap();
    let first = store.get_feed(&key).unwrap();

    // Asserting the same desired state again is the normal flow; the
    // second apply arrives with a fresh UID.
    store
        .apply_feed(Feed::new("default", "bbc-world", "https://feeds.bbci.co.uk/rss.xml"))
        .unwrap();
    let second = store.get_feed(&key).unwrap();

    assert_eq!(second.metadata.uid, first.metadata.uid);
    assert_eq!(second.metadata.generation, 1);
}

#[tokio::test]
async fn spec_change_triggers_update() {
    let store = Store::new();
    let registry = MockRegistry::default();
    let reconciler = FeedReconciler::new(store.clone(), &registry);

    let feed = Feed::new("default", "abc-news", "https://feeds.abcnews.com/abcnews/a.xml");
    store.apply_feed(feed.clone()).unwrap();
    let key = feed.metadata.key();
    reconciler.reconcile(&key).await.unwrap();

    let mut changed = store.get_feed(&key).unwrap();
    changed.spec.link = "https://feeds.abcnews.com/abcnews/b.xml".to_string();
    store.apply_feed(changed).unwrap();
    let generation = store.get_feed(&key).unwrap().metadata.generation;
    assert_eq!(generation, 2);

    reconciler.reconcile(&key).await.unwrap();

    assert_eq!(
        registry.calls(),
        vec![
            "create abc-news https://feeds.abcnews.com/abcnews/a.xml",
            "update abc-news https://feeds.abcnews.com/abcnews/b.xml",
        ]
    );
    let feed = store.get_feed(&key).unwrap();
    assert_eq!(
        condition_types(&feed),
        vec![ConditionType::Added, ConditionType::Updated]
    );

    // Same generation again: no third call.
    reconciler.reconcile(&key).await.unwrap();
    assert_eq!(registry.calls().len(), 2);
}

#[tokio::test]
async fn deletion_runs_finalizer_then_removes_record() {
    let store = Store::new();
    let registry = MockRegistry::default();
    let reconciler = FeedReconciler::new(store.clone(), &registry);

    let feed = Feed::new("default", "usa-today", "https://usatoday.com/news");
    store.apply_feed(feed.clone()).unwrap();
    let key = feed.metadata.key();
    reconciler.reconcile(&key).await.unwrap();

    // The finalizer keeps the record around until the registry delete
    // goes through.
    store.delete_feed(&key).unwrap();
    let pending = store.get_feed(&key).unwrap();
    assert!(pending.metadata.deletion_timestamp.is_some());

    reconciler.reconcile(&key).await.unwrap();

    assert_eq!(
        registry.calls(),
        vec![
            "create usa-today https://usatoday.com/news",
            "delete usa-today",
        ]
    );
    assert!(store.get_feed(&key).is_none());
}

#[tokio::test]
async fn transient_registry_error_is_requeued_without_condition() {
    let store = Store::new();
    let registry = MockRegistry::default();
    registry.fail_with(503);
    let reconciler = FeedReconciler::new(store.clone(), &registry);

    let feed = Feed::new("default", "bbc-world", "https://feeds.bbci.co.uk/rss.xml");
    store.apply_feed(feed.clone()).unwrap();
    let key = feed.metadata.key();

    let err = reconciler.reconcile(&key).await.unwrap_err();
    assert!(err.is_transient());
    assert!(store.get_feed(&key).unwrap().status.conditions.is_empty());

    // Once the registry recovers the same pass succeeds.
    registry.succeed();
    reconciler.reconcile(&key).await.unwrap();
    let feed = store.get_feed(&key).unwrap();
    assert_eq!(condition_types(&feed), vec![ConditionType::Added]);
}

#[tokio::test]
async fn permanent_registry_error_writes_failed_condition() {
    let store = Store::new();
    let registry = MockRegistry::default();
    registry.fail_with(400);
    let reconciler = FeedReconciler::new(store.clone(), &registry);

    let feed = Feed::new("default", "bbc-world", "https://feeds.bbci.co.uk/rss.xml");
    store.apply_feed(feed.clone()).unwrap();
    let key = feed.metadata.key();

    // Permanent failures do not requeue.
    reconciler.reconcile(&key).await.unwrap();

    let feed = store.get_feed(&key).unwrap();
    assert_eq!(condition_types(&feed), vec![ConditionType::Failed]);
    let last = feed.last_condition().unwrap();
    assert!(!last.status);
    assert!(last.reason.as_deref().unwrap().contains("400"));

    // A Failed feed is retried as a fresh registration.
    registry.succeed();
    reconciler.reconcile(&key).await.unwrap();
    let feed = store.get_feed(&key).unwrap();
    assert_eq!(
        condition_types(&feed),
        vec![ConditionType::Failed, ConditionType::Added]
    );
}

fn hotnews(namespace: &str, name: &str, spec: HotNewsSpec) -> HotNews {
    HotNews {
        metadata: ObjectMeta::new(namespace, name),
        spec,
        status: Default::default(),
    }
}

fn seed_feed(store: &Store, namespace: &str, name: &str) {
    let link = format!("https://example.com/{name}/rss.xml");
    store.apply_feed(Feed::new(namespace, name, &link)).unwrap();
}

#[tokio::test]
async fn hotnews_status_truncates_titles() {
    let store = Store::new();
    seed_feed(&store, "default", "bbc-world");
    let news = MockNews::new(&["first", "second", "third"]);
    let reconciler = HotNewsReconciler::new(store.clone(), &news, "https://localhost:8443");

    let record = hotnews(
        "default",
        "morning-brief",
        HotNewsSpec {
            keywords: vec!["news".to_string()],
            date_start: None,
            date_end: None,
            feeds: vec!["bbc-world".to_string()],
            feed_groups: Vec::new(),
            summary_config: SummaryConfig { titles_count: 2 },
        },
    );
    store.apply_hotnews(record.clone()).unwrap();
    let key = record.metadata.key();

    reconciler.reconcile(&key).await.unwrap();

    assert_eq!(
        news.requested.lock().unwrap().clone(),
        vec!["https://localhost:8443/news?keywords=news&sources=bbc-world"]
    );
    let status = store.get_hotnews(&key).unwrap().status;
    assert_eq!(status.articles_titles, vec!["first", "second"]);
    assert_eq!(status.articles_count, 2);
    assert!(status.news_link.ends_with("?keywords=news&sources=bbc-world"));
}

#[tokio::test]
async fn hotnews_unions_feeds_and_groups() {
    let store = Store::new();
    for name in ["bbc-world", "abc-news", "washington-times"] {
        seed_feed(&store, "default", name);
    }
    store
        .apply_feed_groups(FeedGroups {
            metadata: ObjectMeta::new("default", FEED_GROUPS_NAME),
            data: HashMap::from([(
                "world".to_string(),
                "abc-news,bbc-world".to_string(),
            )]),
        })
        .unwrap();

    let news = MockNews::new(&["only"]);
    let reconciler = HotNewsReconciler::new(store.clone(), &news, "https://localhost:8443");

    // bbc-world appears both directly and through the group; the
    // final source list is deduplicated and sorted.
    let record = hotnews(
        "default",
        "world-wrap",
        HotNewsSpec {
            keywords: vec!["election".to_string()],
            date_start: chrono::NaiveDate::from_ymd_opt(2024, 6, 16),
            date_end: chrono::NaiveDate::from_ymd_opt(2024, 6, 21),
            feeds: vec!["bbc-world".to_string(), "washington-times".to_string()],
            feed_groups: vec!["world".to_string()],
            summary_config: SummaryConfig { titles_count: 10 },
        },
    );
    store.apply_hotnews(record.clone()).unwrap();
    let key = record.metadata.key();

    reconciler.reconcile(&key).await.unwrap();

    let status = store.get_hotnews(&key).unwrap().status;
    assert_eq!(
        status.news_link,
        "https://localhost:8443/news?keywords=election\
         &sources=abc-news,bbc-world,washington-times\
         &date-start=2024-06-16&date-end=2024-06-21"
    );
    assert_eq!(status.articles_count, 1);
}

#[test]
fn manifest_directory_is_loaded_through_admission() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("10-feed.json"),
        r#"{"kind":"Feed",
            "metadata":{"name":"bbc-world","namespace":"default"},
            "spec":{"name":"bbc-world","link":"https://feeds.bbci.co.uk/rss.xml"}}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("20-groups.json"),
        &format!(
            r#"{{"kind":"FeedGroups",
                "metadata":{{"name":"{FEED_GROUPS_NAME}","namespace":"default"}},
                "data":{{"world":"bbc-world"}}}}"#
        ),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("30-hotnews.json"),
        r#"{"kind":"HotNews",
            "metadata":{"name":"morning-brief","namespace":"default"},
            "spec":{"keywords":["news"],"feeds":[],"feedGroups":["world"],
                    "summaryConfig":{"titlesCount":3}}}"#,
    )
    .unwrap();

    let store = Store::new();
    let applied = news_operator::manifests::load_dir(&store, dir.path()).unwrap();
    assert_eq!(applied, 3);
    assert!(store
        .get_feed(&ObjectKey::new("default", "bbc-world"))
        .is_some());
    assert!(store
        .get_hotnews(&ObjectKey::new("default", "morning-brief"))
        .is_some());

    // Records that fail admission abort the load.
    std::fs::write(
        dir.path().join("40-bad.json"),
        r#"{"kind":"Feed",
            "metadata":{"name":"bad","namespace":"default"},
            "spec":{"name":"bad","link":"not a url"}}"#,
    )
    .unwrap();
    let fresh = Store::new();
    assert!(news_operator::manifests::load_dir(&fresh, dir.path()).is_err());
}

#[tokio::test]
async fn controller_reconciles_keys_from_watch_events() {
    let store = Store::new();
    let events = store.subscribe();
    let seen: Arc<Mutex<Vec<ObjectKey>>> = Arc::new(Mutex::new(Vec::new()));

    let recorder = Arc::clone(&seen);
    let handle = tokio::spawn(async move {
        Controller::new("test")
            .run(
                events,
                |event| vec![event.key.clone()],
                move |key| {
                    let recorder = Arc::clone(&recorder);
                    async move {
                        recorder.lock().unwrap().push(key);
                        Ok::<(), OperatorError>(())
                    }
                },
            )
            .await;
    });

    store
        .apply_feed(Feed::new("default", "bbc-world", "https://x/rss.xml"))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.abort();
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[ObjectKey::new("default", "bbc-world")]
    );
}

#[tokio::test]
async fn hotnews_fetch_failure_keeps_previous_status() {
    struct FailingNews;

    #[async_trait]
    impl NewsApi for FailingNews {
        async fn fetch_titles(&self, _url: &str) -> Result<Vec<String>, OperatorError> {
            Err(OperatorError::Transient("aggregator unreachable".into()))
        }
    }

    let store = Store::new();
    seed_feed(&store, "default", "bbc-world");
    let reconciler = HotNewsReconciler::new(store.clone(), FailingNews, "https://localhost:8443");

    let record = hotnews(
        "default",
        "morning-brief",
        HotNewsSpec {
            keywords: vec!["news".to_string()],
            date_start: None,
            date_end: None,
            feeds: vec!["bbc-world".to_string()],
            feed_groups: Vec::new(),
            summary_config: SummaryConfig { titles_count: 2 },
        },
    );
    store.apply_hotnews(record.clone()).unwrap();
    let key = record.metadata.key();

    let err = reconciler.reconcile(&key).await.unwrap_err();
    assert!(err.is_transient());
    let status = store.get_hotnews(&key).unwrap().status;
    assert!(status.news_link.is_empty());
    assert_eq!(status.articles_count, 0);
}

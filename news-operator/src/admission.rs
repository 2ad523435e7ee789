//! Validating admission for Feed, HotNews and the feed-group map.
//!
//! Violations accumulate and are returned together so a client sees
//! every problem in one round trip.

use crate::types::{Feed, FeedGroups, FieldError, HotNews, OperatorError, Result};
use url::Url;

const MAX_NAME_LEN: usize = 20;

/// Validates a Feed on create/update against its siblings in the same
/// namespace.
pub fn validate_feed(feed: &Feed, existing: &[Feed]) -> Result<()> {
    let mut errors = Vec::new();

    check_source_name("spec.name", &feed.spec.name, &mut errors);

    match Url::parse(&feed.spec.link) {
        Ok(url) if !url.cannot_be_a_base() && url.has_host() => {}
        _ => errors.push(FieldError {
            path: "spec.link".to_string(),
            detail: format!("{} is not an absolute URL", feed.spec.link),
        }),
    }

    // Self is excluded by store identity (namespace + object name),
    // not UID: a re-applied manifest arrives with a fresh UID.
    let duplicate = existing.iter().any(|other| {
        other.metadata.namespace == feed.metadata.namespace
            && other.metadata.name != feed.metadata.name
            && other.spec.name == feed.spec.name
    });
    if duplicate {
        errors.push(FieldError {
            path: "spec.name".to_string(),
            detail: format!(
                "{} is already used by another feed in namespace {}",
                feed.spec.name, feed.metadata.namespace
            ),
        });
    }

    finish(errors)
}

/// Validates a HotNews on create/update against the Feeds and the
/// feed-group map in its namespace.
pub fn validate_hotnews(
    hotnews: &HotNews,
    feeds: &[Feed],
    groups: Option<&FeedGroups>,
) -> Result<()> {
    let mut errors = Vec::new();
    let spec = &hotnews.spec;

    if spec.keywords.iter().all(|k| k.trim().is_empty()) {
        errors.push(FieldError {
            path: "spec.keywords".to_string(),
            detail: "at least one keyword is required".to_string(),
        });
    }

    match (spec.date_start, spec.date_end) {
        (None, None) => {}
        (Some(start), Some(end)) => {
            if end <= start {
                errors.push(FieldError {
                    path: "spec.dateEnd".to_string(),
                    detail: format!("{} must be after dateStart {}", end, start),
                });
            }
        }
        _ => errors.push(FieldError {
            path: "spec.dateStart".to_string(),
            detail: "dateStart and dateEnd must be set together".to_string(),
        }),
    }

    if spec.feeds.is_empty() && spec.feed_groups.is_empty() {
        errors.push(FieldError {
            path: "spec.feeds".to_string(),
            detail: "at least one of feeds or feedGroups is required".to_string(),
        });
    }

    for name in &spec.feeds {
        let known = feeds.iter().any(|feed| {
            feed.metadata.namespace == hotnews.metadata.namespace && &feed.spec.name == name
        });
        if !known {
            errors.push(FieldError {
                path: "spec.feeds".to_string(),
                detail: format!(
                    "feed {} does not exist in namespace {}",
                    name, hotnews.metadata.namespace
                ),
            });
        }
    }

    for group in &spec.feed_groups {
        let known = groups
            .map(|map| map.data.contains_key(group))
            .unwrap_or(false);
        if !known {
            errors.push(FieldError {
                path: "spec.feedGroups".to_string(),
                detail: format!("feed group {} is not defined", group),
            });
        }
    }

    finish(errors)
}

/// Validates the feed-group map against the Feeds in its namespace.
pub fn validate_feed_groups(groups: &FeedGroups, feeds: &[Feed]) -> Result<()> {
    let mut errors = Vec::new();

    for (group, sources) in &groups.data {
        if sources.trim().is_empty() {
            errors.push(FieldError {
                path: format!("data.{}", group),
                detail: "value must not be empty".to_string(),
            });
            continue;
        }
        for source in sources.split(',') {
            let known = feeds.iter().any(|feed| {
                feed.metadata.namespace == groups.metadata.namespace
                    && feed.spec.name == source.trim()
            });
            if !known {
                errors.push(FieldError {
                    path: format!("data.{}", group),
                    detail: format!(
                        "{} does not refer to an existing feed in namespace {}",
                        source, groups.metadata.namespace
                    ),
                });
            }
        }
    }

    finish(errors)
}

fn check_source_name(path: &str, name: &str, errors: &mut Vec<FieldError>) {
    if name.is_empty() {
        errors.push(FieldError {
            path: path.to_string(),
            detail: "must not be empty".to_string(),
        });
        return;
    }
    if name.len() > MAX_NAME_LEN {
        errors.push(FieldError {
            path: path.to_string(),
            detail: format!("{} exceeds {} characters", name, MAX_NAME_LEN),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        errors.push(FieldError {
            path: path.to_string(),
            detail: format!("{} contains characters outside [A-Za-z0-9_-]", name),
        });
    }
}

fn finish(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(OperatorError::AdmissionRejected(errors))
    }
}

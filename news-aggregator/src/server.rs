//! HTTP surface of the aggregator.

use crate::aggregator::NewsAggregator;
use crate::feed_manager::FeedManager;
use crate::filters::{self, EndDateFilter, KeywordFilter, StartDateFilter};
use crate::parsers::ParserFactory;
use crate::types::{AggregatorError, Article, Format};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<RwLock<FeedManager>>,
    pub started: Instant,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/news", get(get_news))
        .route(
            "/sources",
            get(get_sources)
                .post(post_source)
                .put(put_source)
                .delete(delete_source),
        )
        .route("/update", get(update_source_snapshot))
        .route("/feeds", get(get_feeds))
        .route("/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub sources: Option<String>,
    pub keywords: Option<String>,
    #[serde(rename = "date-start")]
    pub date_start: Option<String>,
    #[serde(rename = "date-end")]
    pub date_end: Option<String>,
    #[serde(rename = "sort-order")]
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SourceBody {
    pub name: String,
    pub url: String,
    pub format: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    pub source: String,
}

async fn get_news(State(state): State<AppState>, Query(query): Query<NewsQuery>) -> Response {
    let manager = state.manager.read().await;

    let resources = match &query.sources {
        Some(raw) if !raw.is_empty() => {
            let names: Vec<String> = raw.split(',').map(str::to_string).collect();
            manager.selected_resources(&names)
        }
        _ => manager.all_resources(),
    };
    let resources = match resources {
        Ok(resources) => resources,
        Err(e @ AggregatorError::UnknownSource(_)) => {
            return error_response(StatusCode::BAD_REQUEST, &e)
        }
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    };
    drop(manager);

    let mut aggregator = match NewsAggregator::new(Some(ParserFactory::new())) {
        Ok(aggregator) => aggregator,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    };

    if let Some(raw) = &query.keywords {
        if !raw.is_empty() {
            let keywords: Vec<String> = raw.split(',').map(str::to_string).collect();
            aggregator.add_filter(Box::new(KeywordFilter::new(&keywords)));
        }
    }
    if let Some(raw) = &query.date_start {
        match StartDateFilter::new(raw) {
            Ok(filter) => aggregator.add_filter(Box::new(filter)),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
        }
    }
    if let Some(raw) = &query.date_end {
        match EndDateFilter::new(raw) {
            Ok(filter) => aggregator.add_filter(Box::new(filter)),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
        }
    }

    let mut articles: Vec<Article> = match aggregator.aggregate_multiple(&resources) {
        Ok(articles) => articles,
        Err(e) => {
            error!(error = %e, "pipeline failure");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e);
        }
    };

    match query.sort_order.as_deref() {
        None | Some("asc") => filters::sort_ascending(&mut articles),
        Some("desc") => filters::sort_descending(&mut articles),
        Some(other) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &AggregatorError::InvalidConfiguration(format!("unknown sort order: {}", other)),
            )
        }
    }

    (StatusCode::OK, Json(articles)).into_response()
}

async fn get_sources(State(state): State<AppState>) -> Response {
    let manager = state.manager.read().await;
    (StatusCode::OK, Json(manager.dictionary())).into_response()
}

async fn post_source(State(state): State<AppState>, Json(body): Json<SourceBody>) -> Response {
    mutate_source(&state, &body, StatusCode::CREATED).await
}

async fn put_source(State(state): State<AppState>, Json(body): Json<SourceBody>) -> Response {
    mutate_source(&state, &body, StatusCode::OK).await
}

async fn mutate_source(state: &AppState, body: &SourceBody, success: StatusCode) -> Response {
    let format = match Format::parse(&body.format) {
        Ok(format) => format,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };
    let mut manager = state.manager.write().await;
    let result = if success == StatusCode::CREATED {
        manager.register_source(&body.name, &body.url, format)
    } else {
        manager.update_source(&body.name, &body.url, format)
    };
    match result {
        Ok(()) => (success, Json(json!({"name": body.name}))).into_response(),
        Err(e @ (AggregatorError::InvalidSource(_) | AggregatorError::InvalidUrl(_))) => {
            error_response(StatusCode::BAD_REQUEST, &e)
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    }
}

async fn delete_source(State(state): State<AppState>, Json(body): Json<DeleteBody>) -> Response {
    let mut manager = state.manager.write().await;
    match manager.delete_source(&body.name) {
        Ok(()) => (StatusCode::OK, Json(json!({"name": body.name}))).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    }
}

async fn update_source_snapshot(
    State(state): State<AppState>,
    Query(query): Query<UpdateQuery>,
) -> Response {
    // The remote fetch itself runs without the manager lock; holding
    // it across the request would block source mutations for the
    // whole fetch timeout.
    let (source, extension, link, fetcher) = {
        let manager = state.manager.read().await;
        match manager.refresh_target(&query.source) {
            Ok((source, extension, link)) => (source, extension, link, manager.fetcher().clone()),
            Err(
                e @ (AggregatorError::UnknownSource(_)
                | AggregatorError::FormatNotRemotelyRefreshable(_)),
            ) => return error_response(StatusCode::BAD_REQUEST, &e),
            Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
        }
    };

    let body = match fetcher.fetch_body(&link).await {
        Ok(body) => body,
        Err(e) => {
            error!(source = %source, error = %e, "snapshot refresh failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e);
        }
    };

    let manager = state.manager.read().await;
    match manager.store_snapshot(&source, extension, &body) {
        Ok(()) => (StatusCode::OK, Json(json!({"source": query.source}))).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    }
}

async fn get_feeds(State(state): State<AppState>) -> Response {
    let manager = state.manager.read().await;
    (StatusCode::OK, Json(manager.feed_groups().clone())).into_response()
}

async fn get_status(State(state): State<AppState>) -> Response {
    let uptime = state.started.elapsed().as_secs();
    let body = format!(
        "version: {}\nuptime: {}s\n",
        env!("CARGO_PKG_VERSION"),
        uptime
    );
    (StatusCode::OK, body).into_response()
}

fn error_response(status: StatusCode, err: &AggregatorError) -> Response {
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

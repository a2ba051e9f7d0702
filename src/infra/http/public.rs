use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    application::{error::HttpError, repos::ThreadsRepo},
    cache::{CacheError, CachedView, Frontends, Key, ViewCache},
    domain::board::BoardScope,
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

const JSON_CONTENT_TYPE: &str = "application/json";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Clone)]
pub struct HttpState {
    pub cache: ViewCache,
    pub frontends: Frontends,
    pub repo: Arc<dyn ThreadsRepo>,
}

pub fn build_router(state: HttpState) -> Router {
    let api_routes = Router::new()
        .route("/api/threads/{id}", get(api_thread))
        .route("/api/boards/{board}", get(api_board_page))
        .route("/api/boards/{board}/catalog", get(api_catalog));

    let html_routes = Router::new()
        .route("/{board}/", get(board_page))
        .route("/{board}/catalog", get(catalog))
        .route("/{board}/{thread}", get(thread));

    api_routes
        .merge(html_routes)
        .route("/_health/db", get(public_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThreadQuery {
    last: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: u32,
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Json,
    Html,
}

#[derive(Debug, Error)]
#[error("view was built without markup")]
struct MissingMarkup;

async fn api_thread(
    State(state): State<HttpState>,
    Path(id): Path<u64>,
    Query(query): Query<ThreadQuery>,
    headers: HeaderMap,
) -> Response {
    let result = state
        .cache
        .fetch_or_build(Key::thread(id, query.last), state.frontends.thread.clone())
        .await;
    view_response(result, Format::Json, &headers)
}

async fn api_board_page(
    State(state): State<HttpState>,
    Path(board): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    let scope = match board.parse::<BoardScope>() {
        Ok(scope) => scope,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let result = state
        .cache
        .fetch_or_build(
            Key::board_page(scope, query.page),
            state.frontends.board_page.clone(),
        )
        .await;
    view_response(result, Format::Json, &headers)
}

async fn api_catalog(
    State(state): State<HttpState>,
    Path(board): Path<String>,
    headers: HeaderMap,
) -> Response {
    let scope = match board.parse::<BoardScope>() {
        Ok(scope) => scope,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let result = state
        .cache
        .fetch_or_build(Key::catalog(scope), state.frontends.catalog.clone())
        .await;
    view_response(result, Format::Json, &headers)
}

async fn board_page(
    State(state): State<HttpState>,
    Path(board): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    let scope = match board.parse::<BoardScope>() {
        Ok(scope) => scope,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let result = state
        .cache
        .fetch_or_build(
            Key::board_page(scope, query.page),
            state.frontends.board_page.clone(),
        )
        .await;
    view_response(result, Format::Html, &headers)
}

async fn catalog(
    State(state): State<HttpState>,
    Path(board): Path<String>,
    headers: HeaderMap,
) -> Response {
    let scope = match board.parse::<BoardScope>() {
        Ok(scope) => scope,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let result = state
        .cache
        .fetch_or_build(Key::catalog(scope), state.frontends.catalog.clone())
        .await;
    view_response(result, Format::Html, &headers)
}

async fn thread(
    State(state): State<HttpState>,
    Path((board, id)): Path<(String, u64)>,
    Query(query): Query<ThreadQuery>,
    headers: HeaderMap,
) -> Response {
    let scope = match board.parse::<BoardScope>() {
        Ok(scope) => scope,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let result = state
        .cache
        .fetch_or_build(Key::thread(id, query.last), state.frontends.thread.clone())
        .await
        .and_then(|view| {
            // Threads are cached once for every board; the path board only
            // has to agree with the thread's own.
            let on_board = match &scope {
                BoardScope::All => true,
                BoardScope::Board(name) => view
                    .data()
                    .as_thread()
                    .is_some_and(|thread| &thread.board == name),
            };
            if on_board {
                Ok(view)
            } else {
                Err(CacheError::NotFound)
            }
        });
    view_response(result, Format::Html, &headers)
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.repo.health_check().await)
}

fn view_response(
    result: Result<CachedView, CacheError>,
    format: Format,
    headers: &HeaderMap,
) -> Response {
    let view = match result {
        Ok(view) => view,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let etag = format!("\"{}\"", view.counter());
    if etag_matches(headers, &etag) {
        return with_validators(StatusCode::NOT_MODIFIED.into_response(), &etag);
    }

    let (body, content_type) = match format {
        Format::Json => (view.encoded().clone(), JSON_CONTENT_TYPE),
        Format::Html => match view.markup() {
            Some(markup) => (markup.clone(), HTML_CONTENT_TYPE),
            None => {
                return HttpError::from_error(
                    "infra::http::view_response",
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    &MissingMarkup,
                )
                .into_response();
            }
        },
    };

    with_validators(bytes_response(body, content_type), &etag)
}

fn bytes_response(body: Bytes, content_type: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn with_validators(mut response: Response, etag: &str) -> Response {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert(ETAG, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|candidate| candidate.trim().trim_start_matches("W/"))
        .any(|candidate| candidate == "*" || candidate == etag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn etag_matching_handles_lists_and_weak_tags() {
        assert!(etag_matches(&headers("\"7\""), "\"7\""));
        assert!(etag_matches(&headers("\"1\", W/\"7\""), "\"7\""));
        assert!(etag_matches(&headers("*"), "\"7\""));
        assert!(!etag_matches(&headers("\"8\""), "\"7\""));
        assert!(!etag_matches(&HeaderMap::new(), "\"7\""));
    }
}

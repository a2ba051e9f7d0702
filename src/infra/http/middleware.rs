use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag the request with an id and run it inside a `request` span, so view
/// builds started by the handler are logged under the request that
/// triggered them.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    let span = info_span!(
        "request",
        request_id = %ctx.request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).instrument(span).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "boardcache::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "boardcache::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

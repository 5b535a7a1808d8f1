//! Request tracing

use axum::{body::Body, Router};
use http::{header, Request, Response};
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::{info_span, Span};

/// Wraps `router` in a `TraceLayer` that opens an `upload_request` span per
/// request and grades the completion event by status class.
pub fn trace_requests<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let content_length = request
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok());

            info_span!(
                "upload_request",
                method = %request.method(),
                path = %request.uri().path(),
                content_length = ?content_length,
            )
        })
        .on_request(|_request: &Request<Body>, _span: &Span| {
            tracing::debug!("request started");
        })
        .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
            let status = response.status();

            if status.is_server_error() {
                tracing::error!(status = status.as_u16(), latency_ms = latency.as_millis(), "request failed");
            } else if status.is_client_error() {
                tracing::warn!(status = status.as_u16(), latency_ms = latency.as_millis(), "request rejected");
            } else {
                tracing::info!(status = status.as_u16(), latency_ms = latency.as_millis(), "request completed");
            }
        })
        .on_failure(|error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
            tracing::error!(latency_ms = latency.as_millis(), error = %error, "request errored");
        });

    router.layer(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_traced_router_passes_responses_through() {
        let router: Router = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }));
        let app = trace_requests(router);

        let ok = app
            .clone()
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = app
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}

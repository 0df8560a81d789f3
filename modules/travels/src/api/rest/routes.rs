use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::rest::dispatch::dispatch;
use crate::domain::store::Store;

/// Upper bound on accepted request bodies; entity payloads are tiny.
const MAX_BODY_BYTES: usize = 1 << 20;

/// One fallback service feeds every request to the dispatcher: the
/// dispatcher's path classification is the routing table, axum only decodes
/// the request and re-encodes the reply.
pub fn build_router(store: Arc<Store>) -> anyhow::Result<Router> {
    Ok(Router::new()
        .fallback(serve)
        .layer(TraceLayer::new_for_http())
        .with_state(store))
}

async fn serve(State(store): State<Arc<Store>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let reply = dispatch(
        &store,
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query(),
        &bytes,
    );

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_REQUEST);
    if reply.is_json() {
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            reply.body,
        )
            .into_response()
    } else {
        status.into_response()
    }
}

//! Correlation id propagation.
//!
//! A UUID in the `X-Correlation-Id` request header is reused; anything else
//! is replaced by a fresh id and the replacement is logged at debug level.
//! The id is echoed on every response.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;
use uuid::Uuid;

/// Header carrying the correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// The correlation id of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

/// Where a request's correlation id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationSource {
    /// Taken from the request header.
    Header,
    /// No header was sent.
    Generated,
    /// The header was not a UUID and a fresh id stands in for it.
    Replaced,
}

impl CorrelationId {
    /// Reads the id from `headers`, generating one if absent or malformed.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::resolve(headers).0
    }

    /// Like [`CorrelationId::from_headers`], also reporting where the id
    /// came from.
    #[must_use]
    pub fn resolve(headers: &HeaderMap) -> (Self, CorrelationSource) {
        let Some(raw) = headers.get(CORRELATION_ID_HEADER) else {
            return (Self(Uuid::new_v4()), CorrelationSource::Generated);
        };
        if let Some(id) = raw
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
        {
            return (Self(id), CorrelationSource::Header);
        }
        let id = Uuid::new_v4();
        debug!(
            header = %String::from_utf8_lossy(raw.as_bytes()),
            replacement = %id,
            "correlation id header is not a UUID; using a generated id"
        );
        (Self(id), CorrelationSource::Replaced)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CorrelationId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Middleware: resolves the correlation id, stores it in the request
/// extensions, and sets it on the response.
pub async fn propagate_correlation_id(mut request: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::from_headers(request.headers());
    request.extensions_mut().insert(correlation_id);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id.0.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

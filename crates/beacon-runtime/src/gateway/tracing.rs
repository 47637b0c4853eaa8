use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context inserted by [`request_id_middleware`].
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Caller-supplied or generated request ID.
    pub request_id: String,
    /// When the request started.
    pub start_time: std::time::Instant,
}

impl RequestContext {
    /// Create a context with a fresh request ID.
    pub fn new() -> Self {
        Self::with_request_id(Uuid::new_v4().to_string())
    }

    /// Create with an existing request ID (for propagation).
    pub fn with_request_id(request_id: String) -> Self {
        Self {
            request_id,
            start_time: std::time::Instant::now(),
        }
    }

    /// Get elapsed time since request start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Propagate or assign a request ID and echo it on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let context = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| RequestContext::with_request_id(v.to_string()))
        .unwrap_or_default();

    let request_id = context.request_id.clone();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(context.clone());

    let mut response = next.run(req).await;

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = context.elapsed().as_millis() as u64,
        "Request handled"
    );

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    response
}

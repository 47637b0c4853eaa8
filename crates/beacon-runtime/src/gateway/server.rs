use std::future::Future;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use beacon_core::config::GatewayConfig;

use super::handlers::{
    discover_path_handler, discover_query_handler, health_handler, register_handler,
    unregister_handler,
};
use super::tracing::request_id_middleware;
use crate::registry::Registry;

/// Gateway HTTP server.
pub struct GatewayServer {
    config: GatewayConfig,
    registry: Registry,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, registry: Registry) -> Self {
        Self { config, registry }
    }

    /// Build the Axum router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/register", post(register_handler))
            .route("/heartbeat", post(register_handler))
            .route("/discover", get(discover_query_handler))
            .route("/discover/{service}", get(discover_path_handler))
            .route("/unregister", delete(unregister_handler))
            .route("/health", get(health_handler))
            .with_state(self.registry.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(request_id_middleware)),
            )
    }

    /// Host and port to bind to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.bind_addr();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Gateway server listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use beacon_core::config::RegistryConfig;
    use beacon_core::store::KvStore;
    use beacon_core::ManualClock;

    use crate::store::MemoryStore;

    fn server() -> (GatewayServer, ManualClock, MemoryStore) {
        let clock = ManualClock::at_millis(1_700_000_000_000);
        let store = MemoryStore::with_clock(Arc::new(clock.clone()));
        let registry = Registry::new(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            &RegistryConfig::default(),
        )
        .unwrap();
        (
            GatewayServer::new(GatewayConfig::default(), registry),
            clock,
            store,
        )
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value, Option<String>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap(), request_id)
    }

    #[tokio::test]
    async fn test_register_heartbeat_discover() {
        let (server, clock, _) = server();
        let router = server.router();
        let body = r#"{"service":"a","address":"10.0.0.1"}"#;

        let (status, json, request_id) = call(&router, Method::POST, "/register", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["outcome"], "register");
        assert!(request_id.is_some());
        assert_eq!(json["request_id"].as_str(), request_id.as_deref());

        clock.advance(Duration::from_secs(10));
        let (_, json, _) = call(&router, Method::POST, "/heartbeat", Some(body)).await;
        assert_eq!(json["data"]["outcome"], "heartbeat");

        let (status, json, _) = call(&router, Method::GET, "/discover/a", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["activeCount"], 1);
        assert_eq!(json["data"]["nodes"][0]["address"], "10.0.0.1");

        let (_, json, _) = call(&router, Method::GET, "/discover?service=a", None).await;
        assert_eq!(json["data"]["activeCount"], 1);
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let (server, _, store) = server();
        let router = server.router();

        let (status, json, _) =
            call(&router, Method::POST, "/register", Some(r#"{"service":"a"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");

        let (status, _, _) = call(&router, Method::GET, "/discover", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = call(&router, Method::POST, "/register", Some("{oops")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_not_found() {
        let (server, _, _) = server();
        let router = server.router();

        let (status, json, _) = call(
            &router,
            Method::DELETE,
            "/unregister",
            Some(r#"{"service":"ghost","address":"10.0.0.1"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unregister_then_discover_empty() {
        let (server, _, store) = server();
        let router = server.router();
        let body = r#"{"service":"a","address":"10.0.0.1"}"#;

        call(&router, Method::POST, "/register", Some(body)).await;
        let (status, json, _) = call(&router, Method::DELETE, "/unregister", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["remaining"], 0);

        let (status, json, _) = call(&router, Method::GET, "/discover/a", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["activeCount"], 0);
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_internal_error() {
        let (server, _, store) = server();
        let router = server.router();
        store
            .put("a", b"garbage".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let (status, json, _) = call(&router, Method::GET, "/discover/a", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "CORRUPT_RECORD");
    }

    #[tokio::test]
    async fn test_health_reports_config_and_sweep() {
        let (server, clock, _) = server();
        let router = server.router();
        call(
            &router,
            Method::POST,
            "/register",
            Some(r#"{"service":"a","address":"10.0.0.1"}"#),
        )
        .await;

        clock.advance(Duration::from_secs(400));
        let (status, json, _) = call(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["expiryWindowMs"], 300_000);
        assert_eq!(json["data"]["storeTtlSecs"], 86_400);
        assert_eq!(json["data"]["sweep"]["servicesDeleted"], 1);
    }

    #[tokio::test]
    async fn test_request_id_propagation() {
        let (server, _, _) = server();
        let router = server.router();

        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[test]
    fn test_bind_addr() {
        let (server, _, _) = server();
        assert_eq!(server.bind_addr(), "127.0.0.1:8787");
    }
}

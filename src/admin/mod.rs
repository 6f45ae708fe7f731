//! Operator control plane.
//!
//! Mutating controls only: breaker resets and client cache refreshes, all
//! behind a bearer API key.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::post, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::client::ClientManager;
use self::auth::admin_auth_middleware;
use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub manager: Arc<ClientManager>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(manager: Arc<ClientManager>, api_key: &str) -> Router {
    let state = AdminState {
        manager,
        api_key: Arc::from(api_key),
    };

    Router::new()
        .route("/admin/breakers/reset", post(reset_all_breakers))
        .route("/admin/breakers/{service}/reset", post(reset_breaker))
        .route("/admin/clients/refresh", post(refresh_all_clients))
        .route("/admin/clients/{service}/refresh", post(refresh_client))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::client::{connector_fn, ClientHandle};
    use crate::config::{ManagerConfig, RetryConfig, ServiceDescriptor, ServiceKind};
    use crate::error::ClientError;
    use crate::resilience::CircuitState;

    const KEY: &str = "test-key";

    fn router() -> (Router, Arc<ClientManager>) {
        let config = ManagerConfig {
            retry: RetryConfig {
                max_retries: 1,
                ..RetryConfig::default()
            },
            services: vec![ServiceDescriptor::new("inference")
                .enabled(true)
                .kind(ServiceKind::Custom)
                .thresholds(1, 60)],
            ..ManagerConfig::default()
        };
        let manager = ClientManager::builder(config)
            .connector(
                "inference",
                connector_fn(|_| async {
                    Err::<ClientHandle, _>(ClientError::Transient("connection refused".into()))
                }),
            )
            .build()
            .unwrap();
        let manager = Arc::new(manager);
        (setup_admin_router(manager.clone(), KEY), manager)
    }

    fn post(uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let (app, _) = router();

        let missing = app.clone().oneshot(post("/admin/breakers/reset", None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app.oneshot(post("/admin/breakers/reset", Some("nope"))).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_reset_breaker() {
        let (app, manager) = router();
        assert!(manager.get_client("inference").await.is_none());
        assert_eq!(manager.circuit_state("inference").unwrap(), CircuitState::Open);

        let response = app
            .oneshot(post("/admin/breakers/inference/reset", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let result: ActionResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.action, "reset_breaker");
        assert_eq!(result.service.as_deref(), Some("inference"));
        assert_eq!(manager.circuit_state("inference").unwrap(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_unknown_service_is_not_found() {
        let (app, _) = router();
        let response = app
            .oneshot(post("/admin/clients/ghost/refresh", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refresh_all_reports_evictions() {
        let (app, _) = router();
        let response = app
            .oneshot(post("/admin/clients/refresh", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let result: ActionResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.evicted, Some(0));
    }
}

//! Operator-facing HTTP ingress: submit a signed response, check batch
//! status, and a liveness probe.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::coordinator::AggregationCoordinator;
use crate::types::{BatchRoot, SignedTaskResponse};

/// Builds the operator-facing router backed by a shared coordinator.
#[must_use]
pub fn router(coordinator: Arc<AggregationCoordinator>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/submit", post(submit))
        .route("/v1/status/{root}", get(status))
        .with_state(coordinator)
}

async fn health() -> &'static str {
    "1"
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    accepted: bool,
    error: Option<String>,
}

async fn submit(
    State(coordinator): State<Arc<AggregationCoordinator>>,
    Json(response): Json<SignedTaskResponse>,
) -> impl IntoResponse {
    match coordinator.on_submit(response).await {
        Ok(()) => (
            StatusCode::OK,
            Json(SubmitResponse {
                accepted: true,
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(SubmitResponse {
                accepted: false,
                error: Some(e.to_string()),
            }),
        ),
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    known: bool,
    response_count: usize,
    submitted: Option<bool>,
}

async fn status(
    State(coordinator): State<Arc<AggregationCoordinator>>,
    Path(root): Path<String>,
) -> impl IntoResponse {
    let Ok(root) = parse_root(&root) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(StatusResponse {
                known: false,
                response_count: 0,
                submitted: None,
            }),
        );
    };

    let registry = coordinator.registry();
    match registry.index_of(root) {
        Some(_) => (
            StatusCode::OK,
            Json(StatusResponse {
                known: true,
                response_count: registry.response_count(root),
                submitted: registry.is_submitted(root),
            }),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(StatusResponse {
                known: false,
                response_count: 0,
                submitted: None,
            }),
        ),
    }
}

fn parse_root(s: &str) -> Result<BatchRoot, ()> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|_| ())?;
    if bytes.len() != 32 {
        return Err(());
    }
    Ok(BatchRoot::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::BlsAggregator;
    use crate::chain::MockChainAdapter;
    use crate::coordinator::AggregationPolicy;
    use crate::metrics::Metrics;
    use crate::registry::BatchRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let registry = BatchRegistry::new();
        let aggregator = Arc::new(BlsAggregator::new());
        let chain = MockChainAdapter::new();
        let metrics = Arc::new(Metrics::new());
        let coordinator = Arc::new(AggregationCoordinator::new(
            registry,
            aggregator,
            chain,
            metrics,
            AggregationPolicy::default(),
        ));
        router(coordinator)
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"1");
    }

    #[tokio::test]
    async fn status_for_unknown_root_is_not_found() {
        let app = test_router();
        let root = format!("0x{}", hex::encode([0xAB; 32]));
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/status/{root}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submit_for_unknown_batch_is_rejected() {
        let app = test_router();
        let body = serde_json::json!({
            "root": format!("0x{}", hex::encode([0x11; 32])),
            "proof_verified": true,
            "metadata": "0x",
            "operator_id": format!("0x{}", hex::encode([0x01; 32])),
            "signature_g1": "0x",
            "public_key_g2": "0x",
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/submit")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

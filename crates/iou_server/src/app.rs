//! IOU server creation and serving.
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{routing::get, Router};
use iou_flows::Node;
use tokio::signal;
use tracing::info;

use crate::api::ApiError;

/// Nodes served over HTTP, addressed by name.
#[derive(Clone)]
pub struct ServerState {
    nodes: Arc<BTreeMap<String, Node>>,
}

impl ServerState {
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|n| (n.name().to_owned(), n))
            .collect();
        Self {
            nodes: Arc::new(nodes),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn node(&self, name: &str) -> Result<Node, ApiError> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::NodeNotFound(name.to_owned()))
    }
}

pub(crate) fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/healthcheck", get(|| async { "ok" }))
        .nest("/api", crate::api::router())
        .merge(crate::openapi::router())
        .with_state(state)
}

pub struct Server;

impl Server {
    /// Serves the nodes in `state` on the given listener until a shutdown
    /// signal is received.
    pub async fn serve(
        listener: std::net::TcpListener,
        state: ServerState,
    ) -> Result<(), crate::Error> {
        listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(listener)?;

        info!(
            "starting server on {} for {} node(s)",
            listener.local_addr()?,
            state.nodes.len()
        );

        axum::serve(listener, make_app(state))
            .with_graceful_shutdown(shutdown())
            .await?;

        Ok(())
    }
}

async fn shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("cannot install ctrl-c handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("cannot install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down the server");
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use iou_flows::{Config, InMemoryNotary, MockNetwork};
    use iou_predicate::AcceptancePolicy;
    use iou_store::{IouStore, Update};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn make_state(names: &[&str]) -> ServerState {
        let network = Arc::new(MockNetwork::new());
        let notary = Arc::new(InMemoryNotary::new("Notary"));
        let nodes: Vec<Node> = names
            .iter()
            .map(|name| {
                let store = IouStore::open_in_memory().unwrap();
                store.update().unwrap();
                let node = Node::new(
                    *name,
                    store,
                    notary.clone(),
                    network.clone(),
                    AcceptancePolicy::default(),
                    Config::default(),
                );
                network.register(node.identity().clone(), Arc::new(node.clone()));
                node
            })
            .collect();
        ServerState::new(nodes)
    }

    async fn send(
        state: &ServerState,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = make_app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    async fn create_account(state: &ServerState, node: &str, name: &str) -> String {
        let (status, account) = send(
            state,
            "POST",
            &format!("/api/v1/nodes/{node}/accounts"),
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        account["identifier"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_healthcheck() {
        let (status, body) = send(&make_state(&["Bank"]), "GET", "/healthcheck", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_owned()));
    }

    #[tokio::test]
    async fn test_list_nodes() {
        let state = make_state(&["Agent", "Bank"]);
        let (status, body) = send(&state, "GET", "/api/v1/nodes", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["Agent", "Bank"]);
    }

    #[tokio::test]
    async fn test_unknown_node() {
        let state = make_state(&["Bank"]);
        let (status, body) = send(&state, "GET", "/api/v1/nodes/Nope/ious", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["detail"], "node Nope not found");
    }

    #[tokio::test]
    async fn test_create_and_amend_iou() {
        let state = make_state(&["Bank"]);
        let lender = create_account(&state, "Bank", "Bank1").await;
        let borrower = create_account(&state, "Bank", "Bank2").await;

        let (status, created) = send(
            &state,
            "POST",
            "/api/v1/nodes/Bank/ious",
            Some(json!({ "value": 1, "lender": lender, "borrower": borrower })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let linear_id = created["linearId"].as_str().unwrap().to_owned();

        let (status, _) = send(
            &state,
            "POST",
            &format!("/api/v1/nodes/Bank/ious/{linear_id}/amend"),
            Some(json!({ "value": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, ious) = send(&state, "GET", "/api/v1/nodes/Bank/ious", None).await;
        assert_eq!(status, StatusCode::OK);
        let ious = ious.as_array().unwrap();
        assert_eq!(ious.len(), 1);
        assert_eq!(ious[0]["state"]["value"], 5);
        assert_eq!(ious[0]["state"]["linear_id"], linear_id.as_str());

        let (status, history) = send(
            &state,
            "GET",
            &format!("/api/v1/nodes/Bank/ious/{linear_id}?status=all"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 2);

        let (_, flows) = send(&state, "GET", "/api/v1/nodes/Bank/flows", None).await;
        assert_eq!(flows, json!([]));
    }

    #[tokio::test]
    async fn test_contract_violation_is_a_bad_request() {
        let state = make_state(&["Bank"]);
        let lender = create_account(&state, "Bank", "Bank1").await;
        let borrower = create_account(&state, "Bank", "Bank2").await;

        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/nodes/Bank/ious",
            Some(json!({ "value": -1, "lender": lender, "borrower": borrower })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["detail"], "The IOU's value must be non-negative.");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn test_refused_amendment_across_nodes() {
        let state = make_state(&["Agent", "Bank"]);
        let lender = create_account(&state, "Bank", "Bank1").await;
        let borrower = create_account(&state, "Agent", "Agent1").await;
        for (node, id, with) in [("Bank", &lender, "Agent"), ("Agent", &borrower, "Bank")] {
            let (status, _) = send(
                &state,
                "POST",
                &format!("/api/v1/nodes/{node}/accounts/{id}/share"),
                Some(json!({ "with": with })),
            )
            .await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (status, created) = send(
            &state,
            "POST",
            "/api/v1/nodes/Bank/ious",
            Some(json!({ "value": 1, "lender": lender, "borrower": borrower })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let linear_id = created["linearId"].as_str().unwrap().to_owned();

        let (status, body) = send(
            &state,
            "POST",
            &format!("/api/v1/nodes/Agent/ious/{linear_id}/amend"),
            Some(json!({ "value": 150 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"]["detail"],
            "IOUs with a value over 100 are not accepted."
        );
    }

    #[tokio::test]
    async fn test_missing_iou_and_acceptance() {
        let state = make_state(&["Bank"]);
        let (status, _) = send(
            &state,
            "GET",
            "/api/v1/nodes/Bank/ious/8f0fdc5a-41d4-4a5e-9d53-4a0b5bdfb1a6",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&state, "GET", "/api/v1/nodes/Bank/acceptance", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{ "type": "max_value", "max": 100 }]));
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let (status, body) = send(&make_state(&[]), "GET", "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/v1/nodes/{node}/ious"].is_object());
    }
}

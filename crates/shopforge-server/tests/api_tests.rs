//! API tests driving the router end to end with mocked cluster tooling.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use shopforge_cluster::{InstallOutcome, MockChartDeployer, MockClusterInspector, PodStatus, UninstallOutcome};
use shopforge_core::config::AppConfig;
use shopforge_engines::EngineRegistry;
use shopforge_provisioner::{OperationKind, Provisioner};
use shopforge_registry::{
    generate_store_id, Database, NewStore, StoreRegistry, StoreStatus,
};
use shopforge_server::{create_router, AppState};

fn permissive_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.provisioner.timeout_ms = 10_000;
    config.provisioner.poll_max_attempts = 3;
    config.provisioner.poll_interval_ms = 10;
    config.rate_limit.max_requests = 1_000;
    config.rate_limit.max_creates = 1_000;
    config
}

/// Mocks for a cluster where everything succeeds immediately
fn happy_cluster() -> (MockChartDeployer, MockClusterInspector) {
    let mut deployer = MockChartDeployer::new();
    deployer.expect_install().returning(|_| {
        Ok(InstallOutcome::Installed {
            output: String::new(),
        })
    });
    deployer
        .expect_uninstall()
        .returning(|_, _| Ok(UninstallOutcome::Uninstalled));

    let mut inspector = MockClusterInspector::new();
    inspector.expect_pod_statuses().returning(|_| {
        Ok(vec![PodStatus {
            name: "wordpress-0".to_string(),
            phase: "Running".to_string(),
            ready: true,
            restarts: 0,
        }])
    });
    inspector.expect_delete_namespace().returning(|_| Ok(()));
    (deployer, inspector)
}

async fn test_app(
    config: AppConfig,
    deployer: MockChartDeployer,
    inspector: MockClusterInspector,
) -> (Database, AppState, Router) {
    let config = Arc::new(config);
    let db = Database::open_in_memory().await.unwrap();
    let registry = StoreRegistry::new(db.pool().clone());
    let engines = Arc::new(EngineRegistry::new(
        &config.stores,
        &config.cluster.helm_chart_path,
    ));
    let provisioner = Arc::new(Provisioner::new(
        registry.clone(),
        engines.clone(),
        Arc::new(deployer),
        Arc::new(inspector),
        config.provisioner.clone(),
    ));
    let state = AppState::new(config, registry, engines, provisioner);
    let router = create_router(state.clone());
    (db, state, router)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(router: &Router, path: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder().uri(path).body(Body::empty()).unwrap(),
    )
    .await
}

async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn delete(router: &Router, path: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("DELETE")
            .uri(path)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}

async fn wait_for_status(registry: &StoreRegistry, id: &str, status: StoreStatus) {
    for _ in 0..200 {
        if registry.require(id).await.unwrap().status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("store {id} never reached {status}");
}

async fn seed(registry: &StoreRegistry, status: StoreStatus) -> String {
    let id = generate_store_id();
    registry
        .create(NewStore {
            id: id.clone(),
            name: "Seeded Shop".to_string(),
            engine: "woocommerce".to_string(),
        })
        .await
        .unwrap();
    match status {
        StoreStatus::Queued => {}
        StoreStatus::Ready => {
            registry
                .mark_ready(&id, "http://seed", "http://seed/wp-admin")
                .await
                .unwrap();
        }
        StoreStatus::Deleted => {
            registry.mark_deleted(&id).await.unwrap();
        }
        other => {
            registry
                .update_status(&id, other, Some("seeded failure"))
                .await
                .unwrap();
        }
    }
    id
}

#[tokio::test]
async fn health_reports_environment() {
    let (deployer, inspector) = happy_cluster();
    let (_db, _state, router) = test_app(permissive_config(), deployer, inspector).await;

    let (status, body) = get(&router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "development");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn create_store_returns_queued_and_provisions_to_ready() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;

    let (status, body) = post_json(&router, "/api/stores", json!({ "name": "Shop A" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["store"]["status"], "queued");
    assert_eq!(body["store"]["name"], "Shop A");

    let id = body["store"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("store-"));
    assert_eq!(body["store"]["namespace"], id.as_str());
    assert_eq!(body["store"]["helm_release"], id.as_str());

    wait_for_status(&state.registry, &id, StoreStatus::Ready).await;

    let (_, body) = get(&router, &format!("/api/stores/{id}")).await;
    assert_eq!(body["store"]["status"], "ready");
    assert_eq!(
        body["store"]["store_url"],
        format!("http://{id}.127.0.0.1.nip.io")
    );
    assert_eq!(
        body["store"]["admin_url"],
        format!("http://{id}.127.0.0.1.nip.io/wp-admin")
    );
}

#[tokio::test]
async fn create_store_validation_errors() {
    let (deployer, inspector) = happy_cluster();
    let (_db, _state, router) = test_app(permissive_config(), deployer, inspector).await;

    let (status, body) = post_json(&router, "/api/stores", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "MISSING_STORE_NAME");

    let (status, body) = post_json(&router, "/api/stores", json!({ "name": " x " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_STORE_NAME");

    let (status, body) = post_json(
        &router,
        "/api/stores",
        json!({ "name": "Shop", "engine": "shopify" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_ENGINE");

    let (status, body) = post_json(
        &router,
        "/api/stores",
        json!({ "name": "Shop", "engine": "medusa" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "ENGINE_UNAVAILABLE");
}

#[tokio::test]
async fn malformed_json_body_is_rejected_with_envelope() {
    let (deployer, inspector) = happy_cluster();
    let (_db, _state, router) = test_app(permissive_config(), deployer, inspector).await;

    let (status, body) = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/api/stores")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{{invalid json"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_JSON");
}

#[tokio::test]
async fn quota_rejects_creation_beyond_max_stores() {
    let (deployer, inspector) = happy_cluster();
    let mut config = permissive_config();
    config.stores.max_stores = 3;
    let (_db, _state, router) = test_app(config, deployer, inspector).await;

    for i in 1..=3 {
        let (status, _) = post_json(
            &router,
            "/api/stores",
            json!({ "name": format!("Shop {i}") }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = post_json(&router, "/api/stores", json!({ "name": "Shop 4" })).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&body), "QUOTA_EXCEEDED");
}

#[tokio::test]
async fn get_unknown_store_is_not_found() {
    let (deployer, inspector) = happy_cluster();
    let (_db, _state, router) = test_app(permissive_config(), deployer, inspector).await;

    let (status, body) = get(&router, "/api/stores/store-00000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn list_stores_newest_first() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;

    seed(&state.registry, StoreStatus::Queued).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let newest = seed(&state.registry, StoreStatus::Queued).await;

    let (status, body) = get(&router, "/api/stores").await;
    assert_eq!(status, StatusCode::OK);
    let stores = body["stores"].as_array().unwrap();
    assert_eq!(stores.len(), 2);
    assert_eq!(stores[0]["id"], newest.as_str());
}

#[tokio::test]
async fn delete_store_cascades_to_deleted() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;
    let id = seed(&state.registry, StoreStatus::Ready).await;

    let (status, body) = delete(&router, &format!("/api/stores/{id}")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["storeId"], id.as_str());
    assert!(body["message"].is_string());

    wait_for_status(&state.registry, &id, StoreStatus::Deleted).await;
}

#[tokio::test]
async fn delete_guards_reject_terminal_and_in_flight_states() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;

    let deleted = seed(&state.registry, StoreStatus::Deleted).await;
    let (status, body) = delete(&router, &format!("/api/stores/{deleted}")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "INVALID_STATE_TRANSITION");

    let deleting = seed(&state.registry, StoreStatus::Deleting).await;
    let (status, body) = delete(&router, &format!("/api/stores/{deleting}")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "INVALID_STATE_TRANSITION");

    let (status, body) = delete(&router, "/api/stores/store-00000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn retry_reprovisions_failed_store() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;
    let id = seed(&state.registry, StoreStatus::Failed).await;

    let (status, body) = post_json(&router, &format!("/api/stores/{id}/retry"), json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["storeId"], id.as_str());

    wait_for_status(&state.registry, &id, StoreStatus::Ready).await;

    let entries = state.registry.audit().list_for(&id).await.unwrap();
    assert!(entries
        .iter()
        .any(|e| matches!(e.action, shopforge_registry::AuditAction::Retry)));
}

#[tokio::test]
async fn retry_is_rejected_unless_store_failed() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;

    let ready = seed(&state.registry, StoreStatus::Ready).await;
    let (status, body) = post_json(&router, &format!("/api/stores/{ready}/retry"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn retry_is_rejected_while_operation_active() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;
    let id = seed(&state.registry, StoreStatus::Failed).await;

    assert!(state
        .provisioner
        .lock()
        .try_claim(&id, OperationKind::Provisioning));

    let (status, body) = post_json(&router, &format!("/api/stores/{id}/retry"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "OPERATION_IN_PROGRESS");
}

#[tokio::test]
async fn operation_endpoint_reports_active_kind() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;
    let id = seed(&state.registry, StoreStatus::Queued).await;

    let (status, body) = get(&router, &format!("/api/stores/{id}/operation")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["operation"].is_null());

    state
        .provisioner
        .lock()
        .try_claim(&id, OperationKind::Provisioning);
    let (_, body) = get(&router, &format!("/api/stores/{id}/operation")).await;
    assert_eq!(body["operation"], "provisioning");
}

#[tokio::test]
async fn audit_endpoint_lists_newest_first() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;

    let id = seed(&state.registry, StoreStatus::Failed).await;

    let (status, body) = get(&router, "/api/audit?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let audit = body["audit"].as_array().unwrap();
    assert_eq!(audit.len(), 2);
    assert!(audit[0]["id"].as_i64().unwrap() > audit[1]["id"].as_i64().unwrap());
    assert_eq!(audit[0]["store_id"], id.as_str());
    assert_eq!(audit[0]["action"], "status_change");
    assert_eq!(audit[1]["action"], "create");
}

#[tokio::test]
async fn metrics_summarize_fleet_state() {
    let (deployer, inspector) = happy_cluster();
    let (_db, state, router) = test_app(permissive_config(), deployer, inspector).await;

    seed(&state.registry, StoreStatus::Ready).await;
    let failed = seed(&state.registry, StoreStatus::Failed).await;

    let (status, body) = get(&router, "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stores"]["total"], 2);
    assert_eq!(body["stores"]["byStatus"]["ready"], 1);
    assert_eq!(body["stores"]["byStatus"]["failed"], 1);
    assert_eq!(body["provisioning"]["totalProvisioned"], 1);
    assert_eq!(
        body["recentFailures"].as_array().unwrap()[0]["id"],
        failed.as_str()
    );
}

#[tokio::test]
async fn general_rate_limit_blocks_after_threshold() {
    let (deployer, inspector) = happy_cluster();
    let mut config = permissive_config();
    config.rate_limit.max_requests = 2;
    let (_db, _state, router) = test_app(config, deployer, inspector).await;

    let (status, _) = get(&router, "/api/stores").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&router, "/api/stores").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&router, "/api/stores").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&body), "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn failed_requests_are_not_counted_toward_the_limit() {
    let (deployer, inspector) = happy_cluster();
    let mut config = permissive_config();
    config.rate_limit.max_requests = 2;
    let (_db, _state, router) = test_app(config, deployer, inspector).await;

    // 404s fail and are skipped by the limiter
    for _ in 0..3 {
        let (status, _) = get(&router, "/api/stores/store-00000000").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _) = get(&router, "/api/stores").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&router, "/api/stores").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&router, "/api/stores").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn store_creation_has_its_own_tighter_limit() {
    let (deployer, inspector) = happy_cluster();
    let mut config = permissive_config();
    config.rate_limit.max_creates = 1;
    let (_db, _state, router) = test_app(config, deployer, inspector).await;

    let (status, _) = post_json(&router, "/api/stores", json!({ "name": "Shop A" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(&router, "/api/stores", json!({ "name": "Shop B" })).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&body), "RATE_LIMIT_EXCEEDED");
}
